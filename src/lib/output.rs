use serde::Serialize;
use std::fmt::Write;

use crate::lib::aggregator::{AnalysisReport, PassKind};
use crate::lib::analyzer::{FindingCategory, PassOutcome};
use crate::lib::config::PolicyConfig;

/// Top-level output structure containing metadata and the analysis report
#[derive(Debug, Clone, Serialize)]
pub struct OptimizerOutput {
    pub metadata: OutputMetadata,
    pub report: AnalysisReport,
}

/// Metadata about the analysis run
#[derive(Debug, Clone, Serialize)]
pub struct OutputMetadata {
    pub timestamp: String,
    pub region: String,
    pub policy: PolicyConfig,
    pub total_recommendations: usize,
    pub total_advisories: usize,
}

impl OptimizerOutput {
    pub fn new(region: String, policy: PolicyConfig, report: AnalysisReport) -> Self {
        Self {
            metadata: OutputMetadata {
                timestamp: chrono::Utc::now().to_rfc3339(),
                region,
                total_recommendations: report.recommendations.len(),
                total_advisories: report.advisories.len(),
                policy,
            },
            report,
        }
    }
}

/// Render one pass's findings as plain text for the single-pass commands.
pub fn format_pass_outcome(pass: PassKind, outcome: &PassOutcome) -> String {
    if outcome.findings.is_empty() && outcome.skipped.is_empty() {
        return format!("No findings from {pass}");
    }

    let mut out = String::new();
    let _ = writeln!(out, "Found {} finding(s) from {pass}:", outcome.findings.len());

    let mut total = 0.0;
    for finding in &outcome.findings {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} {}", finding.resource_kind, finding.resource_id);
        let _ = writeln!(out, "    Type: {}", finding.type_class);
        if finding.resource_kind == crate::lib::inventory::ResourceKind::Instance {
            let _ = writeln!(out, "    Avg CPU: {:.1}%", finding.metric_value);
        }
        let _ = writeln!(
            out,
            "    Monthly Cost: ${:.2}",
            finding.estimated_monthly_cost
        );
        let _ = writeln!(
            out,
            "    Potential Savings: ${:.2}",
            finding.estimated_savings
        );
        if finding.estimated_savings > 0.0 {
            total += finding.estimated_savings;
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  Total Potential Savings: ${:.2}/month", total);

    for skipped in &outcome.skipped {
        let _ = writeln!(
            out,
            "  Warning: skipped {}: {}",
            skipped.resource_id, skipped.reason
        );
    }

    out
}

/// Render the full analysis report as plain text.
pub fn format_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "COST OPTIMIZATION REPORT");
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary:");
    for summary in &report.pass_summaries {
        match &summary.error {
            Some(error) => {
                let _ = writeln!(out, "  {}: failed ({error})", summary.pass);
            }
            None => {
                let _ = writeln!(out, "  {}: {} finding(s)", summary.pass, summary.findings);
            }
        }
        if let Some(note) = summary.skipped_note() {
            let _ = writeln!(out, "  Warning: {note}");
        }
    }
    let _ = writeln!(
        out,
        "  Total Potential Savings: ${:.2}/month",
        report.total_estimated_savings
    );

    if !report.recommendations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top Recommendations:");
        for (i, rec) in report.recommendations.iter().take(10).enumerate() {
            let _ = writeln!(
                out,
                "  {}. [{}] {} {} ({})",
                i + 1,
                rec.priority,
                rec.action,
                rec.resource_id,
                rec.type_class
            );
            let _ = writeln!(out, "     Savings: ${:.2}/month", rec.savings);
            let _ = writeln!(out, "     Reason: {}", rec.reason);
        }
    }

    if !report.advisories.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Advisories (cost-increasing, informational):");
        for advisory in &report.advisories {
            debug_assert_eq!(advisory.category, FindingCategory::RightsizeUp);
            let _ = writeln!(
                out,
                "  {} ({}) runs hot at {:.1}% CPU; upsizing would add ${:.2}/month",
                advisory.resource_id,
                advisory.type_class,
                advisory.metric_value,
                -advisory.estimated_savings
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::aggregator::{PassSummary, Priority, Recommendation, RecommendedAction};
    use crate::lib::analyzer::{Finding, SkippedResource};
    use crate::lib::inventory::ResourceKind;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            recommendations: vec![Recommendation {
                resource_id: "i-1".to_string(),
                type_class: "t3.medium".to_string(),
                action: RecommendedAction::StopInstance,
                priority: Priority::High,
                metric_value: 3.0,
                savings: 21.0,
                reason: "Very low CPU utilization (3.0% < 5%)".to_string(),
            }],
            advisories: vec![Finding {
                resource_id: "i-hot".to_string(),
                resource_kind: ResourceKind::Instance,
                type_class: "c5.large".to_string(),
                metric_value: 92.0,
                category: FindingCategory::RightsizeUp,
                estimated_monthly_cost: 68.0,
                estimated_savings: -13.6,
            }],
            pass_summaries: vec![PassSummary {
                pass: PassKind::Idle,
                findings: 1,
                skipped: vec![SkippedResource {
                    resource_id: "i-3".to_string(),
                    reason: "Query failed: timeout".to_string(),
                }],
                error: None,
            }],
            total_estimated_savings: 21.0,
        }
    }

    #[test]
    fn report_text_carries_recommendations_and_warnings() {
        let text = format_report(&sample_report());
        assert!(text.contains("stop instance i-1"));
        assert!(text.contains("$21.00/month"));
        assert!(text.contains("i-3"));
        assert!(text.contains("skipped due to metrics errors"));
        assert!(text.contains("i-hot"));
    }

    #[test]
    fn report_serializes_to_json() {
        let output = OptimizerOutput::new(
            "us-east-1".to_string(),
            PolicyConfig::default(),
            sample_report(),
        );
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["metadata"]["region"], "us-east-1");
        assert_eq!(json["metadata"]["total_recommendations"], 1);
        assert_eq!(
            json["report"]["recommendations"][0]["action"],
            "stop_instance"
        );
        assert_eq!(json["report"]["total_estimated_savings"], 21.0);
        assert_eq!(
            json["report"]["advisories"][0]["category"],
            "rightsize_up"
        );
    }

    #[test]
    fn empty_pass_renders_friendly_message() {
        let outcome = PassOutcome::default();
        let text = format_pass_outcome(PassKind::UnusedVolumes, &outcome);
        assert_eq!(text, "No findings from unused-volume pass");
    }
}
