use log::{info, warn};
use serde::Serialize;
use std::fmt;

use crate::lib::analyzer::{Finding, FindingCategory, PassOutcome, ResourceAnalyzer};
use crate::lib::config::PolicyConfig;
use crate::lib::cost::round_currency;
use crate::lib::error::Result;
use crate::lib::inventory::{InventoryProvider, ResourceKind};
use crate::lib::metrics::MetricsSource;

/// User-facing action derived from a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    StopInstance,
    DownsizeInstance,
    RightsizeInstance,
    DeleteVolume,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendedAction::StopInstance => write!(f, "stop instance"),
            RecommendedAction::DownsizeInstance => write!(f, "downsize instance"),
            RecommendedAction::RightsizeInstance => write!(f, "rightsize instance"),
            RecommendedAction::DeleteVolume => write!(f, "delete volume"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
        }
    }
}

/// A ranked, user-facing optimization action.
///
/// Only findings with positive estimated savings become recommendations;
/// `reason` is a deterministic template over the observed metric and the
/// threshold that triggered the action.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub type_class: String,
    pub action: RecommendedAction,
    pub priority: Priority,
    pub metric_value: f64,
    pub savings: f64,
    pub reason: String,
}

/// The three analysis passes the aggregator folds together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    Idle,
    Rightsizing,
    UnusedVolumes,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Idle => write!(f, "idle-instance pass"),
            PassKind::Rightsizing => write!(f, "rightsizing pass"),
            PassKind::UnusedVolumes => write!(f, "unused-volume pass"),
        }
    }
}

/// What one pass contributed to the report, including what it had to skip
/// and whether the pass itself failed.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub pass: PassKind,
    pub findings: usize,
    pub skipped: Vec<crate::lib::analyzer::SkippedResource>,
    pub error: Option<String>,
}

impl PassSummary {
    /// Human-readable partial-failure note, if the pass skipped anything
    pub fn skipped_note(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        Some(format!(
            "{}: {} resource(s) skipped due to metrics errors ({})",
            self.pass,
            self.skipped.len(),
            self.skipped
                .iter()
                .map(|s| s.resource_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}

/// The complete output of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Ranked actions, sorted by savings descending (stable on ties)
    pub recommendations: Vec<Recommendation>,
    /// Informational findings that increase cost if acted on (upsizes);
    /// surfaced but never ranked as savings opportunities
    pub advisories: Vec<Finding>,
    pub pass_summaries: Vec<PassSummary>,
    /// Sum of all recommendation savings, in USD per month
    pub total_estimated_savings: f64,
}

/// Runs all analysis passes and folds their findings into one ranked,
/// explainable recommendation list.
pub struct RecommendationAggregator<I, M> {
    inventory: I,
    analyzer: ResourceAnalyzer<M>,
}

impl<I: InventoryProvider, M: MetricsSource> RecommendationAggregator<I, M> {
    pub fn new(inventory: I, analyzer: ResourceAnalyzer<M>) -> Self {
        Self {
            inventory,
            analyzer,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.analyzer.policy()
    }

    /// Run one analysis pass against the current inventory.
    ///
    /// Used by the single-pass CLI commands; `analyze` runs all three.
    pub async fn run_pass(&self, pass: PassKind) -> Result<PassOutcome> {
        match pass {
            PassKind::Idle => {
                let instances = self.inventory.list_resources(ResourceKind::Instance).await?;
                self.analyzer.find_idle(&instances).await
            }
            PassKind::Rightsizing => {
                let instances = self.inventory.list_resources(ResourceKind::Instance).await?;
                self.analyzer.find_rightsizing(&instances).await
            }
            PassKind::UnusedVolumes => {
                let volumes = self.inventory.list_resources(ResourceKind::Volume).await?;
                self.analyzer.find_unused_volumes(&volumes)
            }
        }
    }

    /// Run the full analysis and build the ranked report.
    ///
    /// An inventory failure aborts the whole run: a recommendation list
    /// built on an unknown inventory would be misleading, not merely
    /// incomplete. A failure inside one pass only annotates that pass.
    pub async fn analyze(&self) -> Result<AnalysisReport> {
        let instances = self.inventory.list_resources(ResourceKind::Instance).await?;
        let volumes = self.inventory.list_resources(ResourceKind::Volume).await?;
        info!(
            "Starting analysis over {} instances and {} volumes",
            instances.len(),
            volumes.len()
        );

        // The instance passes are independent and issue their own metrics
        // queries, so they run concurrently; the volume pass needs no
        // metrics at all.
        let (idle, rightsizing) = tokio::join!(
            self.analyzer.find_idle(&instances),
            self.analyzer.find_rightsizing(&instances),
        );
        let unused = self.analyzer.find_unused_volumes(&volumes);

        let mut findings = Vec::new();
        let mut pass_summaries = Vec::new();
        fold_pass(PassKind::Idle, idle, &mut findings, &mut pass_summaries);
        fold_pass(
            PassKind::Rightsizing,
            rightsizing,
            &mut findings,
            &mut pass_summaries,
        );
        fold_pass(
            PassKind::UnusedVolumes,
            unused,
            &mut findings,
            &mut pass_summaries,
        );

        let policy = self.analyzer.policy();
        let mut recommendations = Vec::new();
        let mut advisories = Vec::new();
        for finding in findings {
            if finding.category == FindingCategory::RightsizeUp {
                advisories.push(finding);
            } else if let Some(rec) = to_recommendation(&finding, policy) {
                recommendations.push(rec);
            }
        }

        // Stable sort keeps first-seen order for equal savings
        recommendations.sort_by(|a, b| {
            b.savings
                .partial_cmp(&a.savings)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let total_estimated_savings =
            round_currency(recommendations.iter().map(|r| r.savings).sum());

        info!(
            "Analysis produced {} recommendations, {} advisories, estimated savings ${:.2}/month",
            recommendations.len(),
            advisories.len(),
            total_estimated_savings
        );

        Ok(AnalysisReport {
            recommendations,
            advisories,
            pass_summaries,
            total_estimated_savings,
        })
    }
}

fn fold_pass(
    pass: PassKind,
    result: Result<PassOutcome>,
    findings: &mut Vec<Finding>,
    summaries: &mut Vec<PassSummary>,
) {
    match result {
        Ok(outcome) => {
            summaries.push(PassSummary {
                pass,
                findings: outcome.findings.len(),
                skipped: outcome.skipped,
                error: None,
            });
            findings.extend(outcome.findings);
        }
        Err(e) => {
            warn!("{pass} failed: {e}");
            summaries.push(PassSummary {
                pass,
                findings: 0,
                skipped: Vec::new(),
                error: Some(e.to_string()),
            });
        }
    }
}

/// Translate a finding into a ranked action.
///
/// Returns `None` for findings that are not savings opportunities
/// (non-positive savings, including upsize advisories).
fn to_recommendation(finding: &Finding, policy: &PolicyConfig) -> Option<Recommendation> {
    if finding.estimated_savings <= 0.0 {
        return None;
    }

    let (action, priority, reason) = match finding.category {
        FindingCategory::Idle => {
            if finding.metric_value < policy.stop_threshold {
                (
                    RecommendedAction::StopInstance,
                    Priority::High,
                    format!(
                        "Very low CPU utilization ({:.1}% < {}%)",
                        finding.metric_value, policy.stop_threshold
                    ),
                )
            } else {
                (
                    RecommendedAction::DownsizeInstance,
                    Priority::Medium,
                    format!(
                        "Low CPU utilization ({:.1}% < {}%)",
                        finding.metric_value, policy.cpu_idle_threshold
                    ),
                )
            }
        }
        FindingCategory::RightsizeDown => (
            RecommendedAction::RightsizeInstance,
            Priority::Medium,
            format!("Low CPU utilization ({:.1}%)", finding.metric_value),
        ),
        FindingCategory::RightsizeUp => return None,
        FindingCategory::UnusedStorage => (
            RecommendedAction::DeleteVolume,
            Priority::High,
            "Volume not attached to any instance".to_string(),
        ),
    };

    Some(Recommendation {
        resource_id: finding.resource_id.clone(),
        type_class: finding.type_class.clone(),
        action,
        priority,
        metric_value: finding.metric_value,
        savings: finding.estimated_savings,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::analyzer::testutil::{FakeMetrics, instance, volume};
    use crate::lib::cost::CostModel;
    use crate::lib::error::{InventoryError, OptimizerError};
    use crate::lib::inventory::{ResourceSample, ResourceState};

    struct FakeInventory {
        instances: Vec<ResourceSample>,
        volumes: Vec<ResourceSample>,
        fail: bool,
    }

    impl FakeInventory {
        fn new(instances: Vec<ResourceSample>, volumes: Vec<ResourceSample>) -> Self {
            Self {
                instances,
                volumes,
                fail: false,
            }
        }

        fn unavailable() -> Self {
            Self {
                instances: Vec::new(),
                volumes: Vec::new(),
                fail: true,
            }
        }
    }

    impl InventoryProvider for FakeInventory {
        async fn list_resources(&self, kind: ResourceKind) -> Result<Vec<ResourceSample>> {
            if self.fail {
                return Err(
                    InventoryError::ConnectionFailed("inventory service down".to_string()).into(),
                );
            }
            Ok(match kind {
                ResourceKind::Instance => self.instances.clone(),
                ResourceKind::Volume => self.volumes.clone(),
            })
        }
    }

    fn aggregator(
        inventory: FakeInventory,
        metrics: FakeMetrics,
        policy: PolicyConfig,
    ) -> RecommendationAggregator<FakeInventory, FakeMetrics> {
        RecommendationAggregator::new(
            inventory,
            ResourceAnalyzer::new(metrics, policy, CostModel::default()),
        )
    }

    /// The mixed scenario: an idle instance, an oversized instance, an
    /// unattached volume, and one instance whose metrics keep failing.
    fn mixed_fleet() -> RecommendationAggregator<FakeInventory, FakeMetrics> {
        let inventory = FakeInventory::new(
            vec![
                instance("i-1", "t3.medium", ResourceState::Running),
                instance("i-2", "m5.large", ResourceState::Running),
                instance("i-3", "c5.large", ResourceState::Running),
            ],
            vec![volume("vol-1", "gp3", 100, ResourceState::Unattached)],
        );
        let metrics = FakeMetrics::new()
            .with_series("i-1", &[3.0])
            .with_series("i-2", &[15.0])
            .failing("i-3", u32::MAX);
        aggregator(inventory, metrics, PolicyConfig::default())
    }

    #[tokio::test]
    async fn mixed_run_ranks_actions_and_skips_failing_resource() {
        let report = mixed_fleet().analyze().await.unwrap();

        // i-1 appears twice (idle + rightsizing are independent signals),
        // i-2 only as a rightsizing candidate, i-3 nowhere.
        let ids: Vec<&str> = report
            .recommendations
            .iter()
            .map(|r| r.resource_id.as_str())
            .collect();
        assert_eq!(ids, ["i-2", "i-1", "i-1", "vol-1"]);

        let top = &report.recommendations[0];
        assert_eq!(top.action, RecommendedAction::RightsizeInstance);
        assert_eq!(top.priority, Priority::Medium);
        assert_eq!(top.savings, 23.1);

        let stop = &report.recommendations[1];
        assert_eq!(stop.action, RecommendedAction::StopInstance);
        assert_eq!(stop.priority, Priority::High);
        assert_eq!(stop.savings, 21.0);

        let vol = &report.recommendations[3];
        assert_eq!(vol.action, RecommendedAction::DeleteVolume);
        assert_eq!(vol.priority, Priority::High);
        assert_eq!(vol.savings, 8.0);

        // i-3 was skipped in both instance passes and is called out
        for summary in report
            .pass_summaries
            .iter()
            .filter(|s| s.pass != PassKind::UnusedVolumes)
        {
            assert_eq!(summary.skipped.len(), 1);
            assert!(summary.skipped_note().unwrap().contains("i-3"));
        }

        // 23.1 + 21.0 + 9.0 (i-1 downsize) + 8.0
        assert_eq!(report.total_estimated_savings, 61.1);
    }

    #[tokio::test]
    async fn total_matches_sum_of_positive_findings_across_passes() {
        let engine = mixed_fleet();
        let mut positive = 0.0;
        for pass in [PassKind::Idle, PassKind::Rightsizing, PassKind::UnusedVolumes] {
            let outcome = engine.run_pass(pass).await.unwrap();
            positive += outcome
                .findings
                .iter()
                .map(|f| f.estimated_savings)
                .filter(|&s| s > 0.0)
                .sum::<f64>();
        }

        let report = engine.analyze().await.unwrap();
        assert_eq!(report.total_estimated_savings, round_currency(positive));
    }

    #[tokio::test]
    async fn analysis_is_idempotent() {
        let engine = mixed_fleet();
        let first = engine.analyze().await.unwrap();
        let second = engine.analyze().await.unwrap();

        assert_eq!(first.total_estimated_savings, second.total_estimated_savings);
        assert_eq!(first.recommendations.len(), second.recommendations.len());
        for (a, b) in first.recommendations.iter().zip(&second.recommendations) {
            assert_eq!(a.resource_id, b.resource_id);
            assert_eq!(a.action, b.action);
            assert_eq!(a.savings, b.savings);
            assert_eq!(a.reason, b.reason);
        }
    }

    #[tokio::test]
    async fn equal_savings_preserve_discovery_order() {
        // Two identical idle instances: same cost, same savings
        let inventory = FakeInventory::new(
            vec![
                instance("i-first", "t3.medium", ResourceState::Running),
                instance("i-second", "t3.medium", ResourceState::Running),
            ],
            Vec::new(),
        );
        let metrics = FakeMetrics::new()
            .with_series("i-first", &[1.0])
            .with_series("i-second", &[2.0]);
        let engine = aggregator(inventory, metrics, PolicyConfig::default());

        let report = engine.analyze().await.unwrap();
        let stops: Vec<&Recommendation> = report
            .recommendations
            .iter()
            .filter(|r| r.action == RecommendedAction::StopInstance)
            .collect();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].savings, stops[1].savings);
        assert_eq!(stops[0].resource_id, "i-first");
        assert_eq!(stops[1].resource_id, "i-second");
    }

    #[tokio::test]
    async fn savings_are_strictly_descending_modulo_ties() {
        let report = mixed_fleet().analyze().await.unwrap();
        for pair in report.recommendations.windows(2) {
            assert!(pair[0].savings >= pair[1].savings);
        }
    }

    #[tokio::test]
    async fn upsize_findings_become_advisories_not_recommendations() {
        let inventory = FakeInventory::new(
            vec![instance("i-hot", "c5.xlarge", ResourceState::Running)],
            Vec::new(),
        );
        let metrics = FakeMetrics::new().with_series("i-hot", &[95.0]);
        let engine = aggregator(inventory, metrics, PolicyConfig::default());

        let report = engine.analyze().await.unwrap();
        assert!(report.recommendations.is_empty());
        assert_eq!(report.advisories.len(), 1);
        assert_eq!(report.advisories[0].category, FindingCategory::RightsizeUp);
        assert!(report.advisories[0].estimated_savings < 0.0);
        assert_eq!(report.total_estimated_savings, 0.0);
    }

    #[tokio::test]
    async fn idle_between_stop_threshold_and_idle_threshold_downsizes() {
        let inventory = FakeInventory::new(
            vec![
                instance("i-very-idle", "t3.medium", ResourceState::Running),
                instance("i-mostly-idle", "t3.medium", ResourceState::Running),
                instance("i-borderline", "t3.medium", ResourceState::Running),
            ],
            Vec::new(),
        );
        let metrics = FakeMetrics::new()
            .with_series("i-very-idle", &[3.0])
            .with_series("i-mostly-idle", &[7.0])
            .with_series("i-borderline", &[5.0]);
        let engine = aggregator(inventory, metrics, PolicyConfig::default());

        let report = engine.analyze().await.unwrap();
        let action_for = |id: &str| {
            report
                .recommendations
                .iter()
                .find(|r| r.resource_id == id && r.action != RecommendedAction::RightsizeInstance)
                .map(|r| (r.action, r.priority))
                .unwrap()
        };

        assert_eq!(
            action_for("i-very-idle"),
            (RecommendedAction::StopInstance, Priority::High)
        );
        assert_eq!(
            action_for("i-mostly-idle"),
            (RecommendedAction::DownsizeInstance, Priority::Medium)
        );
        // Exactly at the stop threshold means downsize, not stop
        assert_eq!(
            action_for("i-borderline"),
            (RecommendedAction::DownsizeInstance, Priority::Medium)
        );
    }

    #[tokio::test]
    async fn failed_pass_annotates_report_without_suppressing_others() {
        let inventory = FakeInventory::new(
            vec![instance("i-1", "t3.medium", ResourceState::Running)],
            vec![volume("vol-1", "gp3", 100, ResourceState::Unattached)],
        );
        let metrics = FakeMetrics::new().with_series("i-1", &[3.0]);
        let policy = PolicyConfig {
            rightsize_low: 80.0,
            rightsize_high: 20.0,
            ..PolicyConfig::default()
        };
        let engine = aggregator(inventory, metrics, policy);

        let report = engine.analyze().await.unwrap();

        let rightsizing = report
            .pass_summaries
            .iter()
            .find(|s| s.pass == PassKind::Rightsizing)
            .unwrap();
        assert!(rightsizing.error.is_some());

        // Idle and volume passes still contributed
        let ids: Vec<&str> = report
            .recommendations
            .iter()
            .map(|r| r.resource_id.as_str())
            .collect();
        assert_eq!(ids, ["i-1", "vol-1"]);
    }

    #[tokio::test]
    async fn inventory_unavailability_fails_the_whole_run() {
        let engine = aggregator(
            FakeInventory::unavailable(),
            FakeMetrics::new(),
            PolicyConfig::default(),
        );

        let result = engine.analyze().await;
        assert!(matches!(result, Err(OptimizerError::Inventory(_))));
    }
}
