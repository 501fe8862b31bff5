use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;

use crate::lib::config::PolicyConfig;
use crate::lib::cost::{CostModel, round_currency};
use crate::lib::error::Result;
use crate::lib::inventory::{ResourceKind, ResourceSample, ResourceState, UtilizationSample};
use crate::lib::metrics::MetricsSource;

/// Fraction of an idle instance's monthly cost eliminated by stopping it.
/// Compute charges stop; storage and networking residuals remain.
pub const IDLE_SAVINGS_FACTOR: f64 = 0.7;

/// Fraction of monthly cost saved by moving one size tier down
pub const DOWNSIZE_SAVINGS_FACTOR: f64 = 0.3;

/// Fraction of monthly cost *added* by moving one size tier up
pub const UPSIZE_COST_FACTOR: f64 = 0.2;

/// Classification assigned to a resource by one analysis pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Idle,
    RightsizeDown,
    RightsizeUp,
    UnusedStorage,
}

/// A classified, cost-annotated observation about one resource from one
/// analysis pass.
///
/// `estimated_savings` is signed: negative means acting on the finding
/// increases cost (an upsize), which keeps it informational rather than
/// actionable. Monetary fields are rounded to cents.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub resource_id: String,
    pub resource_kind: ResourceKind,
    pub type_class: String,
    pub metric_value: f64,
    pub category: FindingCategory,
    pub estimated_monthly_cost: f64,
    pub estimated_savings: f64,
}

/// Diagnostic for a resource a pass had to skip
#[derive(Debug, Clone, Serialize)]
pub struct SkippedResource {
    pub resource_id: String,
    pub reason: String,
}

/// Result of one analysis pass: the findings it produced plus the
/// resources it skipped on transient metrics failures.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkippedResource>,
}

/// Arithmetic mean of a utilization series, 0.0 when the series is empty.
///
/// Missing telemetry is deliberately treated as idle-looking rather than
/// excluded: an instance reporting no metrics is itself suspicious.
pub fn mean_utilization(series: &[UtilizationSample]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().map(|s| s.percent).sum::<f64>() / series.len() as f64
}

/// Classifies fleet resources against the optimization policy and attaches
/// cost estimates.
pub struct ResourceAnalyzer<M> {
    metrics: M,
    policy: PolicyConfig,
    costs: CostModel,
}

impl<M: MetricsSource> ResourceAnalyzer<M> {
    pub fn new(metrics: M, policy: PolicyConfig, costs: CostModel) -> Self {
        Self {
            metrics,
            policy,
            costs,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    fn lookback_window(&self) -> Duration {
        Duration::from_secs(self.policy.lookback_days * 24 * 3600)
    }

    /// Find running instances whose mean CPU sits below the idle threshold.
    pub async fn find_idle(&self, resources: &[ResourceSample]) -> Result<PassOutcome> {
        self.policy.validate_idle()?;
        info!(
            "Analyzing {} resources for idle instances (threshold {}%)",
            resources.len(),
            self.policy.cpu_idle_threshold
        );

        let mut outcome = PassOutcome::default();
        for resource in running_instances(resources) {
            let instance = match self.hydrate(resource).await {
                Ok(hydrated) => hydrated,
                Err(e) => {
                    warn!("Could not get metrics for {}: {e}", resource.id);
                    outcome.skipped.push(SkippedResource {
                        resource_id: resource.id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mean = mean_utilization(&instance.utilization);
            if mean < self.policy.cpu_idle_threshold {
                let cost = self.costs.instance_monthly_cost(&instance.type_class);
                outcome.findings.push(Finding {
                    resource_id: instance.id,
                    resource_kind: ResourceKind::Instance,
                    type_class: instance.type_class,
                    metric_value: mean,
                    category: FindingCategory::Idle,
                    estimated_monthly_cost: round_currency(cost),
                    estimated_savings: round_currency(cost * IDLE_SAVINGS_FACTOR),
                });
            }
        }

        info!(
            "Idle pass produced {} findings, skipped {} resources",
            outcome.findings.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    /// Find running instances sized too large or too small for their load.
    ///
    /// Instances between the two thresholds are correctly sized and produce
    /// no finding.
    pub async fn find_rightsizing(&self, resources: &[ResourceSample]) -> Result<PassOutcome> {
        self.policy.validate_rightsizing()?;
        info!(
            "Analyzing {} resources for rightsizing (low {}%, high {}%)",
            resources.len(),
            self.policy.rightsize_low,
            self.policy.rightsize_high
        );

        let mut outcome = PassOutcome::default();
        for resource in running_instances(resources) {
            let instance = match self.hydrate(resource).await {
                Ok(hydrated) => hydrated,
                Err(e) => {
                    warn!("Could not analyze {}: {e}", resource.id);
                    outcome.skipped.push(SkippedResource {
                        resource_id: resource.id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mean = mean_utilization(&instance.utilization);
            let cost = self.costs.instance_monthly_cost(&instance.type_class);

            let (category, savings) = if mean < self.policy.rightsize_low {
                (
                    FindingCategory::RightsizeDown,
                    cost * DOWNSIZE_SAVINGS_FACTOR,
                )
            } else if mean > self.policy.rightsize_high {
                // Upsizing costs more, so the savings are negative
                (FindingCategory::RightsizeUp, -cost * UPSIZE_COST_FACTOR)
            } else {
                continue;
            };

            outcome.findings.push(Finding {
                resource_id: instance.id,
                resource_kind: ResourceKind::Instance,
                type_class: instance.type_class,
                metric_value: mean,
                category,
                estimated_monthly_cost: round_currency(cost),
                estimated_savings: round_currency(savings),
            });
        }

        info!(
            "Rightsizing pass produced {} findings, skipped {} resources",
            outcome.findings.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    /// Find volumes not attached to any instance.
    ///
    /// The unattached state is itself the signal, so every qualifying
    /// volume becomes a finding and deleting it recovers its full cost.
    pub fn find_unused_volumes(&self, resources: &[ResourceSample]) -> Result<PassOutcome> {
        info!("Analyzing {} resources for unused volumes", resources.len());

        let mut outcome = PassOutcome::default();
        for volume in resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Volume && r.state == ResourceState::Unattached)
        {
            let cost = self
                .costs
                .volume_monthly_cost(volume.size_gb.unwrap_or(0), &volume.type_class);
            outcome.findings.push(Finding {
                resource_id: volume.id.clone(),
                resource_kind: ResourceKind::Volume,
                type_class: volume.type_class.clone(),
                metric_value: 0.0,
                category: FindingCategory::UnusedStorage,
                estimated_monthly_cost: cost,
                estimated_savings: cost,
            });
        }

        info!("Unused-volume pass produced {} findings", outcome.findings.len());
        Ok(outcome)
    }

    /// Return a copy of the resource with its utilization series attached.
    ///
    /// A transient metrics failure is retried once before it surfaces to
    /// the caller; the retry is local to this single fetch.
    async fn hydrate(&self, resource: &ResourceSample) -> Result<ResourceSample> {
        let window = self.lookback_window();
        let utilization = match self.metrics.get_utilization(&resource.id, window).await {
            Ok(series) => series,
            Err(first) => {
                debug!("Retrying metrics fetch for {}: {first}", resource.id);
                self.metrics.get_utilization(&resource.id, window).await?
            }
        };

        Ok(ResourceSample {
            utilization,
            ..resource.clone()
        })
    }
}

fn running_instances(resources: &[ResourceSample]) -> impl Iterator<Item = &ResourceSample> {
    resources
        .iter()
        .filter(|r| r.kind == ResourceKind::Instance && r.state == ResourceState::Running)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::lib::error::MetricsError;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory metrics source: a fixed series per resource id, plus an
    /// optional number of failures to serve before succeeding.
    pub struct FakeMetrics {
        series: HashMap<String, Vec<f64>>,
        failures: Mutex<HashMap<String, u32>>,
    }

    impl FakeMetrics {
        pub fn new() -> Self {
            Self {
                series: HashMap::new(),
                failures: Mutex::new(HashMap::new()),
            }
        }

        pub fn with_series(mut self, id: &str, percents: &[f64]) -> Self {
            self.series.insert(id.to_string(), percents.to_vec());
            self
        }

        /// Serve `count` transient errors for `id` before succeeding
        pub fn failing(self, id: &str, count: u32) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(id.to_string(), count);
            self
        }
    }

    impl MetricsSource for FakeMetrics {
        async fn get_utilization(
            &self,
            resource_id: &str,
            _window: Duration,
        ) -> Result<Vec<UtilizationSample>> {
            if let Some(remaining) = self.failures.lock().unwrap().get_mut(resource_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(MetricsError::QueryFailed(format!(
                        "synthetic failure for {resource_id}"
                    ))
                    .into());
                }
            }

            let percents = self.series.get(resource_id).cloned().unwrap_or_default();
            Ok(percents
                .iter()
                .enumerate()
                .map(|(i, &percent)| UtilizationSample {
                    timestamp: DateTime::from_timestamp(1_700_000_000 + i as i64 * 3600, 0)
                        .unwrap(),
                    percent,
                })
                .collect())
        }
    }

    pub fn instance(id: &str, type_class: &str, state: ResourceState) -> ResourceSample {
        ResourceSample {
            id: id.to_string(),
            kind: ResourceKind::Instance,
            type_class: type_class.to_string(),
            state,
            size_gb: None,
            utilization: Vec::new(),
        }
    }

    pub fn volume(id: &str, type_class: &str, size_gb: u64, state: ResourceState) -> ResourceSample {
        ResourceSample {
            id: id.to_string(),
            kind: ResourceKind::Volume,
            type_class: type_class.to_string(),
            state,
            size_gb: Some(size_gb),
            utilization: Vec::new(),
        }
    }
}
