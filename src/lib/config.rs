use serde::Serialize;

use crate::lib::error::ConfigError;

/// Classification policy for all analysis passes.
///
/// Every threshold the passes branch on lives here, so the full policy is
/// inspectable as one value and cannot drift between passes.
#[derive(Clone, Debug, Serialize)]
pub struct PolicyConfig {
    /// Mean CPU percent below which a running instance counts as idle
    pub cpu_idle_threshold: f64,
    /// Mean CPU percent below which an instance is a downsize candidate
    pub rightsize_low: f64,
    /// Mean CPU percent above which an instance is an upsize candidate
    pub rightsize_high: f64,
    /// Mean CPU percent below which an idle instance should be stopped
    /// outright rather than downsized
    pub stop_threshold: f64,
    /// Days of utilization history to average over
    pub lookback_days: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            cpu_idle_threshold: 10.0,
            rightsize_low: 20.0,
            rightsize_high: 80.0,
            stop_threshold: 5.0,
            lookback_days: 7,
        }
    }
}

impl PolicyConfig {
    /// Validate the thresholds the idle pass depends on.
    pub fn validate_idle(&self) -> std::result::Result<(), ConfigError> {
        if self.cpu_idle_threshold < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "cpu_idle_threshold must be non-negative, got {}",
                self.cpu_idle_threshold
            )));
        }
        Ok(())
    }

    /// Validate the thresholds the rightsizing pass depends on.
    ///
    /// `rightsize_low > rightsize_high` would make the two classifications
    /// overlap, so the pass fails fast instead.
    pub fn validate_rightsizing(&self) -> std::result::Result<(), ConfigError> {
        if self.rightsize_low < 0.0 || self.rightsize_high < 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "rightsizing thresholds must be non-negative, got low={} high={}",
                self.rightsize_low, self.rightsize_high
            )));
        }
        if self.rightsize_low > self.rightsize_high {
            return Err(ConfigError::InvalidThresholds(format!(
                "rightsize_low ({}) must not exceed rightsize_high ({})",
                self.rightsize_low, self.rightsize_high
            )));
        }
        Ok(())
    }
}
