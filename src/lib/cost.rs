use std::collections::HashMap;

/// Round a currency amount to cents.
///
/// All monetary values in Findings and Recommendations are rounded through
/// here once, at construction, so downstream sums stay exact at 2-decimal
/// precision.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Static monthly rate tables for cost estimation.
///
/// These are deliberately approximate: the engine ranks and explains
/// optimization actions, it does not reproduce a billing statement. Rates
/// are injectable so tests can supply synthetic tables and so the unknown-
/// type fallback is an explicit branch.
#[derive(Clone, Debug)]
pub struct CostModel {
    instance_rates: HashMap<String, f64>,
    volume_gb_rates: HashMap<String, f64>,
    default_instance_rate: f64,
    default_volume_gb_rate: f64,
}

impl CostModel {
    pub fn new(
        instance_rates: HashMap<String, f64>,
        volume_gb_rates: HashMap<String, f64>,
        default_instance_rate: f64,
        default_volume_gb_rate: f64,
    ) -> Self {
        Self {
            instance_rates,
            volume_gb_rates,
            default_instance_rate,
            default_volume_gb_rate,
        }
    }

    /// Estimated monthly cost in USD for an instance type class.
    ///
    /// Unknown type classes fall back to the default rate rather than
    /// failing the pass.
    pub fn instance_monthly_cost(&self, type_class: &str) -> f64 {
        self.instance_rates
            .get(type_class)
            .copied()
            .unwrap_or(self.default_instance_rate)
    }

    /// Estimated monthly cost in USD for a volume of `size_gb` gigabytes.
    pub fn volume_monthly_cost(&self, size_gb: u64, type_class: &str) -> f64 {
        let per_gb = self
            .volume_gb_rates
            .get(type_class)
            .copied()
            .unwrap_or(self.default_volume_gb_rate);
        round_currency(size_gb as f64 * per_gb)
    }
}

impl Default for CostModel {
    fn default() -> Self {
        let instance_rates = HashMap::from([
            ("t2.micro".to_string(), 8.5),
            ("t2.small".to_string(), 17.0),
            ("t2.medium".to_string(), 34.0),
            ("t3.micro".to_string(), 7.5),
            ("t3.small".to_string(), 15.0),
            ("t3.medium".to_string(), 30.0),
            ("m5.large".to_string(), 77.0),
            ("m5.xlarge".to_string(), 154.0),
            ("c5.large".to_string(), 68.0),
            ("c5.xlarge".to_string(), 136.0),
        ]);
        // USD per GB-month
        let volume_gb_rates = HashMap::from([
            ("gp2".to_string(), 0.10),
            ("gp3".to_string(), 0.08),
            ("io1".to_string(), 0.125),
            ("io2".to_string(), 0.125),
            ("st1".to_string(), 0.045),
            ("sc1".to_string(), 0.025),
        ]);

        Self {
            instance_rates,
            volume_gb_rates,
            default_instance_rate: 100.0,
            default_volume_gb_rate: 0.10,
        }
    }
}
