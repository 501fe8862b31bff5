//! Cloud Fleet Cost Optimizer Library
//!
//! This library analyzes compute fleet inventory and utilization telemetry,
//! classifies resources against optimization policies (idle instances,
//! rightsizing candidates, unattached volumes), and produces a ranked,
//! explainable list of cost-saving actions.

pub mod lib {
    pub mod aggregator;
    pub mod analyzer;
    pub mod cli;
    pub mod config;
    pub mod cost;
    pub mod error;
    pub mod inventory;
    pub mod logger;
    pub mod metrics;
    pub mod output;
    pub mod tui;
}

// Re-export commonly used types at the root level for convenience
pub use lib::aggregator::{
    AnalysisReport, PassKind, PassSummary, Priority, Recommendation, RecommendationAggregator,
    RecommendedAction,
};
pub use lib::analyzer::{
    Finding, FindingCategory, PassOutcome, ResourceAnalyzer, SkippedResource, mean_utilization,
};
pub use lib::cli::{Cli, Command, OutputFormat};
pub use lib::config::PolicyConfig;
pub use lib::cost::{CostModel, round_currency};
pub use lib::error::{
    ConfigError, InventoryError, MetricsError, OptimizerError, Result,
};
pub use lib::inventory::{
    InventoryClient, InventoryProvider, ResourceKind, ResourceSample, ResourceState,
    UtilizationSample,
};
pub use lib::logger::init_logger;
pub use lib::metrics::{MetricsClient, MetricsSource};
pub use lib::output::{OptimizerOutput, OutputMetadata, format_pass_outcome, format_report};
pub use lib::tui::display_recommendations_table;
