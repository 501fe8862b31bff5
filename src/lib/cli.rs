use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

use crate::lib::config::PolicyConfig;

/// Cloud Fleet Cost Optimizer
///
/// Analyzes instance and volume utilization and recommends cost
/// optimizations: stopping idle instances, rightsizing over-provisioned
/// ones, and deleting unattached volumes.
#[derive(Parser, Debug)]
#[command(name = "optimizer", author, version, about, styles=get_styles())]
pub struct Cli {
    /// Fleet inventory service endpoint
    #[arg(long, value_name = "URL")]
    pub inventory_url: Url,

    /// Prometheus-compatible metrics workspace endpoint
    #[arg(long, value_name = "URL")]
    pub metrics_url: Url,

    /// AWS Region used to sign metrics queries
    #[arg(short, long)]
    pub region: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress log output to stdout/stderr (logs still written to file)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format: text (default), json, or an interactive table
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub output: OutputFormat,

    /// Write the JSON report to a file in addition to stdout output
    #[arg(long, value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Days of utilization history to average over (default: 7)
    #[arg(long, default_value = "7")]
    pub lookback_days: u64,

    /// Mean CPU percent below which a running instance counts as idle
    #[arg(long, default_value = "10.0")]
    pub cpu_threshold: f64,

    /// Mean CPU percent below which an instance is a downsize candidate
    #[arg(long, default_value = "20.0")]
    pub rightsize_low: f64,

    /// Mean CPU percent above which an instance is an upsize candidate
    #[arg(long, default_value = "80.0")]
    pub rightsize_high: f64,

    /// Mean CPU percent below which an idle instance should be stopped
    /// outright rather than downsized
    #[arg(long, default_value = "5.0")]
    pub stop_threshold: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find idle instances
    Idle,
    /// Find rightsizing opportunities
    Rightsize,
    /// Find unattached volumes
    UnusedVolumes,
    /// Run all passes and produce the ranked recommendation report
    Analyze,
}

/// Output format for analysis results
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary
    Text,
    /// JSON report
    Json,
    /// Interactive table (TUI)
    Table,
}

impl Cli {
    /// Collect the threshold flags into the one policy value every pass
    /// reads from.
    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            cpu_idle_threshold: self.cpu_threshold,
            rightsize_low: self.rightsize_low,
            rightsize_high: self.rightsize_high,
            stop_threshold: self.stop_threshold,
            lookback_days: self.lookback_days,
        }
    }
}

/// Set color and variants for help description
fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}
