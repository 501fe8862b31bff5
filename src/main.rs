use clap::Parser;
use log::{debug, info};
use optimizer::{
    Cli, Command, CostModel, InventoryClient, MetricsClient, OptimizerOutput, OutputFormat,
    PassKind, RecommendationAggregator, ResourceAnalyzer, Result, display_recommendations_table,
    format_pass_outcome, format_report, init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose, cli.quiet)?;

    info!("Starting Cloud Fleet Cost Optimizer");
    debug!("Inventory endpoint: {}", cli.inventory_url);
    debug!("Metrics endpoint: {}", cli.metrics_url);
    debug!("AWS Region: {}", cli.region);

    let inventory = InventoryClient::new(cli.inventory_url.clone())?;
    let metrics = MetricsClient::new(cli.metrics_url.clone(), cli.region.clone()).await?;
    let analyzer = ResourceAnalyzer::new(metrics, cli.policy(), CostModel::default());
    let engine = RecommendationAggregator::new(inventory, analyzer);

    match cli.command {
        Command::Idle => run_single_pass(&engine, PassKind::Idle).await,
        Command::Rightsize => run_single_pass(&engine, PassKind::Rightsizing).await,
        Command::UnusedVolumes => run_single_pass(&engine, PassKind::UnusedVolumes).await,
        Command::Analyze => {
            let report = engine.analyze().await?;
            let output =
                OptimizerOutput::new(cli.region.clone(), engine.policy().clone(), report);

            if let Some(path) = &cli.output_file {
                std::fs::write(path, serde_json::to_string_pretty(&output)?)?;
                info!("Report written to {}", path.display());
            }

            match cli.output {
                OutputFormat::Text => println!("{}", format_report(&output.report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Table => {
                    display_recommendations_table(&output.report.recommendations)?
                }
            }
            Ok(())
        }
    }
}

async fn run_single_pass<I, M>(
    engine: &RecommendationAggregator<I, M>,
    pass: PassKind,
) -> Result<()>
where
    I: optimizer::InventoryProvider,
    M: optimizer::MetricsSource,
{
    let outcome = engine.run_pass(pass).await?;
    println!("{}", format_pass_outcome(pass, &outcome));
    Ok(())
}
