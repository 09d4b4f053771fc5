use identity_pulse::ingest::{load_directory, load_population};
use identity_pulse::utils::{init_logger, AnalysisConfig, PipelineMetrics};
use identity_pulse::{AnalysisPipeline, ReportSummary};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Analyze identity transaction datasets for outages, surges and divides
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory searched recursively for dataset CSVs
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// TOML configuration file (defaults to $PULSE_CONFIG or config/pulse.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV of state,district,population estimates
    #[arg(short, long)]
    population: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "pulse_report.json")]
    output: PathBuf,

    /// Also write Prometheus metrics to this file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Log level, overriding the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load_layered(Some(path))?,
        None => AnalysisConfig::load()?,
    };

    // Initialize logging
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    let json = args.json_logs || config.logging.output == "json";
    let log_file = (!config.logging.file_path.is_empty())
        .then(|| PathBuf::from(&config.logging.file_path));
    init_logger(level, json, log_file.as_deref())?;

    info!("✓ Configuration loaded ({:?} periods)", config.aggregation.granularity);

    if let Some(path) = &args.population {
        config.population.extend(load_population(path)?);
    }

    let metrics = PipelineMetrics::new()?;

    let (records, ingest_stats) = load_directory(&args.data_dir)?;
    metrics.observe_ingest(&ingest_stats);

    let pipeline = AnalysisPipeline::new(config.pipeline_config());
    let report = pipeline.run(&records).context("Analysis failed")?;
    metrics.observe(&report);

    let summary = ReportSummary::from_report(&report, &config.detection);
    println!("{}", summary.render());

    std::fs::write(&args.output, report.to_json()?)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Report saved to: {}", args.output.display());
    println!("Fingerprint: {}", report.fingerprint()?);

    if let Some(path) = &args.metrics {
        std::fs::write(path, metrics.encode()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Metrics written to {}", path.display());
    }

    Ok(())
}
