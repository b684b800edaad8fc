use clap::{Parser, Subcommand};
use metrics_exporter_statsd::StatsdBuilder;
use relay::config::{Config, MetricsConfig};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Message fan-out relay with a delivery audit trail
#[derive(Parser)]
#[command(name = "scatter")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the relay service
    Serve,
    /// Load and validate the configuration, then exit
    Check,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Check => {
            println!("--- Parsed Config ---\n{config:#?}");
            Ok(())
        }
        Command::Serve => serve(config),
    }
}

fn serve(config: Config) -> Result<(), Box<dyn Error>> {
    // The guard flushes pending events on drop; it must outlive the runtime.
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    if let Some(metrics_config) = &config.metrics {
        init_metrics(metrics_config)?;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting scatter");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(relay::run(config))?;
    Ok(())
}

fn init_metrics(config: &MetricsConfig) -> Result<(), Box<dyn Error>> {
    let recorder = StatsdBuilder::from(&config.statsd_host, config.statsd_port)
        .build(Some("scatter"))?;
    metrics::set_global_recorder(recorder)
        .map_err(|error| format!("failed to install statsd recorder: {error}"))?;
    Ok(())
}
