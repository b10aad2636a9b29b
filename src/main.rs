use cardroom_load::{LoadError, Result, RunConfig, Scheduler};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() {
    // Initialize the application and run
    if let Err(e) = run().await {
        error!("Application failed: {}", e);
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Parse and validate configuration
    let config = RunConfig::from_args()?;

    // Initialize logging based on verbosity
    init_logging(&config)?;

    info!("🃏 Card-Room Load Generator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Print configuration summary
    config.print_summary();

    let scheduler = Scheduler::new(config)?;
    let report = scheduler.run().await;
    report.print();

    if report.interrupted {
        info!("Load test interrupted");
    } else {
        info!("Load test completed successfully");
    }
    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &RunConfig) -> Result<()> {
    let crate_level = if config.output.verbose {
        "debug"
    } else {
        "info"
    };

    let mut filter = EnvFilter::from_default_env();
    for directive in [
        format!("cardroom_load={}", crate_level),
        "tokio_tungstenite=warn".to_string(),
        "tungstenite=warn".to_string(),
    ] {
        filter = filter.add_directive(directive.parse().map_err(|e| {
            LoadError::config(format!("Invalid filter directive '{}': {}", directive, e))
        })?);
    }

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoadError::config(format!("Failed to set global subscriber: {}", e)))?;

    if config.output.verbose {
        info!("Verbose logging enabled");
    }
    Ok(())
}
