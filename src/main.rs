use std::fs::{self, File};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use contract_scraper::types::run_stamp;
use contract_scraper::{Pipeline, ScraperConfig, ScraperError};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("run failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ScraperError> {
    let config = ScraperConfig::from_env()?;
    fs::create_dir_all(&config.logs_dir)?;
    fs::create_dir_all(&config.output_dir)?;

    let stamp = run_stamp();
    let log_number = fs::read_dir(&config.logs_dir)?.filter_map(|e| e.ok()).count() + 1;
    let log_path = config.logs_dir.join(format!("log_{log_number}_{stamp}.txt"));
    let log_file = File::create(&log_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(log_file)))
        .init();
    info!("Logging to {}", log_path.display());

    let outcome = Pipeline::new(config).run().await?;
    info!(
        "Run finished: {} rows, {:?}",
        outcome.report.rows.len(),
        outcome.report.counts
    );
    Ok(())
}
