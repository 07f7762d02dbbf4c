// atlas-backup: save the latest state of every Atlas environment in an organization

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atlas_backup::config::{DEFAULT_BASE_URL, DEFAULT_PAGE_DELAY_SECS};
use atlas_backup::engine::driver::watch_interrupts;
use atlas_backup::source::http_source::HttpStateSource;
use atlas_backup::{BackupConfig, BackupDriver, RunOutcome};

#[derive(Debug, Parser)]
#[command(name = "atlas-backup", version, about = "Performs backup of all Atlas legacy states", long_about = None)]
struct Cli {
    /// Cookie payload generated after authenticating with Atlas via web
    #[arg(short, long, env = "ATLAS_SESSION_COOKIE", hide_env_values = true)]
    cookie: String,
    /// Path to save session state files
    #[arg(short, long)]
    path: PathBuf,
    /// Organization name
    #[arg(short, long, env = "ATLAS_ORG")]
    org: String,
    /// Atlas UI API root
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Seconds to wait between listing pages
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PAGE_DELAY_SECS)]
    page_delay_secs: u64,
    /// Extra attempts for a failed page listing before giving up
    #[arg(long, value_name = "N", default_value_t = 0)]
    page_retries: u32,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = BackupConfig::new(cli.cookie, cli.path, cli.org)
        .with_base_url(cli.base_url)
        .with_page_delay(Duration::from_secs(cli.page_delay_secs))
        .with_max_page_retries(cli.page_retries);
    info!("starting backup: {:?}", config);

    let source = HttpStateSource::new(&config).context("failed to build Atlas client")?;
    let driver = BackupDriver::new(Arc::new(source), &config);

    let cancel = driver.cancel_token();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            warn!("interrupted again, exiting");
            std::process::exit(130);
        }
    });

    let summary = driver
        .run()
        .await
        .with_context(|| format!("cannot write to {}", config.output_dir.display()))?;

    for skipped in &summary.skipped {
        warn!("not backed up: {} ({})", skipped.name, skipped.reason);
    }

    let processed = summary.processed();
    match summary.outcome {
        RunOutcome::Completed | RunOutcome::Cancelled => {
            info!("Done downloading {} session states.", processed);
            Ok(())
        }
        RunOutcome::Aborted { page, reason } => bail!(
            "backup stopped at page {} after {} session states: {}",
            page,
            processed,
            reason
        ),
    }
}
