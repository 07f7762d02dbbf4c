// Backup driver: pages through the environment listing and saves each environment's latest state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::downloader::{Artifact, StateDownloader};
use super::stats::{BackupStats, BackupSummary, RunOutcome};
use crate::config::{BackupConfig, NO_STATE_VERSION, PAGE_RETRY_BACKOFF_MS};
use crate::error::{BackupError, Result};
use crate::source::traits::{EnvironmentPage, StateSource};

pub struct BackupDriver {
    source: Arc<dyn StateSource>,
    downloader: StateDownloader,
    stats: Arc<BackupStats>,
    page_delay: Duration,
    max_page_retries: u32,
    cancel: CancellationToken,
}

impl BackupDriver {
    pub fn new(source: Arc<dyn StateSource>, config: &BackupConfig) -> Self {
        let stats = Arc::new(BackupStats::new());
        let downloader = StateDownloader::new(
            Arc::clone(&source),
            config.output_dir.clone(),
            Arc::clone(&stats),
        );
        Self {
            source,
            downloader,
            stats,
            page_delay: config.page_delay,
            max_page_retries: config.max_page_retries,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the run between environments or during the page delay.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Walk pages from 1 until an empty page, a failed page or cancellation.
    ///
    /// Only an unusable output directory is returned as `Err`; a failed page listing
    /// ends the run with `RunOutcome::Aborted`, and per-environment failures are
    /// recorded in the summary and skipped.
    pub async fn run(&self) -> Result<BackupSummary> {
        self.downloader.prepare().await?;

        let mut page: u32 = 1;
        let outcome = 'pages: loop {
            if self.cancel.is_cancelled() {
                break RunOutcome::Cancelled;
            }

            info!("fetching environments page {}", page);
            let environments = match self.fetch_page_with_retry(page).await {
                Ok(Some(envs)) => envs,
                Ok(None) => break RunOutcome::Cancelled,
                Err(e) => {
                    error!("listing page {} failed, stopping: {}", page, e);
                    break RunOutcome::Aborted {
                        page,
                        reason: e.to_string(),
                    };
                }
            };
            self.stats.record_page();

            if environments.is_empty() {
                debug!("page {} is empty, done", page);
                break RunOutcome::Completed;
            }

            for (name, &state_id) in &environments {
                if self.cancel.is_cancelled() {
                    break 'pages RunOutcome::Cancelled;
                }

                info!(
                    "#{} backing up environment {} (state id {})",
                    self.stats.processed() + 1,
                    name,
                    state_id
                );
                match self.process_environment(name, state_id).await {
                    Ok(artifact) => debug!("{} -> {}", name, artifact.path().display()),
                    Err(e) => {
                        warn!("skipping environment {}: {}", name, e);
                        self.stats.record_skipped(name, e.to_string());
                    }
                }
            }

            page += 1;
            tokio::select! {
                _ = tokio::time::sleep(self.page_delay) => {}
                _ = self.cancel.cancelled() => break 'pages RunOutcome::Cancelled,
            }
        };

        let summary = self.stats.summary(outcome);
        info!(
            "backed up {} environments ({} states, {} placeholders, {} bytes) over {} pages, {} skipped",
            summary.processed(),
            summary.states_downloaded,
            summary.placeholders_written,
            summary.bytes_written,
            summary.pages_fetched,
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Resolve the latest version and write its artifact. An environment with no
    /// versions gets the placeholder instead of being skipped.
    async fn process_environment(&self, name: &str, state_id: u64) -> Result<Artifact> {
        let version = match self.source.latest_version(name, state_id).await {
            Ok(version) => version,
            Err(BackupError::NoStateVersions { .. }) => NO_STATE_VERSION,
            Err(e) => return Err(e),
        };
        self.downloader.download(name, state_id, version).await
    }

    /// `Ok(None)` when cancelled before or between attempts.
    async fn fetch_page_with_retry(&self, page: u32) -> Result<Option<EnvironmentPage>> {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            match self.source.list_environments(page).await {
                Ok(envs) => return Ok(Some(envs)),
                Err(e) if attempt < self.max_page_retries && !e.is_auth_rejected() => {
                    attempt += 1;
                    warn!(
                        "listing page {} failed (attempt {}): {}",
                        page, attempt, e
                    );
                    let backoff = Duration::from_millis(PAGE_RETRY_BACKOFF_MS * attempt as u64);
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.cancel.cancelled() => {
                            debug!("retry of page {} cancelled", page);
                            return Ok(None);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Cancels `cancel` on the first interrupt and returns `true` on the second, so the
/// caller can exit without waiting for a hung request. Returns `false` if the
/// interrupt source fails.
pub async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = interrupt().await {
        warn!("cannot listen for interrupts: {}", e);
        return false;
    }
    warn!("interrupted, stopping after the current environment (interrupt again to exit now)");
    cancel.cancel();

    match interrupt().await {
        Ok(()) => true,
        Err(e) => {
            warn!("cannot listen for interrupts: {}", e);
            false
        }
    }
}
