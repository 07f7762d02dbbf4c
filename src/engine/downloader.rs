// State downloader: fetches one raw state document and writes it under the output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::stats::BackupStats;
use crate::config::{NO_STATE_PLACEHOLDER, NO_STATE_VERSION};
use crate::error::{BackupError, Result};
use crate::source::traits::StateSource;

/// What ended up on disk for an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    State { path: PathBuf, bytes: u64 },
    Placeholder { path: PathBuf },
}

impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Self::State { path, .. } | Self::Placeholder { path } => path,
        }
    }
}

pub struct StateDownloader {
    source: Arc<dyn StateSource>,
    output_dir: PathBuf,
    stats: Arc<BackupStats>,
}

impl StateDownloader {
    pub fn new(source: Arc<dyn StateSource>, output_dir: PathBuf, stats: Arc<BackupStats>) -> Self {
        Self {
            source,
            output_dir,
            stats,
        }
    }

    /// Create the output directory if it does not exist yet.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| BackupError::Io {
                path: self.output_dir.clone(),
                source,
            })
    }

    /// `{output_dir}/{environment}-sessionState-{version}`, used for states and placeholders alike.
    pub fn artifact_path(&self, environment: &str, version: i64) -> Result<PathBuf> {
        if !is_safe_file_stem(environment) {
            return Err(BackupError::InvalidEnvironmentName(environment.to_string()));
        }
        Ok(self
            .output_dir
            .join(format!("{}-sessionState-{}", environment, version)))
    }

    /// Write the state for `version`, or the placeholder when `version` is the no-state sentinel.
    /// The placeholder path never touches the network.
    pub async fn download(&self, environment: &str, state_id: u64, version: i64) -> Result<Artifact> {
        let path = self.artifact_path(environment, version)?;

        if version == NO_STATE_VERSION {
            write_file(&path, NO_STATE_PLACEHOLDER.as_bytes()).await?;
            self.stats
                .record_placeholder(NO_STATE_PLACEHOLDER.len() as u64);
            info!("no state for {}, wrote placeholder {}", environment, path.display());
            return Ok(Artifact::Placeholder { path });
        }

        let data = self.source.fetch_state(environment, state_id, version).await?;
        write_file(&path, &data).await?;

        let bytes = data.len() as u64;
        self.stats.record_download(bytes);
        debug!(
            "saved {} v{} ({} bytes) to {}",
            environment,
            version,
            bytes,
            path.display()
        );
        Ok(Artifact::State { path, bytes })
    }
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .map_err(|source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Names must stay inside the output directory.
fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::source::traits::EnvironmentPage;

    /// Panics on any network call.
    struct OfflineSource;

    #[async_trait]
    impl StateSource for OfflineSource {
        async fn list_environments(&self, _page: u32) -> Result<EnvironmentPage> {
            panic!("unexpected list_environments");
        }

        async fn latest_version(&self, _environment: &str, _state_id: u64) -> Result<i64> {
            panic!("unexpected latest_version");
        }

        async fn fetch_state(&self, _environment: &str, _state_id: u64, _version: i64) -> Result<Bytes> {
            panic!("unexpected fetch_state");
        }
    }

    fn downloader(dir: &Path) -> (StateDownloader, Arc<BackupStats>) {
        let stats = Arc::new(BackupStats::new());
        let dl = StateDownloader::new(Arc::new(OfflineSource), dir.to_path_buf(), Arc::clone(&stats));
        (dl, stats)
    }

    #[tokio::test]
    async fn test_placeholder_written_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, stats) = downloader(dir.path());

        let artifact = dl.download("empty-env", 5, NO_STATE_VERSION).await.unwrap();

        let expected = dir.path().join("empty-env-sessionState--1");
        assert_eq!(artifact, Artifact::Placeholder { path: expected.clone() });
        assert_eq!(std::fs::read_to_string(expected).unwrap(), "No state found");
        assert_eq!(stats.processed(), 1);
    }

    #[tokio::test]
    async fn test_prepare_creates_nested_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let (dl, _) = downloader(&nested);

        dl.prepare().await.unwrap();
        dl.download("env", 1, NO_STATE_VERSION).await.unwrap();
        assert!(nested.join("env-sessionState--1").exists());
    }

    #[test]
    fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (dl, _) = downloader(dir.path());

        for name in ["", ".", "..", "../etc", "a/b", "a\\b"] {
            assert!(
                matches!(dl.artifact_path(name, 1), Err(BackupError::InvalidEnvironmentName(_))),
                "{:?} should be rejected",
                name
            );
        }
        assert_eq!(
            dl.artifact_path("prod.us-east", 3).unwrap(),
            dir.path().join("prod.us-east-sessionState-3")
        );
    }
}
