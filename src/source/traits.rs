use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One listing page: environment name to its current state id.
pub type EnvironmentPage = BTreeMap<String, u64>;

/// The three remote calls the backup needs.
#[async_trait]
pub trait StateSource: Send + Sync {
    /// List a 1-based page of environments. An empty map means no more pages.
    async fn list_environments(&self, page: u32) -> Result<EnvironmentPage>;

    /// Latest version of the given state, or `BackupError::NoStateVersions`.
    async fn latest_version(&self, environment: &str, state_id: u64) -> Result<i64>;

    /// Raw state document for one exact version.
    async fn fetch_state(&self, environment: &str, state_id: u64, version: i64) -> Result<Bytes>;
}
