use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::COOKIE;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::traits::{EnvironmentPage, StateSource};
use super::types::{EnvironmentsResponse, StateVersionsResponse};
use crate::config::BackupConfig;
use crate::error::{BackupError, Result};

/// `StateSource` backed by the Atlas UI API, authenticated with the browser session cookie.
pub struct HttpStateSource {
    client: Client,
    base_url: Url,
    organization: String,
    cookie: String,
}

impl HttpStateSource {
    pub fn new(config: &BackupConfig) -> Result<Self> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &BackupConfig) -> Result<Self> {
        let invalid = |reason: String| BackupError::InvalidUrl {
            url: config.base_url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("cannot carry path segments".to_string()));
        }

        Ok(Self {
            client,
            base_url,
            organization: config.organization.clone(),
            cookie: config.cookie_header(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint<I>(&self, segments: I) -> Url
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        // `new` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn state_versions_url(&self, environment: &str, state_id: u64) -> Url {
        let state_id = state_id.to_string();
        self.endpoint([
            self.organization.as_str(),
            "environments",
            environment,
            "states",
            state_id.as_str(),
            "state-versions",
        ])
    }

    /// GET with the session cookie; non-success statuses become errors.
    async fn get(&self, url: Url) -> Result<Bytes> {
        let url_str = url.to_string();
        let resp = self
            .client
            .get(url)
            .header(COOKIE, &self.cookie)
            .send()
            .await
            .map_err(|source| BackupError::Transport {
                url: url_str.clone(),
                source,
            })?;

        let status = resp.status();
        debug!("GET {} status={}", url_str, status.as_u16());
        if status.as_u16() == 401 || status.as_u16() == 403 {
            warn!("session rejected status={} url={}", status.as_u16(), url_str);
            return Err(BackupError::AuthRejected {
                status: status.as_u16(),
                url: url_str,
            });
        }
        if !status.is_success() {
            warn!("request failed status={} url={}", status.as_u16(), url_str);
            return Err(BackupError::HttpStatus {
                status: status.as_u16(),
                url: url_str,
            });
        }

        resp.bytes()
            .await
            .map_err(|source| BackupError::Transport { url: url_str, source })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let url_str = url.to_string();
        let body = self.get(url).await?;
        serde_json::from_slice(&body).map_err(|source| BackupError::Decode {
            url: url_str,
            source,
        })
    }
}

#[async_trait]
impl StateSource for HttpStateSource {
    async fn list_environments(&self, page: u32) -> Result<EnvironmentPage> {
        let mut url = self.endpoint(["environments"]);
        url.query_pairs_mut()
            .append_pair("enterprise_tool", "terraform")
            .append_pair("page", &page.to_string())
            .append_pair("username", &self.organization);

        let resp: EnvironmentsResponse = self.get_json(url).await?;
        Ok(resp.into_page())
    }

    async fn latest_version(&self, environment: &str, state_id: u64) -> Result<i64> {
        let mut url = self.state_versions_url(environment, state_id);
        url.query_pairs_mut().append_pair("page", "1");

        let resp: StateVersionsResponse = self.get_json(url).await?;
        resp.latest().ok_or_else(|| BackupError::NoStateVersions {
            environment: environment.to_string(),
        })
    }

    async fn fetch_state(&self, environment: &str, state_id: u64, version: i64) -> Result<Bytes> {
        let mut url = self.state_versions_url(environment, state_id);
        if let Ok(mut path) = url.path_segments_mut() {
            path.push(&version.to_string()).push("raw");
        }
        self.get(url).await
    }
}
