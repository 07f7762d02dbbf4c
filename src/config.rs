use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Root of the Atlas UI API.
pub const DEFAULT_BASE_URL: &str = "https://app.terraform.io/ui";

/// Cookie that carries the browser session token.
pub const SESSION_COOKIE_NAME: &str = "_atlas_session_data";

/// Seconds to wait between listing pages.
pub const DEFAULT_PAGE_DELAY_SECS: u64 = 2;

/// Base backoff between page listing retries; attempt `n` waits `n` times this.
pub const PAGE_RETRY_BACKOFF_MS: u64 = 500;

/// Version number used when an environment has no state versions.
pub const NO_STATE_VERSION: i64 = -1;

/// Body of the file written for environments without any state.
pub const NO_STATE_PLACEHOLDER: &str = "No state found";

/// Run-wide settings, built once at startup and passed to every component.
#[derive(Clone)]
pub struct BackupConfig {
    /// Session token sent as the `_atlas_session_data` cookie.
    pub session_cookie: String,
    /// Directory receiving the downloaded state files.
    pub output_dir: PathBuf,
    /// Organization whose environments are backed up.
    pub organization: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Pause between listing pages.
    pub page_delay: Duration,
    /// Extra attempts for a failed page listing. Zero keeps a failed page fatal.
    pub max_page_retries: u32,
}

impl BackupConfig {
    pub fn new(
        session_cookie: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        organization: impl Into<String>,
    ) -> Self {
        Self {
            session_cookie: session_cookie.into(),
            output_dir: output_dir.into(),
            organization: organization.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_delay: Duration::from_secs(DEFAULT_PAGE_DELAY_SECS),
            max_page_retries: 0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_max_page_retries(mut self, retries: u32) -> Self {
        self.max_page_retries = retries;
        self
    }

    /// Value for the `Cookie` header.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE_NAME, self.session_cookie)
    }
}

impl fmt::Debug for BackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupConfig")
            .field("session_cookie", &"<redacted>")
            .field("output_dir", &self.output_dir)
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .field("page_delay", &self.page_delay)
            .field("max_page_retries", &self.max_page_retries)
            .finish()
    }
}
