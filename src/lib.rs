// Atlas state backup: pages through an organization's environments and saves each latest state.

pub mod config;
pub mod engine;
pub mod error;
pub mod source;

pub use config::BackupConfig;
pub use engine::driver::BackupDriver;
pub use engine::stats::{BackupSummary, RunOutcome};
pub use error::{BackupError, Result};
