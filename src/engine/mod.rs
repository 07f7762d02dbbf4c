// Backup engine: driver loop, per-environment download, run statistics.

pub mod downloader;
pub mod driver;
pub mod stats;
