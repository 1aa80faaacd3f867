//! Configuration types for the downloader

use std::time::Duration;

/// Configuration for download operations
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub user_agent: String,
    /// Appended to the destination path while a transfer is in flight
    pub temp_suffix: String,
    /// Width the file name column is padded or truncated to
    pub label_width: usize,
    /// Minimum spacing between two progress events of one transfer
    pub progress_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("cmpdl/", env!("CARGO_PKG_VERSION")).to_string(),
            temp_suffix: ".downloading".to_string(),
            label_width: 40,
            progress_interval: Duration::from_millis(100),
        }
    }
}
