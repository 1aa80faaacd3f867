//! Streaming file downloader and manifest-driven batch execution
//!
//! This module provides:
//! - A streaming HTTP downloader that commits files atomically
//! - Progress events decoupled from terminal rendering
//! - Planning and sequential execution of manifest download batches

pub mod batch;
pub mod config;
pub mod http;
pub mod progress;

pub use batch::{DownloadTask, execute, plan};
pub use config::DownloadConfig;
pub use http::{HttpDownloader, TransferState};
pub use progress::{
    ConsoleProgressReporter, IntoProgressCallback, NullProgressReporter, ProgressCallback, ProgressEvent,
    ProgressReporter, batch_label, batch_label_width, fit_file_name,
};

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Result of a download operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadResult {
    Downloaded { size: u64 },
    /// A non-empty file was already present, nothing was fetched
    AlreadyExists { size: u64 },
}

impl DownloadResult {
    pub fn size(&self) -> u64 {
        match self {
            DownloadResult::Downloaded { size } | DownloadResult::AlreadyExists { size } => *size,
        }
    }
}

/// Something that can fetch a URL to a path
#[async_trait]
pub trait FileDownloader: Send + Sync {
    /// Download `url` to `dest_path`, returning the number of bytes written.
    ///
    /// `label` is a fixed-width prefix passed through to progress events.
    async fn download(
        &self,
        url: &str,
        dest_path: &Path,
        label: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64>;
}

/// `dest_path` with `suffix` appended to its file name
pub fn temp_path_for(dest_path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = dest_path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
