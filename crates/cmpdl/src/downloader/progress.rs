//! Progress tracking and reporting for download operations
//!
//! The downloader only emits [`ProgressEvent`]s; turning them into terminal
//! output is the job of a [`ProgressReporter`].

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};

/// Progress callback for download operations
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during download operations
///
/// `label` is the caller's positional prefix such as `"(3/12) "`, `file` the
/// destination file name.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    DownloadStarted {
        label: String,
        file: String,
        url: String,
    },
    /// Only emitted once the total size is known
    DownloadProgress {
        label: String,
        file: String,
        downloaded: u64,
        total: u64,
        speed_bps: f64,
    },
    DownloadComplete {
        label: String,
        file: String,
        final_size: u64,
    },
    AlreadyDownloaded {
        label: String,
        file: String,
        size: u64,
    },
    Error {
        label: String,
        file: String,
        error: String,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_download_started(&self, _label: &str, _file: &str, _url: &str) {}
    fn on_download_progress(&self, _label: &str, _file: &str, _downloaded: u64, _total: u64, _speed_bps: f64) {}
    fn on_download_complete(&self, _label: &str, _file: &str, _final_size: u64) {}
    fn on_already_downloaded(&self, _label: &str, _file: &str, _size: u64) {}
    fn on_error(&self, _label: &str, _file: &str, _error: &str) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::DownloadStarted { label, file, url } => {
                self.on_download_started(&label, &file, &url);
            }
            ProgressEvent::DownloadProgress { label, file, downloaded, total, speed_bps } => {
                self.on_download_progress(&label, &file, downloaded, total, speed_bps);
            }
            ProgressEvent::DownloadComplete { label, file, final_size } => {
                self.on_download_complete(&label, &file, final_size);
            }
            ProgressEvent::AlreadyDownloaded { label, file, size } => {
                self.on_already_downloaded(&label, &file, size);
            }
            ProgressEvent::Error { label, file, error } => {
                self.on_error(&label, &file, &error);
            }
        })
    }
}

/// Fit a file name into exactly `width` columns.
///
/// Long names keep their head and their last 7 characters around `...`,
/// short ones are padded with spaces.
pub fn fit_file_name(name: &str, width: usize) -> String {
    const TAIL: usize = 7;
    let chars: Vec<char> = name.chars().collect();

    let fitted: String = if chars.len() > width {
        let tail = TAIL.min(width);
        let head = width.saturating_sub(3 + tail);
        let mut short: String = chars[..head].iter().collect();
        short.push_str(&"..."[..width.saturating_sub(head + tail).min(3)]);
        short.extend(&chars[chars.len() - tail..]);
        short
    } else {
        name.to_string()
    };

    format!("{:<width$}", fitted, width = width)
}

/// Width of the widest positional label of a batch, `"(total/total) "`
pub fn batch_label_width(total: usize) -> usize {
    format!("({}/{}) ", total, total).len()
}

/// Positional label for item `index` (1-based), padded to the batch width
pub fn batch_label(index: usize, total: usize) -> String {
    let label = format!("({}/{}) ", index, total);
    format!("{:<width$}", label, width = batch_label_width(total))
}

fn kilobytes(bytes: u64) -> u64 {
    bytes / 1024
}

/// Transfer details shown after the bar: sizes, throughput and ETA
pub fn format_transfer(downloaded: u64, total: u64, speed_bps: f64) -> String {
    let eta_secs = if speed_bps > 0.0 {
        (total.saturating_sub(downloaded) as f64 / speed_bps).ceil() as u64
    } else {
        0
    };
    format!(
        "{}KB/{}KB ({} KB/s) {}s",
        kilobytes(downloaded),
        kilobytes(total),
        (speed_bps / 1024.0).floor() as u64,
        eta_secs
    )
}

/// Console reporter drawing one progress bar per transfer
///
/// The bar is created lazily on the first sized progress event, so servers
/// that never send a Content-Length only get a bar at completion.
pub struct ConsoleProgressReporter {
    label_width: usize,
    active: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgressReporter {
    pub fn new(label_width: usize) -> Self {
        Self {
            label_width,
            active: Mutex::new(None),
        }
    }

    fn create_bar(&self, label: &str, file: &str, length: u64) -> ProgressBar {
        let bar = ProgressBar::new(length.max(1));
        let style = ProgressStyle::with_template("{prefix}[{bar:40}] {percent}% | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#-");
        bar.set_style(style);
        bar.set_prefix(format!("{}{} ", label, fit_file_name(file, self.label_width)));
        bar
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new(40)
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_download_progress(&self, label: &str, file: &str, downloaded: u64, total: u64, speed_bps: f64) {
        let mut slot = self.slot();
        let bar = slot.get_or_insert_with(|| self.create_bar(label, file, kilobytes(total)));
        bar.set_position(kilobytes(downloaded));
        bar.set_message(format_transfer(downloaded, total, speed_bps));
    }

    fn on_download_complete(&self, label: &str, file: &str, final_size: u64) {
        let bar = self.slot().take().unwrap_or_else(|| self.create_bar(label, file, 1));
        bar.set_position(bar.length().unwrap_or(1));
        bar.finish_with_message(format!("{}KB done", kilobytes(final_size)));
    }

    fn on_already_downloaded(&self, label: &str, file: &str, _size: u64) {
        println!("{}{} Already downloaded!", label, fit_file_name(file, self.label_width));
    }

    fn on_error(&self, _label: &str, _file: &str, _error: &str) {
        if let Some(bar) = self.slot().take() {
            bar.abandon();
        }
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}
