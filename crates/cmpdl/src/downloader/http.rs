//! HTTP streaming downloader with atomic commit
//!
//! Bytes are written to `<destination><temp suffix>` and the temp file is
//! renamed onto the destination only once the stream has ended cleanly. A
//! failed transfer leaves the temp file behind and never touches the
//! destination.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info_span, Instrument};

use crate::downloader::{
    FileDownloader, temp_path_for,
    config::DownloadConfig,
    progress::{ProgressCallback, ProgressEvent},
};
use crate::error::{CmpdlError, FileOperation, Result};

/// Book-keeping for one in-flight transfer
#[derive(Debug)]
pub struct TransferState {
    pub temp_path: PathBuf,
    /// Unknown until the server reports a Content-Length
    pub total: Option<u64>,
    pub transferred: u64,
    /// Set when the total first becomes known
    started: Option<Instant>,
}

impl TransferState {
    pub fn new(temp_path: PathBuf) -> Self {
        Self {
            temp_path,
            total: None,
            transferred: 0,
            started: None,
        }
    }

    /// Record the total size; the throughput clock starts on the first call.
    ///
    /// Returns true if this was the first time the total became known.
    pub fn observe_total(&mut self, total: u64) -> bool {
        if self.total.is_some() {
            return false;
        }
        self.total = Some(total);
        self.started = Some(Instant::now());
        true
    }

    pub fn record_chunk(&mut self, len: u64) {
        self.transferred += len;
    }

    /// Bytes per second since the total became known
    pub fn speed_bps(&self) -> f64 {
        self.speed_at(Instant::now())
    }

    pub(crate) fn speed_at(&self, now: Instant) -> f64 {
        let Some(started) = self.started else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        if elapsed <= 0.0 {
            0.0
        } else {
            self.transferred as f64 / elapsed
        }
    }
}

/// HTTP-based file downloader
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

impl HttpDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| CmpdlError::http("<client>", e))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    async fn remove_stale_temp(temp_path: &Path) -> Result<()> {
        match fs::remove_file(temp_path).await {
            Ok(()) => {
                debug!("Removed stale temp file {}", temp_path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CmpdlError::fs(temp_path, FileOperation::Delete, e)),
        }
    }

    /// Stream the response body into the temp file and commit it
    async fn transfer(
        &self,
        url: &str,
        dest_path: &Path,
        state: &mut TransferState,
        emit: &(dyn Fn(u64, u64, f64) + Sync),
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CmpdlError::http(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CmpdlError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        if let Some(total) = response.content_length() {
            state.observe_total(total);
        }
        debug!("Content length: {:?}", state.total);

        let mut file = fs::File::create(&state.temp_path)
            .await
            .map_err(|e| CmpdlError::fs(&state.temp_path, FileOperation::Create, e))?;

        let mut stream = response.bytes_stream();
        let mut last_report: Option<Instant> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CmpdlError::http(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| CmpdlError::fs(&state.temp_path, FileOperation::Write, e))?;
            state.record_chunk(chunk.len() as u64);

            if let Some(total) = state.total {
                let now = Instant::now();
                let due = last_report
                    .map_or(true, |last| now.duration_since(last) >= self.config.progress_interval);
                if due {
                    emit(state.transferred, total, state.speed_at(now));
                    last_report = Some(now);
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| CmpdlError::fs(&state.temp_path, FileOperation::Write, e))?;
        drop(file);

        fs::rename(&state.temp_path, dest_path)
            .await
            .map_err(|e| CmpdlError::fs(dest_path, FileOperation::Move, e))?;
        debug!("Atomically renamed {} to {}", state.temp_path.display(), dest_path.display());

        Ok(state.transferred)
    }
}

#[async_trait]
impl FileDownloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        dest_path: &Path,
        label: &str,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<u64> {
        let file = dest_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        async move {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CmpdlError::fs(parent, FileOperation::CreateDir, e))?;
            }

            let temp_path = temp_path_for(dest_path, &self.config.temp_suffix);
            Self::remove_stale_temp(&temp_path).await?;

            let notify = |event: ProgressEvent| {
                if let Some(ref callback) = progress_callback {
                    callback(event);
                }
            };
            notify(ProgressEvent::DownloadStarted {
                label: label.to_string(),
                file: file.clone(),
                url: url.to_string(),
            });

            let emit = |downloaded: u64, total: u64, speed_bps: f64| {
                notify(ProgressEvent::DownloadProgress {
                    label: label.to_string(),
                    file: file.clone(),
                    downloaded,
                    total,
                    speed_bps,
                });
            };

            let mut state = TransferState::new(temp_path);
            match self.transfer(url, dest_path, &mut state, &emit).await {
                Ok(size) => {
                    debug!("Download completed: {} bytes", size);
                    notify(ProgressEvent::DownloadComplete {
                        label: label.to_string(),
                        file: file.clone(),
                        final_size: size,
                    });
                    Ok(size)
                }
                Err(e) => {
                    debug!("Download failed after {} bytes: {}", state.transferred, e);
                    notify(ProgressEvent::Error {
                        label: label.to_string(),
                        file: file.clone(),
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        }
        .instrument(info_span!("http_download", url = %url))
        .await
    }
}
