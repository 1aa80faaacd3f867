//! Manifest-driven batch planning and execution
//!
//! Planning resolves every manifest entry concurrently; execution then walks
//! the resulting tasks strictly in order, one transfer at a time.

use futures::future::try_join_all;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::catalog::{CatalogApi, CatalogResolver};
use crate::downloader::{
    DownloadResult, FileDownloader,
    progress::{ProgressCallback, ProgressEvent, batch_label},
};
use crate::error::{CmpdlError, FileOperation, Result};
use crate::modpack::{Manifest, sanitize_file_name};

/// A resolved, ready-to-run download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Destination file name, already sanitised
    pub file_name: String,
    pub download_url: String,
}

/// Resolve every manifest entry to a download task.
///
/// All entries are resolved concurrently; the returned tasks keep manifest
/// order. The first entry that fails to resolve fails the whole plan.
pub async fn plan<A: CatalogApi>(resolver: &CatalogResolver<A>, manifest: &Manifest) -> Result<Vec<DownloadTask>> {
    info!("Generating file list for {} mods", manifest.files.len());

    let lookups = manifest.files.iter().map(|entry| async move {
        let file = resolver.resolve_file(entry.project_id, entry.file_id).await?;
        let download_url = file
            .usable_download_url()
            .ok_or(CmpdlError::FileNotFound {
                project_id: entry.project_id,
                file_id: entry.file_id,
            })?
            .to_string();

        Ok::<_, CmpdlError>(DownloadTask {
            file_name: sanitize_file_name(&file.file_name),
            download_url,
        })
    });

    try_join_all(lookups).await
}

/// Size of a non-empty file already sitting at `path`
async fn existing_size(path: &Path) -> Result<Option<u64>> {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => Ok(Some(metadata.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CmpdlError::fs(path, FileOperation::Metadata, e)),
    }
}

/// Download tasks one after another into `dest_dir`.
///
/// A task whose destination already holds a non-empty file is skipped without
/// touching the network. Stops at the first failed transfer.
pub async fn execute<D: FileDownloader + ?Sized>(
    downloader: &D,
    tasks: &[DownloadTask],
    dest_dir: &Path,
    progress_callback: Option<ProgressCallback>,
) -> Result<Vec<DownloadResult>> {
    let total = tasks.len();
    let mut results = Vec::with_capacity(total);

    for (index, task) in tasks.iter().enumerate() {
        let label = batch_label(index + 1, total);
        let dest_path = dest_dir.join(&task.file_name);

        if let Some(size) = existing_size(&dest_path).await? {
            debug!("Skipping {}, already downloaded", task.file_name);
            if let Some(ref callback) = progress_callback {
                callback(ProgressEvent::AlreadyDownloaded {
                    label,
                    file: task.file_name.clone(),
                    size,
                });
            }
            results.push(DownloadResult::AlreadyExists { size });
            continue;
        }

        let size = downloader
            .download(&task.download_url, &dest_path, &label, progress_callback.clone())
            .await?;
        results.push(DownloadResult::Downloaded { size });
    }

    Ok(results)
}
