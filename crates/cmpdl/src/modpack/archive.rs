//! Modpack archive extraction

use std::path::Path;
use tracing::{debug, warn};

use crate::error::{CmpdlError, FileOperation, Result};

/// Extract every entry of a zip archive below `dest_dir`.
///
/// Entries whose names would escape `dest_dir` are skipped. Returns the number
/// of files written. The zip reader is synchronous, so the work runs on the
/// blocking thread pool.
pub async fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let archive_path = archive_path.to_owned();
    let dest_dir = dest_dir.to_owned();

    tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &dest_dir))
        .await
        .map_err(|e| CmpdlError::BackgroundTask {
            reason: format!("archive extraction: {}", e),
        })?
}

fn extract_blocking(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive_path)
        .map_err(|e| CmpdlError::fs(archive_path, FileOperation::Read, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| CmpdlError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| CmpdlError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|e| CmpdlError::fs(&out_path, FileOperation::CreateDir, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CmpdlError::fs(parent, FileOperation::CreateDir, e))?;
        }
        let mut out_file = std::fs::File::create(&out_path)
            .map_err(|e| CmpdlError::fs(&out_path, FileOperation::Create, e))?;
        std::io::copy(&mut entry, &mut out_file).map_err(|e| CmpdlError::fs(&out_path, FileOperation::Write, e))?;
        written += 1;
    }

    debug!("Extracted {} files from {}", written, archive_path.display());
    Ok(written)
}
