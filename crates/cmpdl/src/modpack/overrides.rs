//! Merging a modpack's override directory into the game folder

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{CmpdlError, FileOperation, Result};

/// Locate the manifest's overrides directory below `extracted_dir`.
///
/// Only relative paths made of plain components are accepted.
pub fn overrides_dir(extracted_dir: &Path, overrides: &str) -> Result<PathBuf> {
    let relative = Path::new(overrides);
    let plain = relative
        .components()
        .any(|component| matches!(component, Component::Normal(_)))
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

    if !plain {
        return Err(CmpdlError::InvalidManifest {
            reason: format!("overrides path \"{}\" must stay inside the archive", overrides),
        });
    }
    Ok(extracted_dir.join(relative))
}

/// Move the contents of `source_dir` into `dest_dir`, then remove `source_dir`.
///
/// Files replace whatever sits at the destination. A directory that already
/// exists at the destination is merged into recursively, so its other files
/// are kept. Returns the number of entries moved.
pub async fn merge_overrides(source_dir: &Path, dest_dir: &Path) -> Result<usize> {
    let mut pending = vec![(source_dir.to_path_buf(), dest_dir.to_path_buf())];
    let mut drained = Vec::new();
    let mut moved = 0;

    while let Some((source, dest)) = pending.pop() {
        fs::create_dir_all(&dest)
            .await
            .map_err(|e| CmpdlError::fs(&dest, FileOperation::CreateDir, e))?;

        for path in list_entries(&source).await? {
            let Some(name) = path.file_name() else { continue };
            let target = dest.join(name);

            if is_dir(&path).await? && is_dir(&target).await? {
                pending.push((path, target));
                continue;
            }

            remove_existing(&target).await?;
            fs::rename(&path, &target)
                .await
                .map_err(|e| CmpdlError::fs(&path, FileOperation::Move, e))?;
            debug!("Moved override {} to {}", path.display(), target.display());
            moved += 1;
        }
        drained.push(source);
    }

    // Children were drained after their parents, so remove in reverse.
    for dir in drained.iter().rev() {
        fs::remove_dir(dir)
            .await
            .map_err(|e| CmpdlError::fs(dir, FileOperation::Delete, e))?;
    }
    Ok(moved)
}

async fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CmpdlError::fs(dir, FileOperation::Read, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CmpdlError::fs(dir, FileOperation::Read, e))?
    {
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Real directory check; symlinks are never followed
async fn is_dir(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CmpdlError::fs(path, FileOperation::Metadata, e)),
    }
}

async fn remove_existing(target: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CmpdlError::fs(target, FileOperation::Metadata, e)),
    };

    let removal = if metadata.is_dir() {
        fs::remove_dir_all(target).await
    } else {
        fs::remove_file(target).await
    };
    removal.map_err(|e| CmpdlError::fs(target, FileOperation::Delete, e))
}
