//! End-to-end modpack installation
//!
//! Resolves the pack, downloads and unpacks its archive, fetches every mod
//! listed in the manifest into `.minecraft/mods` and finally merges the
//! pack's overrides into `.minecraft`.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, info_span, Instrument};

use crate::catalog::{CatalogApi, CatalogResolver, ProjectIdentifier};
use crate::downloader::{self, DownloadResult, FileDownloader, ProgressCallback};
use crate::error::{CmpdlError, FileOperation, Result};
use crate::modpack::{
    Manifest, extract_archive, manifest::MANIFEST_FILE_NAME, merge_overrides, overrides_dir, sanitize_file_name,
};

/// Folder the pack archive is unpacked into
pub const EXTRACTED_DIR: &str = "extracted";

/// Folder that ends up holding the ready-to-copy game directory
pub const MINECRAFT_DIR: &str = ".minecraft";

/// Outcome of a finished installation
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub manifest: Manifest,
    /// The prepared `.minecraft` folder
    pub minecraft_dir: PathBuf,
    pub downloaded: usize,
    /// Mods that were already on disk
    pub skipped: usize,
}

/// Drives a full install into `<output_dir>/<pack version>/`
pub struct ModpackInstaller<A, D> {
    resolver: CatalogResolver<A>,
    downloader: D,
    output_dir: PathBuf,
    progress_callback: Option<ProgressCallback>,
}

impl<A: CatalogApi, D: FileDownloader> ModpackInstaller<A, D> {
    pub fn new(resolver: CatalogResolver<A>, downloader: D, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            downloader,
            output_dir: output_dir.into(),
            progress_callback: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn resolver(&self) -> &CatalogResolver<A> {
        &self.resolver
    }

    /// Install the given project, or one specific file of it
    pub async fn install(&self, identifier: &ProjectIdentifier, file_id: Option<u64>) -> Result<InstallReport> {
        let span = info_span!("install", project = %identifier);
        self.run(identifier, file_id).instrument(span).await
    }

    async fn run(&self, identifier: &ProjectIdentifier, file_id: Option<u64>) -> Result<InstallReport> {
        let pack = self.resolver.resolve(identifier, file_id).await?;
        info!("Resolved modpack {} ({})", pack.version, pack.file_name);

        let pack_dir = self.output_dir.join(sanitize_file_name(&pack.version));
        create_dir(&pack_dir).await?;

        let archive_path = pack_dir.join(sanitize_file_name(&pack.file_name));
        if file_exists(&archive_path).await? {
            debug!("Archive {} already present", archive_path.display());
        } else {
            info!("Downloading project main file: {}", pack.version);
            self.downloader
                .download(&pack.url, &archive_path, "", self.progress_callback.clone())
                .await?;
        }

        let extracted_dir = pack_dir.join(EXTRACTED_DIR);
        let manifest_path = extracted_dir.join(MANIFEST_FILE_NAME);
        if !file_exists(&manifest_path).await? {
            info!("Extracting {}", archive_path.display());
            extract_archive(&archive_path, &extracted_dir).await?;
        }
        if !file_exists(&manifest_path).await? {
            return Err(CmpdlError::MissingManifest { path: extracted_dir });
        }
        let manifest = Manifest::load(&manifest_path).await?;
        let overrides_source = manifest
            .overrides
            .as_deref()
            .map(|overrides| overrides_dir(&extracted_dir, overrides))
            .transpose()?;

        let minecraft_dir = pack_dir.join(MINECRAFT_DIR);
        let mods_dir = minecraft_dir.join("mods");
        create_dir(&mods_dir).await?;

        let tasks = downloader::plan(&self.resolver, &manifest).await?;
        info!("There's {} mods to download", tasks.len());
        let results = downloader::execute(&self.downloader, &tasks, &mods_dir, self.progress_callback.clone()).await?;

        let skipped = results
            .iter()
            .filter(|result| matches!(result, DownloadResult::AlreadyExists { .. }))
            .count();
        info!("Finished downloading, {} skipped", skipped);

        if let Some(source) = overrides_source {
            if file_exists(&source).await? {
                let moved = merge_overrides(&source, &minecraft_dir).await?;
                info!("Copied {} overrides", moved);
            } else {
                debug!("Overrides {} already merged", source.display());
            }
        }

        Ok(InstallReport {
            downloaded: results.len() - skipped,
            skipped,
            minecraft_dir,
            manifest,
        })
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| CmpdlError::fs(path, FileOperation::CreateDir, e))
}

async fn file_exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| CmpdlError::fs(path, FileOperation::Metadata, e))
}
