//! CurseForge modpack downloader
//!
//! This library turns a loose project reference (numeric ID, project URL or
//! title) into a ready-to-copy `.minecraft` folder. It resolves files through
//! several catalog sources, streams every download to a temp file before
//! committing it, and reports progress through plain events.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cmpdl::{
//!     CatalogConfig, CatalogResolver, ConsoleProgressReporter, DownloadConfig,
//!     HttpDownloader, IntoProgressCallback, ModpackInstaller, ProjectIdentifier,
//! };
//!
//! # async fn example() -> cmpdl::Result<()> {
//! let config = CatalogConfig::load(std::path::Path::new("."))?;
//! let resolver = CatalogResolver::from_config(config)?;
//! let downloader = HttpDownloader::new(DownloadConfig::default())?;
//!
//! let installer = ModpackInstaller::new(resolver, downloader, "./modpacks")
//!     .with_progress(ConsoleProgressReporter::default().into_callback());
//!
//! let report = installer.install(&ProjectIdentifier::parse("Better MC"), None).await?;
//! println!("Minecraft {}", report.manifest.minecraft.version);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod downloader;
pub mod error;
pub mod install;
pub mod modpack;

// Re-export commonly used types for convenience
pub use catalog::{CatalogApi, CatalogConfig, CatalogResolver, CurseClient, ProjectIdentifier, ResolvedFile};
pub use downloader::{
    ConsoleProgressReporter, DownloadConfig, DownloadResult, FileDownloader, HttpDownloader, IntoProgressCallback,
    ProgressCallback, ProgressEvent,
};
pub use error::{CmpdlError, FileOperation, Result};
pub use install::{InstallReport, ModpackInstaller};
pub use modpack::Manifest;

#[cfg(test)]
mod tests;
