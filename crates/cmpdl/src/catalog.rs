//! CurseForge catalog access
//!
//! Turns loose project identifiers into projects, and project/file pairs into
//! records with a usable download URL.

pub mod cache;
pub mod client;
pub mod config;
pub mod identifier;
pub mod models;
pub mod resolver;

pub use cache::{CachedResponse, ResponseCache};
pub use client::{CatalogApi, CurseClient};
pub use config::CatalogConfig;
pub use identifier::ProjectIdentifier;
pub use models::{FileRecord, MirrorFileRecord, ProjectRecord, ResolvedFile};
pub use resolver::{first_found, CatalogResolver, Tier};
