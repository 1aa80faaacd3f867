//! Catalog records as returned by the CurseForge API and its community mirror

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Every v1 endpoint wraps its payload in `{ "data": ... }`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope<T> {
    pub data: T,
}

/// A hosted mod or modpack
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Summary records; fields such as `downloadUrl` may be incomplete
    #[serde(default)]
    pub latest_files: Vec<FileRecord>,
}

impl ProjectRecord {
    /// Whether this project answers a title or slug query.
    ///
    /// `query` must already be lower-cased.
    pub fn matches_query(&self, query: &str) -> bool {
        self.name.to_lowercase().starts_with(query) || self.slug.eq_ignore_ascii_case(query)
    }

    /// Newest file that is not a server pack.
    ///
    /// Ties on the release date keep the first file in catalog order.
    pub fn latest_client_file(&self) -> Option<&FileRecord> {
        self.latest_files
            .iter()
            .filter(|file| !file.is_server_pack)
            .fold(None, |best: Option<&FileRecord>, file| match best {
                Some(current) if file.file_date <= current.file_date => Some(current),
                _ => Some(file),
            })
    }

    pub fn find_latest_file(&self, file_id: u64) -> Option<&FileRecord> {
        self.latest_files.iter().find(|file| file.id == file_id)
    }
}

/// One downloadable artifact of a project
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: u64,
    #[serde(rename = "modId", alias = "projectId")]
    pub project_id: u64,
    pub file_name: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub display_name: String,
    pub file_date: DateTime<Utc>,
    #[serde(default)]
    pub is_server_pack: bool,
    #[serde(default)]
    pub file_status: u32,
}

impl FileRecord {
    /// The download URL, if the catalog actually provided a usable one
    pub fn usable_download_url(&self) -> Option<&str> {
        self.download_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Convert into the caller-facing resolution, if a URL is present
    pub fn into_resolved(self) -> Option<ResolvedFile> {
        let url = self.usable_download_url()?.to_string();
        let version = if self.display_name.is_empty() {
            self.file_name.clone()
        } else {
            self.display_name
        };
        Some(ResolvedFile {
            url,
            version,
            file_name: self.file_name,
        })
    }
}

/// Entry of the community metadata mirror, which uses its own field names
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorFileRecord {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "DownloadURL", default)]
    pub download_url: Option<String>,
}

impl MirrorFileRecord {
    /// Map onto the standard record shape for the given project/file pair
    pub fn into_file_record(self, project_id: u64, file_id: u64) -> FileRecord {
        FileRecord {
            id: file_id,
            project_id,
            display_name: self.file_name.clone(),
            file_name: self.file_name,
            download_url: self.download_url,
            file_date: DateTime::<Utc>::default(),
            is_server_pack: false,
            file_status: 0,
        }
    }
}

/// Result of resolving a project/file query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub url: String,
    /// Display version of the file, used as the modpack folder name
    pub version: String,
    pub file_name: String,
}
