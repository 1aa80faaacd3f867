//! CurseForge modpack `manifest.json`

use serde::Deserialize;
use std::path::Path;
use tokio::fs;

use crate::error::{CmpdlError, FileOperation, Result};

/// Name of the manifest inside a modpack archive
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub minecraft: MinecraftInfo,
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    /// Directory next to the manifest whose contents go into the game folder
    #[serde(default)]
    pub overrides: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftInfo {
    pub version: String,
    #[serde(default)]
    pub mod_loaders: Vec<ModLoader>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// One mod of the pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ManifestFile {
    #[serde(rename = "projectID")]
    pub project_id: u64,
    #[serde(rename = "fileID")]
    pub file_id: u64,
}

impl Manifest {
    pub fn from_json(json: &str, origin: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| CmpdlError::InvalidJson {
            origin: origin.to_string(),
            source,
        })
    }

    /// Read and parse a manifest from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CmpdlError::MissingManifest {
                    path: path.parent().unwrap_or(path).to_path_buf(),
                }
            } else {
                CmpdlError::fs(path, FileOperation::Read, e)
            }
        })?;
        Self::from_json(&raw, &path.display().to_string())
    }

    pub fn mod_loader_ids(&self) -> impl Iterator<Item = &str> {
        self.minecraft.mod_loaders.iter().map(|loader| loader.id.as_str())
    }
}
