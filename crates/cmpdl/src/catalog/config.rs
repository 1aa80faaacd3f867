//! Catalog client configuration and API key loading

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CmpdlError, FileOperation, Result};

/// Public CurseForge API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.curseforge.com";

/// Community metadata mirror used as the last resolution tier
pub const DEFAULT_MIRROR_BASE: &str = "https://cursemeta.dries007.net";

/// Environment variable consulted before the config file
pub const API_KEY_ENV: &str = "CURSEFORGE_API_KEY";

/// Name of the config file written next to the working directory
pub const CONFIG_FILE_NAME: &str = "curse-api-config.json";

const API_KEY_PLACEHOLDER: &str = "{put your api key here}";

/// Configuration for the catalog client and resolver
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub api_base: String,
    pub mirror_base: String,
    pub api_key: String,
    pub user_agent: String,
    /// Minecraft on CurseForge
    pub game_id: u32,
    /// The "Modpacks" class
    pub modpack_class_id: u32,
    pub search_page_size: u32,
    /// Search stops once the page index reaches this bound
    pub search_max_index: u32,
}

impl CatalogConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Point both the API and the mirror somewhere else (tests, proxies)
    pub fn with_endpoints(mut self, api_base: impl Into<String>, mirror_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.mirror_base = mirror_base.into();
        self
    }

    /// Load configuration, taking the API key from the environment or the config file.
    ///
    /// A `.env` file is honoured. When neither source has a key, a template
    /// config file is written (if absent) and a configuration error asks the
    /// user to fill it in.
    pub fn load(config_dir: &Path) -> Result<Self> {
        dotenv::dotenv().ok();

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!("Using API key from {}", API_KEY_ENV);
                return Ok(Self::new(key.trim()));
            }
        }

        let path = config_dir.join(CONFIG_FILE_NAME);
        let file = ApiKeyFile::read_or_create(&path)?;
        if file.api_key.trim().is_empty() || file.api_key == API_KEY_PLACEHOLDER {
            return Err(CmpdlError::Configuration {
                message: format!("Set the apiKey in \"{}\"", path.display()),
                field: Some("apiKey".to_string()),
                suggestion: Some(format!(
                    "Put your CurseForge API key in {} or set {}",
                    path.display(),
                    API_KEY_ENV
                )),
            });
        }

        debug!("Using API key from {}", path.display());
        Ok(Self::new(file.api_key))
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            mirror_base: DEFAULT_MIRROR_BASE.to_string(),
            api_key: String::new(),
            user_agent: concat!("cmpdl/", env!("CARGO_PKG_VERSION")).to_string(),
            game_id: 432,
            modpack_class_id: 4471,
            search_page_size: 20,
            search_max_index: 10_000,
        }
    }
}

/// On-disk shape of `curse-api-config.json`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyFile {
    api_key: String,
}

impl ApiKeyFile {
    fn read_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Writing config template to {}", path.display());
            let template = ApiKeyFile {
                api_key: API_KEY_PLACEHOLDER.to_string(),
            };
            let json = serde_json::to_string_pretty(&template).map_err(|source| CmpdlError::InvalidJson {
                origin: path.display().to_string(),
                source,
            })?;
            std::fs::write(path, json).map_err(|e| CmpdlError::fs(path, FileOperation::Write, e))?;
        }

        let raw = std::fs::read_to_string(path).map_err(|e| CmpdlError::fs(path, FileOperation::Read, e))?;
        serde_json::from_str(&raw).map_err(|source| CmpdlError::InvalidJson {
            origin: path.display().to_string(),
            source,
        })
    }
}
