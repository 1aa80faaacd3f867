//! CurseForge API client
//!
//! Every lookup answers `Ok(None)` when the endpoint reports 404 so the
//! resolver can fall through to its next tier. Any other non-success status
//! or transport failure is returned as an error and ends the run.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{
    cache::{CachedResponse, ResponseCache},
    config::CatalogConfig,
    models::{ApiEnvelope, FileRecord, MirrorFileRecord, ProjectRecord},
};
use crate::error::{CmpdlError, Result};

/// Data sources the resolver can query
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /v1/mods/{project}`
    async fn get_project(&self, project_id: u64) -> Result<Option<ProjectRecord>>;

    /// `GET /v1/mods/{project}/files/{file}`
    async fn get_file(&self, project_id: u64, file_id: u64) -> Result<Option<FileRecord>>;

    /// `GET /v1/mods/{project}/files`
    async fn get_project_files(&self, project_id: u64) -> Result<Option<Vec<FileRecord>>>;

    /// Community mirror entry for a project/file pair
    async fn get_mirror_file(&self, project_id: u64, file_id: u64) -> Result<Option<MirrorFileRecord>>;

    /// One page of the modpack search
    async fn search_projects(&self, filter: &str, index: u32, page_size: u32) -> Result<Vec<ProjectRecord>>;
}

/// HTTP implementation of [`CatalogApi`] with a per-run response cache
pub struct CurseClient {
    client: Client,
    config: CatalogConfig,
    cache: ResponseCache,
}

impl CurseClient {
    pub fn new(config: CatalogConfig, cache: ResponseCache) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| CmpdlError::http(config.api_base.clone(), e))?;

        Ok(Self { client, config, cache })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn api_url(&self, path: &str, query: &[(&str, String)]) -> Result<url::Url> {
        let raw = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        url::Url::parse_with_params(&raw, query).map_err(|source| CmpdlError::InvalidUrl { url: raw, source })
    }

    /// Fetch a URL, consulting and filling the cache
    async fn fetch(&self, url: url::Url, authenticated: bool) -> Result<Option<Arc<str>>> {
        let key = url.as_str().to_string();
        match self.cache.get(&key) {
            Some(CachedResponse::Body(body)) => return Ok(Some(body)),
            Some(CachedResponse::NotFound) => return Ok(None),
            None => {}
        }

        debug!("GET {}", key);
        let mut request = self.client.get(url);
        if authenticated {
            request = request.header("x-api-key", &self.config.api_key);
        }
        let response = request.send().await.map_err(|e| CmpdlError::http(key.clone(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Not found: {}", key);
            self.cache.insert(key, CachedResponse::NotFound);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CmpdlError::HttpStatus { url: key, status });
        }

        let body: Arc<str> = Arc::from(response.text().await.map_err(|e| CmpdlError::http(key.clone(), e))?);
        self.cache.insert(key, CachedResponse::Body(body.clone()));
        Ok(Some(body))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: url::Url, authenticated: bool) -> Result<Option<T>> {
        let origin = url.to_string();
        match self.fetch(url, authenticated).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|source| CmpdlError::InvalidJson { origin, source }),
            None => Ok(None),
        }
    }

    async fn fetch_data<T: DeserializeOwned>(&self, url: url::Url) -> Result<Option<T>> {
        Ok(self
            .fetch_json::<ApiEnvelope<T>>(url, true)
            .await?
            .map(|envelope| envelope.data))
    }
}

#[async_trait]
impl CatalogApi for CurseClient {
    async fn get_project(&self, project_id: u64) -> Result<Option<ProjectRecord>> {
        let url = self.api_url(&format!("/v1/mods/{}", project_id), &[])?;
        self.fetch_data(url).await
    }

    async fn get_file(&self, project_id: u64, file_id: u64) -> Result<Option<FileRecord>> {
        let url = self.api_url(&format!("/v1/mods/{}/files/{}", project_id, file_id), &[])?;
        self.fetch_data(url).await
    }

    async fn get_project_files(&self, project_id: u64) -> Result<Option<Vec<FileRecord>>> {
        let url = self.api_url(&format!("/v1/mods/{}/files", project_id), &[])?;
        self.fetch_data(url).await
    }

    async fn get_mirror_file(&self, project_id: u64, file_id: u64) -> Result<Option<MirrorFileRecord>> {
        let raw = format!(
            "{}/{}/{}.json",
            self.config.mirror_base.trim_end_matches('/'),
            project_id,
            file_id
        );
        let url = url::Url::parse(&raw).map_err(|source| CmpdlError::InvalidUrl { url: raw, source })?;
        self.fetch_json(url, false).await
    }

    async fn search_projects(&self, filter: &str, index: u32, page_size: u32) -> Result<Vec<ProjectRecord>> {
        let url = self.api_url(
            "/v1/mods/search",
            &[
                ("gameId", self.config.game_id.to_string()),
                ("classId", self.config.modpack_class_id.to_string()),
                ("searchFilter", filter.to_string()),
                ("pageSize", page_size.to_string()),
                ("index", index.to_string()),
                ("sortField", "2".to_string()),
                ("sortOrder", "desc".to_string()),
            ],
        )?;
        Ok(self.fetch_data(url).await?.unwrap_or_default())
    }
}
