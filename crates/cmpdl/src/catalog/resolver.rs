//! Catalog resolver: identifiers to projects, projects to downloadable files
//!
//! An explicit file ID is resolved through an ordered list of tiers:
//!
//! 1. the file endpoint of the primary API
//! 2. the project's "latest files" summary
//! 3. the project's full file list
//! 4. the community metadata mirror
//!
//! The first tier that yields a record with a download URL wins. A tier that
//! finds nothing hands over to the next one; a tier that fails for any other
//! reason aborts the whole resolution.

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, info_span, Instrument};

use crate::catalog::{
    client::{CatalogApi, CurseClient},
    cache::ResponseCache,
    config::CatalogConfig,
    identifier::ProjectIdentifier,
    models::{FileRecord, ProjectRecord, ResolvedFile},
};
use crate::error::{CmpdlError, Result};

/// A named, not yet started lookup
pub type Tier<'a, T> = (&'static str, BoxFuture<'a, Result<Option<T>>>);

/// Run tiers in order and return the first hit together with the tier's name.
///
/// Tiers are lazy futures, so later tiers issue no requests once an earlier
/// one has produced a result. The first error is returned immediately.
pub async fn first_found<T>(tiers: Vec<Tier<'_, T>>) -> Result<Option<(&'static str, T)>> {
    for (name, lookup) in tiers {
        match lookup.await? {
            Some(found) => return Ok(Some((name, found))),
            None => debug!("Tier '{}' had no result", name),
        }
    }
    Ok(None)
}

/// Keep a record only if it carries a usable download URL
fn downloadable(record: Option<FileRecord>) -> Option<FileRecord> {
    match record {
        Some(file) if file.usable_download_url().is_some() => Some(file),
        Some(file) => {
            debug!("File {} of project {} has no download URL", file.id, file.project_id);
            None
        }
        None => None,
    }
}

/// Resolves identifiers and file IDs against a [`CatalogApi`]
pub struct CatalogResolver<A> {
    api: A,
    search_page_size: u32,
    search_max_index: u32,
}

impl CatalogResolver<CurseClient> {
    /// Resolver backed by the HTTP client with a fresh response cache
    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        let (page_size, max_index) = (config.search_page_size, config.search_max_index);
        let client = CurseClient::new(config, ResponseCache::new())?;
        Ok(Self::new(client).with_search_limits(page_size, max_index))
    }
}

impl<A: CatalogApi> CatalogResolver<A> {
    pub fn new(api: A) -> Self {
        let defaults = CatalogConfig::default();
        Self {
            api,
            search_page_size: defaults.search_page_size,
            search_max_index: defaults.search_max_index,
        }
    }

    pub fn with_search_limits(mut self, page_size: u32, max_index: u32) -> Self {
        self.search_page_size = page_size.max(1);
        self.search_max_index = max_index;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Resolve an identifier (and optional file ID) to a downloadable file
    pub async fn resolve(&self, identifier: &ProjectIdentifier, file_id: Option<u64>) -> Result<ResolvedFile> {
        let project_id = self.resolve_project_id(identifier).await?;
        let file = match file_id {
            Some(file_id) => self.resolve_file(project_id, file_id).await?,
            None => self.resolve_latest_file(project_id).await?,
        };

        let (project_id, file_id) = (file.project_id, file.id);
        file.into_resolved()
            .ok_or(CmpdlError::FileNotFound { project_id, file_id })
    }

    /// Turn any identifier into a numeric project ID
    pub async fn resolve_project_id(&self, identifier: &ProjectIdentifier) -> Result<u64> {
        let query = match identifier {
            ProjectIdentifier::Id(id) => return Ok(*id),
            other => other.search_query().unwrap_or_default(),
        };

        info!("Searching for project \"{}\"", query);
        match self.find_project(query).await? {
            Some(project) => {
                info!("Found project {} ({})", project.name, project.id);
                Ok(project.id)
            }
            None => Err(CmpdlError::ProjectNotFound {
                identifier: identifier.to_string(),
            }),
        }
    }

    /// Page through the catalog search until a project matches `query`.
    ///
    /// Matches are a case-insensitive prefix of the name or an exact slug.
    pub async fn find_project(&self, query: &str) -> Result<Option<ProjectRecord>> {
        let needle = query.to_lowercase();
        let mut index = 0;

        while index < self.search_max_index {
            let page = self.api.search_projects(query, index, self.search_page_size).await?;
            if page.is_empty() {
                break;
            }
            if let Some(project) = page.into_iter().find(|project| project.matches_query(&needle)) {
                return Ok(Some(project));
            }
            index += self.search_page_size;
        }

        debug!("Search for \"{}\" ended at index {}", query, index);
        Ok(None)
    }

    /// Most recent non-server-pack file of a project, fully re-fetched
    pub async fn resolve_latest_file(&self, project_id: u64) -> Result<FileRecord> {
        let project = self
            .api
            .get_project(project_id)
            .await?
            .ok_or_else(|| CmpdlError::ProjectNotFound {
                identifier: project_id.to_string(),
            })?;

        let latest = project
            .latest_client_file()
            .ok_or(CmpdlError::NoEligibleFiles { project_id })?;
        debug!("Latest file of {} is {} ({})", project.name, latest.id, latest.file_date);

        // The summary record may lack fields, so go through the full lookup.
        let (owner_id, file_id) = (latest.project_id, latest.id);
        self.resolve_file(owner_id, file_id).await
    }

    /// Resolve a specific file through the fallback tiers
    pub async fn resolve_file(&self, project_id: u64, file_id: u64) -> Result<FileRecord> {
        let api = &self.api;
        let tiers: Vec<Tier<'_, FileRecord>> = vec![
            (
                "file endpoint",
                async move { Ok::<_, CmpdlError>(downloadable(api.get_file(project_id, file_id).await?)) }.boxed(),
            ),
            (
                "latest files",
                async move {
                    let project = api.get_project(project_id).await?;
                    Ok::<_, CmpdlError>(downloadable(
                        project.and_then(|project| project.find_latest_file(file_id).cloned()),
                    ))
                }
                .boxed(),
            ),
            (
                "project files",
                async move {
                    let files = api.get_project_files(project_id).await?.unwrap_or_default();
                    Ok::<_, CmpdlError>(downloadable(files.into_iter().find(|file| file.id == file_id)))
                }
                .boxed(),
            ),
            (
                "mirror",
                async move {
                    let cached = api.get_mirror_file(project_id, file_id).await?;
                    Ok::<_, CmpdlError>(downloadable(
                        cached.map(|entry| entry.into_file_record(project_id, file_id)),
                    ))
                }
                .boxed(),
            ),
        ];

        match first_found(tiers)
            .instrument(info_span!("resolve_file", project_id, file_id))
            .await?
        {
            Some((tier, file)) => {
                debug!("Resolved file {} of project {} via {}", file_id, project_id, tier);
                Ok(file)
            }
            None => Err(CmpdlError::FileNotFound { project_id, file_id }),
        }
    }
}
