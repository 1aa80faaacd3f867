//! Classification of the loose project identifiers users type

use std::fmt;

/// What the user handed us to name a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectIdentifier {
    Id(u64),
    /// Project part of a catalog URL, with any `files/<id>` suffix dropped
    Slug(String),
    Title(String),
}

impl ProjectIdentifier {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Ok(id) = input.parse::<u64>() {
            return ProjectIdentifier::Id(id);
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            if let Some(slug) = url::Url::parse(input).ok().and_then(|url| slug_from_url(&url)) {
                return ProjectIdentifier::Slug(slug);
            }
        }

        ProjectIdentifier::Title(input.to_string())
    }

    /// Text used for the catalog search, if this identifier needs one
    pub fn search_query(&self) -> Option<&str> {
        match self {
            ProjectIdentifier::Id(_) => None,
            ProjectIdentifier::Slug(query) | ProjectIdentifier::Title(query) => Some(query),
        }
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectIdentifier::Id(id) => write!(f, "{}", id),
            ProjectIdentifier::Slug(slug) => write!(f, "{}", slug),
            ProjectIdentifier::Title(title) => write!(f, "{}", title),
        }
    }
}

/// Project categories that precede the slug in catalog URLs
const CATEGORY_SEGMENTS: &[&str] = &["modpacks", "mc-mods", "texture-packs", "worlds", "customization", "shaders"];

/// Segments that start the per-file part of a project URL
const FILE_SEGMENTS: &[&str] = &["files", "download"];

/// Slug of a project URL such as `/minecraft/modpacks/<slug>/files/<id>`
fn slug_from_url(url: &url::Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|segment| !segment.is_empty()).collect();

    if let Some(position) = segments.iter().position(|segment| CATEGORY_SEGMENTS.contains(segment)) {
        if let Some(slug) = segments.get(position + 1) {
            return Some(slug.to_string());
        }
    }

    let end = segments
        .iter()
        .position(|segment| FILE_SEGMENTS.contains(segment))
        .unwrap_or(segments.len());
    segments[..end].last().map(|slug| slug.to_string())
}
