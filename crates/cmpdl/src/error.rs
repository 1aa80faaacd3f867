//! Error types shared by the catalog resolver, downloader and installer

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline can report.
///
/// Only "not found" answers from a single catalog tier are recoverable, and
/// those never surface as a `CmpdlError`: the resolver turns them into
/// `Ok(None)` and moves on. Anything that reaches the caller stops the run.
#[derive(Error, Debug)]
pub enum CmpdlError {
    /// Transport-level failure (connection refused, broken stream, ...)
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status other than success or 404
    #[error("HTTP request to '{url}' returned {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    FileSystem {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A response or document did not have the expected JSON shape
    #[error("Malformed JSON from '{origin}'")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read modpack archive '{path}'")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
        suggestion: Option<String>,
    },

    #[error("Can't find project \"{identifier}\"")]
    ProjectNotFound { identifier: String },

    #[error("Project {project_id} has no downloadable client files")]
    NoEligibleFiles { project_id: u64 },

    #[error("File {file_id} not found in project {project_id}.")]
    FileNotFound { project_id: u64, file_id: u64 },

    #[error("Invalid project file. manifest.json not found in '{path}'")]
    MissingManifest { path: PathBuf },

    /// The manifest parsed but asks for something that cannot be honoured
    #[error("Invalid modpack manifest: {reason}")]
    InvalidManifest { reason: String },

    /// A blocking helper task panicked or was cancelled
    #[error("Background task failed: {reason}")]
    BackgroundTask { reason: String },
}

/// Types of file operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    Move,
    Metadata,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::Move => write!(f, "moving"),
            FileOperation::Metadata => write!(f, "reading metadata"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

pub type Result<T> = std::result::Result<T, CmpdlError>;

impl CmpdlError {
    /// Wrap an I/O error with the path and operation it came from
    pub fn fs(path: impl Into<PathBuf>, operation: FileOperation, source: std::io::Error) -> Self {
        CmpdlError::FileSystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Wrap a reqwest error with the URL it was fetching
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        CmpdlError::HttpRequest {
            url: url.into(),
            source,
        }
    }

    /// True for the "this thing does not exist" family of failures
    pub fn is_not_found(&self) -> bool {
        match self {
            CmpdlError::HttpStatus { status, .. } => *status == reqwest::StatusCode::NOT_FOUND,
            CmpdlError::ProjectNotFound { .. }
            | CmpdlError::NoEligibleFiles { .. }
            | CmpdlError::FileNotFound { .. }
            | CmpdlError::MissingManifest { .. } => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CmpdlError::HttpRequest { .. } => "http_request",
            CmpdlError::HttpStatus { .. } => "http_status",
            CmpdlError::FileSystem { .. } => "file_system",
            CmpdlError::InvalidUrl { .. } => "invalid_url",
            CmpdlError::InvalidJson { .. } => "invalid_json",
            CmpdlError::Archive { .. } => "archive",
            CmpdlError::Configuration { .. } => "configuration",
            CmpdlError::ProjectNotFound { .. } => "project_not_found",
            CmpdlError::NoEligibleFiles { .. } => "no_eligible_files",
            CmpdlError::FileNotFound { .. } => "file_not_found",
            CmpdlError::MissingManifest { .. } => "missing_manifest",
            CmpdlError::InvalidManifest { .. } => "invalid_manifest",
            CmpdlError::BackgroundTask { .. } => "background_task",
        }
    }

    /// Get user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            CmpdlError::HttpStatus { status, .. }
                if *status == reqwest::StatusCode::FORBIDDEN
                    || *status == reqwest::StatusCode::UNAUTHORIZED =>
            {
                Some("Check that your CurseForge API key is valid")
            }
            CmpdlError::FileSystem { operation: FileOperation::CreateDir, .. } => {
                Some("Make sure that the program has write access to the output folder")
            }
            CmpdlError::Configuration { suggestion, .. } => suggestion.as_deref(),
            CmpdlError::ProjectNotFound { .. } => {
                Some("Try the numeric project ID or the exact project URL")
            }
            _ => None,
        }
    }
}
