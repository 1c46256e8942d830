//! Error types for schema loading, normalization and export.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Coarse reason shown in the error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadErrorKind {
    /// Input text was not well-formed JSON.
    InvalidJson,
    /// The source could not be obtained (network, file system, unknown sample).
    FetchFailed,
    /// Well-formed JSON that cannot be read as a schema.
    ParseFailed,
}

impl LoadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadErrorKind::InvalidJson => "invalid-json",
            LoadErrorKind::FetchFailed => "fetch-failed",
            LoadErrorKind::ParseFailed => "parse-failed",
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors while obtaining a schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    // Source errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("unknown sample \"{name}\"")]
    UnknownSample { name: String },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl LoadError {
    /// Returns the banner tag for this error.
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::InvalidJson { .. } => LoadErrorKind::InvalidJson,
            LoadError::Parse(_) => LoadErrorKind::ParseFailed,
            _ => LoadErrorKind::FetchFailed,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            LoadErrorKind::FetchFailed => 3,
            LoadErrorKind::InvalidJson | LoadErrorKind::ParseFailed => 2,
        }
    }
}

/// Errors while normalizing a document into a schema tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("document is not a schema: expected object, boolean or array, got {actual}")]
    NotASchema { actual: String },

    #[error("invalid subschema at {pointer}: expected object or boolean, got {actual}")]
    InvalidSubschema { pointer: String, actual: String },

    #[error("invalid \"{keyword}\" at {pointer}: expected {expected}, got {actual}")]
    InvalidKeyword {
        pointer: String,
        keyword: String,
        expected: &'static str,
        actual: String,
    },

    #[error("schema nesting at {pointer} exceeds the depth limit of {limit}")]
    TooDeep { pointer: String, limit: usize },
}

/// Errors while exporting a document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("clipboard unavailable: {message}")]
    Clipboard { message: String },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::Serialize(_) => 2,
            ExportError::Clipboard { .. } | ExportError::Write { .. } => 3,
        }
    }
}
