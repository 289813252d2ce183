//! crates/sa_io/src/lib.rs
//! I/O crate for the survey allocation engine.
//!
//! - Tabular input (`.csv`, `.json`) with column-name normalization → `RecordTable`.
//! - Tabular output (CSV) and canonical JSON, both written atomically.
//! - SHA-256 digests of files and canonical values; `RUN:` ids.
//! - Parameter sets and offline manifests.
//!
//! Shared error type (`IoError`) with `From` conversions used across modules.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod manifest;
pub mod params;
pub mod synonyms;
pub mod table_io;

/// Unified error for sa_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, fsync, ...)
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON serialization/deserialization errors with a JSON Pointer hint.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Malformed CSV (ragged rows, bad encoding).
    #[error("csv error: {0}")]
    Csv(String),

    /// File extension the reader does not handle.
    #[error("unsupported table format: {0} (expected .csv or .json)")]
    UnsupportedFormat(String),

    /// Column layout problems (alias collisions, nested values).
    #[error("schema error: {0}")]
    Schema(String),

    /// Manifest shape / offline / digest failures.
    #[error("manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    /// Generic validation / invariants.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        // serde_json keeps line/column, not a pointer; callers may enrich.
        IoError::Json { pointer: "/".to_string(), msg: e.to_string() }
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        IoError::Csv(e.to_string())
    }
}

impl From<sa_core::CoreError> for IoError {
    fn from(e: sa_core::CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

/// Returns true if `s` looks like a URL (any `<scheme>://`, including `file://`).
#[inline]
pub fn looks_like_url_strict(s: &str) -> bool {
    let t = s.trim();
    t.contains("://") || t.starts_with("http:") || t.starts_with("https:")
}
