//! Error types for uselocal.
//!
//! All operations return `Result<T>` which aliases `Result<T, UselocalError>`.
//! Every variant is fatal: the binary prints it once and exits non-zero.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading the configuration or patching a tree.
#[derive(Debug, Error)]
pub enum UselocalError {
    /// Config file missing or unreadable.
    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid YAML or has the wrong shape.
    #[error("Invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An absolute path could not be determined.
    #[error("Cannot resolve absolute path for {}: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory listing or entry inspection failed during the walk.
    #[error("Failed to list {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Manifest could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Manifest content is not valid for its format.
    #[error("{}: {source}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// A replace directive could not be added or dropped.
    #[error("{}: {source}", path.display())]
    ManifestEdit {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Manifest could not be serialized after editing.
    #[error("{}: {source}", path.display())]
    ManifestFormat {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Rewritten manifest could not be persisted.
    ///
    /// The file may be left partially written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors reported by a manifest implementation.
///
/// These carry no path; the patcher attaches it when wrapping them into
/// [`UselocalError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Syntax error at a 1-based line number.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Rejected edit.
    #[error("{0}")]
    Edit(String),

    /// Structure cannot be printed.
    #[error("{0}")]
    Format(String),
}

/// Result type alias for uselocal operations.
pub type Result<T> = std::result::Result<T, UselocalError>;
