//! Error types for manifest deployment.
//!
//! Errors are split by the unit of work they abort:
//!
//! - [`DeployError`] aborts the whole run (bad configuration, unreadable tree).
//! - [`ManifestError`] aborts a single manifest file.
//! - [`SyncError`] aborts a single remote resource.
//! - [`SeedError`] aborts the fixture batch of a tests manifest.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

/// Errors that abort a deployment run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is misconfigured.
        message: String,
    },

    /// A directory entry could not be read during traversal.
    #[error("Failed to walk project tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl DeployError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Errors raised while reading a manifest file.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors raised while pushing a resource to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The command script referenced by the manifest could not be read.
    #[error("Failed to read source file {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The request never produced a response.
    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    /// The API answered with a non-success status.
    #[error("{url} rejected the request (HTTP {status}): {detail}")]
    Rejected {
        url: String,
        status: u16,
        /// Server-provided `errors` detail, or the raw body when there is none.
        detail: String,
    },
}

/// Errors raised while seeding test fixtures.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The fixture data file could not be read.
    #[error("Failed to read fixture data {path}: {source}")]
    DataIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The fixture data file does not match the expected shape.
    #[error("Invalid fixture data in {path}: {source}")]
    DataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A join row points at a table object that does not exist.
    #[error("{entity} references unknown table object {uuid}")]
    UnknownTableObject {
        /// Human readable label of the referencing entity.
        entity: String,
        uuid: Uuid,
    },

    /// The fixture database could not be reached.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// A query failed.
    #[error("Database error: {message}")]
    Database { message: String },
}

impl SeedError {
    /// Creates a new `UnknownTableObject` error.
    #[must_use]
    pub fn unknown_table_object(entity: impl Into<String>, uuid: Uuid) -> Self {
        Self::UnknownTableObject {
            entity: entity.into(),
            uuid,
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Database` error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DataIo { .. } | Self::DataParse { .. } => ErrorCategory::Input,
            Self::UnknownTableObject { .. } => ErrorCategory::Reference,
            Self::Connection { .. } | Self::Database { .. } => ErrorCategory::Database,
        }
    }
}

/// Categories of seeding errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The fixture declaration itself is unreadable.
    Input,
    /// A declared reference cannot be resolved.
    Reference,
    /// The database rejected an operation.
    Database,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Reference => write!(f, "reference"),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Errors raised while invoking the external test runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// No command was configured.
    #[error("No test command configured")]
    NoCommand,

    /// The runner process could not be started.
    #[error("Failed to start test runner `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}
