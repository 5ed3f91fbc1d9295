//! Error type shared by the readers, the patch engine and the view materializer

use thiserror::Error;

/// Result alias used across the load pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal to the load; nothing here is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query or connection failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive could not be opened or an entry could not be read
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A YAML document (or one record of it) failed to deserialize
    #[error("YAML error in {document}: {source}")]
    Yaml {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The localization table failed to deserialize
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source no longer matches the shape the readers expect
    #[error("Schema violation in {context}: {message}")]
    Schema { context: String, message: String },

    /// A retained entity points at something that does not exist
    #[error("Dangling reference: {0}")]
    Reference(String),

    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker thread died without reporting a result
    #[error("Worker failure: {0}")]
    Worker(String),
}

impl Error {
    pub fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn yaml(document: impl Into<String>, source: serde_yaml::Error) -> Self {
        Error::Yaml {
            document: document.into(),
            source,
        }
    }
}
