use std::path::PathBuf;

/// Fatal errors raised by the leveling engine and its file plumbing.
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    #[error("data integrity violation in sentence {sentence_id} ({key}): {details}")]
    DataIntegrity {
        sentence_id: u64,
        key: String,
        details: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to atomically replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

pub type WeaveResult<T> = Result<T, WeaveError>;

impl WeaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WeaveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        WeaveError::Json {
            path: path.into(),
            source,
        }
    }
}
