use thiserror::Error;

/// Boxed failure reported by a backing facility.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Stored string under `key` is not valid JSON.
    #[error("failed to decode stored value for {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot does not fit the requested type: {0}")]
    Shape(#[source] serde_json::Error),

    /// An object-like source member met a target member that cannot hold keyed members.
    #[error("cannot merge an object into {found} at `{path}`")]
    MergeType { path: String, found: &'static str },

    #[error("snapshot root must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("storage read failed for {key:?}: {source}")]
    StorageRead {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("storage rejected write for {key:?}: {source}")]
    StorageWrite {
        key: String,
        #[source]
        source: BackendError,
    },

    #[error("member `{key}` has a getter but no setter")]
    ReadOnly { key: String },

    #[error("member `{key}` is not callable")]
    NotCallable { key: String },

    #[error("object graph contains a reference cycle at `{path}`")]
    Cycle { path: String },

    #[error("object is already borrowed")]
    Borrowed,
}

impl Error {
    pub(crate) fn storage_read(key: &str, source: anyhow::Error) -> Self {
        Error::StorageRead {
            key: key.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn storage_write(key: &str, source: anyhow::Error) -> Self {
        Error::StorageWrite {
            key: key.to_string(),
            source: source.into(),
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}
