use std::path::PathBuf;

/// Errors raised by the on-disk blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("No cached entry for key '{0}'")]
    NotFound(String),

    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),

    #[error("Failed to write cache entry '{key}': {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the typed cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to decode cache entry '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode cache entry '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// True for failures that mean "nothing usable is cached" rather than a
    /// broken disk: a missing entry or one that no longer decodes.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            CacheError::Storage(StorageError::NotFound(_)) | CacheError::Decode { .. }
        )
    }
}

/// The only failure a caller of the intensity client ever observes.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network unavailable while requesting {url}: {reason}")]
    NetworkUnavailable { url: String, reason: String },

    #[error("Upstream returned HTTP {status} for {url}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    UpstreamNonSuccess {
        url: String,
        status: u16,
        message: Option<String>,
    },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    #[error(
        "Forecast needs at least {} intervals, got {got}",
        crate::advisor::ADVICE_INTERVALS
    )]
    InsufficientIntervals { got: usize },
}
