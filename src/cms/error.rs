//! Content API errors

use thiserror::Error;

/// Result type alias for content API operations
pub type Result<T> = std::result::Result<T, CmsError>;

#[derive(Error, Debug)]
pub enum CmsError {
    /// No endpoint in `_config.yml` or the environment
    #[error("CMS endpoint is not configured (set cms.endpoint or PRISMIC_API_ENDPOINT)")]
    MissingEndpoint,

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A pagination cursor pointing outside the configured API
    #[error("cursor {0:?} does not belong to the configured CMS endpoint")]
    ForeignCursor(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CMS answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CMS API has no master ref")]
    NoMasterRef,

    #[error("document {doc_type}/{uid} not found")]
    NotFound { doc_type: String, uid: String },
}

impl CmsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsError::NotFound { .. })
    }
}
