use thiserror::Error;

/// Typed feed errors.
///
/// The fetch and decode layers return these without deciding anything about
/// user visibility; the finder is the single place that turns one into a
/// user-facing notice (or suppresses it in favour of stale data).
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP status {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("network error fetching feed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decompress feed payload: {0}")]
    DecompressionFailed(#[source] std::io::Error),

    #[error("feed payload is not valid GeoJSON: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::MalformedPayload(err.to_string())
    }
}

impl From<crate::cache::CacheError> for FeedError {
    fn from(err: crate::cache::CacheError) -> Self {
        FeedError::Unexpected(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_names_url() {
        let e = FeedError::Status {
            status: 503,
            url: "https://example.com/feed.gz".into(),
        };
        assert_eq!(
            e.to_string(),
            "HTTP status 503 fetching https://example.com/feed.gz"
        );
    }

    #[test]
    fn test_malformed_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = FeedError::from(json_err);
        assert!(matches!(e, FeedError::MalformedPayload(_)));
    }

    #[test]
    fn test_decompression_carries_source() {
        let e = FeedError::DecompressionFailed(std::io::Error::other("corrupt deflate stream"));
        assert!(e.to_string().contains("corrupt deflate stream"));
    }
}
