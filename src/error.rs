/// Everything that can go wrong while producing a feed.
///
/// `RemediationFailed` never leaves the funk remediation step; it exists so the
/// remediation can use `?` internally and log a single warning.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("The given show ID is not valid.")]
    InvalidIdentifier(String),
    #[error("Request to {url} failed: {reason}")]
    UpstreamUnavailable { url: String, reason: String },
    #[error("Unexpected response from upstream: {0}")]
    UpstreamMalformed(String),
    #[error("Could not replace media streams: {0}")]
    RemediationFailed(String),
    #[error("Failed to serialize RSS feed: {0}")]
    Serialization(#[from] std::io::Error),
}

impl FeedError {
    pub fn unavailable(url: &str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Wraps a JSON decoding failure together with the URL the body came from.
    pub fn malformed_json(url: &str, error: serde_json::Error) -> Self {
        Self::UpstreamMalformed(format!("Could not parse JSON body of {url}: {error}"))
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
