pub mod ard;
pub mod cache;
pub mod cached_feed;
pub mod ordered_map;
pub mod selection;
pub mod transport;
pub mod zdf;

use serde::de::DeserializeOwned;

use crate::error::{FeedError, FeedResult};

/// Decodes an upstream JSON body, naming the URL it came from on failure.
pub(crate) fn parse_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> FeedResult<T> {
    serde_json::from_slice(body).map_err(|error| {
        tracing::warn!(url, %error, "Could not parse JSON body");
        FeedError::malformed_json(url, error)
    })
}
