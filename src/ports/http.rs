use crate::error::FeedResult;

/// Outbound HTTP as seen by the API clients and feed builders.
///
/// Implementations live in `services::transport` (production) or test mocks.
/// Headers and form fields are passed as owned pairs so mocks can match on them.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the full body.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> FeedResult<Vec<u8>>;

    /// POST an `application/x-www-form-urlencoded` body and return the response body.
    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> FeedResult<Vec<u8>>;

    /// Check that `url` exists without downloading it.
    async fn probe(&self, url: &str) -> FeedResult<()>;
}
