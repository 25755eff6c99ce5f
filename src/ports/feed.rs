use crate::error::FeedResult;
use crate::request_parameters::RequestParameters;

/// Produces the serialized RSS document for one show of one provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeedBuilder: Send + Sync {
    async fn build(&self, identifier: &str, parameters: &RequestParameters)
    -> FeedResult<String>;
}
