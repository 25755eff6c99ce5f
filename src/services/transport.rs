use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use reqwest::{Client, RequestBuilder};

use crate::error::{FeedError, FeedResult};
use crate::ports::http::HttpTransport;

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(String, String)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    request
}

async fn read_body(url: &str, request: RequestBuilder) -> FeedResult<Vec<u8>> {
    let response = request
        .send()
        .await
        .map_err(|error| FeedError::unavailable(url, error))?
        .error_for_status()
        .map_err(|error| FeedError::unavailable(url, error))?;
    let body = response
        .bytes()
        .await
        .map_err(|error| FeedError::unavailable(url, error))?;
    Ok(body.to_vec())
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> FeedResult<Vec<u8>> {
        tracing::debug!(url, "GET");
        read_body(url, with_headers(self.client.get(url), headers)).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &[(String, String)],
    ) -> FeedResult<Vec<u8>> {
        tracing::debug!(url, "POST");
        // .form() also sets the x-www-form-urlencoded content type
        let request = with_headers(self.client.post(url).form(form), headers);
        read_body(url, request).await
    }

    async fn probe(&self, url: &str) -> FeedResult<()> {
        tracing::debug!(url, "HEAD");
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|error| FeedError::unavailable(url, error))?;
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(FeedError::unavailable(url, format!("status {status}")))
        }
    }
}
