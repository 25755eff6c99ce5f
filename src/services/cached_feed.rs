use std::sync::Arc;

use crate::error::FeedResult;
use crate::ports::feed::FeedBuilder;
use crate::request_parameters::RequestParameters;
use crate::services::cache::FeedCache;

/// Serves feeds from the cache and builds them on a miss.
///
/// Only successful builds are stored. Concurrent misses for the same key each
/// build, and the last one to finish wins the cache slot.
#[derive(Clone)]
pub struct CachedFeed {
    provider: &'static str,
    cache: Arc<FeedCache>,
    builder: Arc<dyn FeedBuilder>,
}

impl CachedFeed {
    /// `provider` namespaces the cache keys, so several feeds can share one
    /// cache.
    pub fn new(
        provider: &'static str,
        cache: Arc<FeedCache>,
        builder: Arc<dyn FeedBuilder>,
    ) -> Self {
        Self {
            provider,
            cache,
            builder,
        }
    }

    pub async fn serve(&self, identifier: &str, parameters: &RequestParameters) -> FeedResult<String> {
        let key = cache_key(self.provider, identifier, parameters);
        if let Some(content) = self.cache.get(&key).await {
            tracing::info!(
                provider = self.provider,
                identifier,
                %parameters,
                "Answering request from cache"
            );
            return Ok(content);
        }

        let content = self.builder.build(identifier, parameters).await?;
        self.cache.put(&key, content.clone()).await;
        Ok(content)
    }
}

/// `<provider>:<identifier>#width=<w>&minLength=<m>`
pub fn cache_key(provider: &str, identifier: &str, parameters: &RequestParameters) -> String {
    format!("{provider}:{identifier}#{parameters}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::error::FeedError;
    use crate::ports::feed::MockFeedBuilder;
    use crate::test_utils::ManualClock;

    fn cached_feed(builder: MockFeedBuilder) -> (CachedFeed, Arc<FeedCache>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = Arc::new(FeedCache::with_clock(TimeDelta::minutes(5), clock.clone()));
        let feed = CachedFeed::new("test", cache.clone(), Arc::new(builder));
        (feed, cache, clock)
    }

    #[test]
    fn test_cache_key() {
        let parameters = RequestParameters {
            width: 1280,
            minimum_length_in_seconds: 300,
        };
        assert_eq!(
            cache_key("ard", "abc", &parameters),
            "ard:abc#width=1280&minLength=300"
        );
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let mut builder = MockFeedBuilder::new();
        builder
            .expect_build()
            .withf(|identifier, parameters| {
                identifier == "abc" && *parameters == RequestParameters::default()
            })
            .times(1)
            .returning(|_, _| Ok("<rss/>".to_string()));
        let (feed, cache, _) = cached_feed(builder);

        let parameters = RequestParameters::default();
        assert_eq!(feed.serve("abc", &parameters).await.unwrap(), "<rss/>");
        assert_eq!(feed.serve("abc", &parameters).await.unwrap(), "<rss/>");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_rebuilt() {
        let mut builder = MockFeedBuilder::new();
        let mut generation = 0;
        builder.expect_build().times(2).returning(move |_, _| {
            generation += 1;
            Ok(format!("feed {generation}"))
        });
        let (feed, _, clock) = cached_feed(builder);
        let parameters = RequestParameters::default();

        assert_eq!(feed.serve("abc", &parameters).await.unwrap(), "feed 1");
        clock.advance(TimeDelta::minutes(4));
        assert_eq!(feed.serve("abc", &parameters).await.unwrap(), "feed 1");
        clock.advance(TimeDelta::minutes(1));
        assert_eq!(feed.serve("abc", &parameters).await.unwrap(), "feed 2");
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let mut builder = MockFeedBuilder::new();
        builder
            .expect_build()
            .times(2)
            .returning(|_, _| Err(FeedError::UpstreamMalformed("broken".to_string())));
        let (feed, cache, _) = cached_feed(builder);
        let parameters = RequestParameters::default();

        let err = feed.serve("abc", &parameters).await.unwrap_err();
        assert_eq!(err.to_string(), "Unexpected response from upstream: broken");
        assert!(feed.serve("abc", &parameters).await.is_err());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_parameters_are_cached_separately() {
        let mut builder = MockFeedBuilder::new();
        builder
            .expect_build()
            .times(2)
            .returning(|_, parameters| Ok(format!("width {}", parameters.width)));
        let (feed, cache, _) = cached_feed(builder);

        let narrow = RequestParameters {
            width: 640,
            ..Default::default()
        };
        let wide = RequestParameters::default();
        assert_eq!(feed.serve("abc", &narrow).await.unwrap(), "width 640");
        assert_eq!(feed.serve("abc", &wide).await.unwrap(), "width 1920");
        assert_eq!(feed.serve("abc", &narrow).await.unwrap(), "width 640");
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_providers_sharing_a_cache_do_not_mix() {
        let clock = Arc::new(ManualClock::at_epoch());
        let cache = Arc::new(FeedCache::with_clock(TimeDelta::minutes(5), clock));

        let mut ard_builder = MockFeedBuilder::new();
        ard_builder
            .expect_build()
            .times(1)
            .returning(|_, _| Ok("ARD".to_string()));
        let mut zdf_builder = MockFeedBuilder::new();
        zdf_builder
            .expect_build()
            .times(1)
            .returning(|_, _| Ok("ZDF".to_string()));
        let ard = CachedFeed::new("ard", cache.clone(), Arc::new(ard_builder));
        let zdf = CachedFeed::new("zdf", cache.clone(), Arc::new(zdf_builder));

        let parameters = RequestParameters::default();
        assert_eq!(ard.serve("heute", &parameters).await.unwrap(), "ARD");
        assert_eq!(zdf.serve("heute", &parameters).await.unwrap(), "ZDF");
        assert_eq!(ard.serve("heute", &parameters).await.unwrap(), "ARD");
        assert_eq!(cache.len().await, 2);
    }
}
