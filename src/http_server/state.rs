use crate::services::cached_feed::CachedFeed;

/// Shared by all request handlers. Both providers use the same cache.
pub struct AppState {
    pub ard: CachedFeed,
    pub zdf: CachedFeed,
}
