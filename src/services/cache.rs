use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::clock::Clock;

struct CacheEntry {
    valid_to: DateTime<Utc>,
    content: String,
}

/// In-memory store for finished feeds whose entries expire a fixed time after
/// they were written.
///
/// Expired entries are only removed when a read notices them. There is no
/// size bound.
pub struct FeedCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    entry_duration: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl FeedCache {
    #[cfg(test)]
    pub fn new(entry_duration: TimeDelta) -> Self {
        Self::with_clock(entry_duration, Arc::new(crate::clock::SystemClock))
    }

    pub fn with_clock(entry_duration: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            entry_duration,
            clock,
        }
    }

    /// Returns the stored content for `key` unless it is missing or expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if self.clock.now() >= entry.valid_to {
            entries.remove(key);
            return None;
        }
        Some(entry.content.clone())
    }

    /// Stores `content` under `key`, replacing any previous entry.
    pub async fn put(&self, key: &str, content: String) {
        let valid_to = self.clock.now() + self.entry_duration;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), CacheEntry { valid_to, content });
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
