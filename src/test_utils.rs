use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::clock::Clock;
use crate::error::{FeedError, FeedResult};
use crate::ports::http::HttpTransport;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", name, e))
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn at_epoch() -> Self {
        Self::at(Utc.timestamp_opt(0, 0).unwrap())
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// Serves canned files from `testdata/` for known URLs and fails for
/// everything else, like an upstream that does not know the resource.
#[derive(Default)]
pub struct FixtureTransport {
    routes: HashMap<String, String>,
    existing: HashSet<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET and POST requests to `url` with the fixture `file`.
    pub fn route(mut self, url: &str, file: &str) -> Self {
        self.routes.insert(url.to_string(), file.to_string());
        self
    }

    /// Let probes of `url` succeed.
    pub fn existing(mut self, url: &str) -> Self {
        self.existing.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    fn record(&self, method: &'static str, url: &str, headers: &[(String, String)]) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
        });
    }

    fn serve(&self, url: &str) -> FeedResult<Vec<u8>> {
        let file = self
            .routes
            .get(url)
            .ok_or_else(|| FeedError::unavailable(url, "Unknown URL"))?;
        std::fs::read(fixture_path(file)).map_err(|e| FeedError::unavailable(url, e))
    }
}

#[async_trait::async_trait]
impl HttpTransport for FixtureTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> FeedResult<Vec<u8>> {
        self.record("GET", url, headers);
        self.serve(url)
    }

    async fn post_form(
        &self,
        url: &str,
        _form: &[(String, String)],
        headers: &[(String, String)],
    ) -> FeedResult<Vec<u8>> {
        self.record("POST", url, headers);
        self.serve(url)
    }

    async fn probe(&self, url: &str) -> FeedResult<()> {
        self.record("HEAD", url, &[]);
        if self.existing.contains(url) {
            Ok(())
        } else {
            Err(FeedError::unavailable(url, "not found"))
        }
    }
}
