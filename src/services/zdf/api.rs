use std::sync::{Arc, LazyLock};

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::Deserialize;

use crate::error::{FeedError, FeedResult};
use crate::ports::http::HttpTransport;
use crate::services::{ordered_map, parse_json};

const BEARER_TOKEN_SOURCE_URL: &str = "https://www.zdf.de/nachrichten/heute-journal";
const ZDF_API_BASE: &str = "https://api.zdf.de";
const PLAYER_ID: &str = "ngplayer_2_4";

static API_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']?apiToken["']?:\s*["']([a-z0-9]+)["']"#).unwrap());

/// A show without its videos.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Show {
    pub id: String,
    pub title: String,
    #[serde(rename = "teaserImageRef")]
    pub image: TeaserImage,
    #[serde(rename = "http://zdf.de/rels/sharing-url")]
    pub url: String,
    #[serde(rename = "http://zdf.de/rels/search/page-video-counter-with-video")]
    pub search: SearchLink,
    #[serde(rename = "module")]
    pub modules: Vec<ShowModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchLink {
    /// Path and query of the video search, with `limit=0`.
    #[serde(rename = "self")]
    pub url_template: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShowModule {
    #[serde(rename = "shorttext-text")]
    pub description: String,
}

impl Show {
    /// Text of the first module that has one, or empty.
    pub fn description(&self) -> &str {
        self.modules
            .iter()
            .map(|module| module.description.as_str())
            .find(|description| !description.is_empty())
            .unwrap_or_default()
    }

    pub fn search_url(&self, max_episodes: u32) -> String {
        let path = self
            .search
            .url_template
            .replace("limit=0", &format!("limit={max_episodes}"));
        format!("{ZDF_API_BASE}{path}")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShowSearchResult {
    #[serde(rename = "http://zdf.de/rels/search/results")]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    #[serde(rename = "http://zdf.de/rels/target")]
    pub video: VideoDescription,
}

/// A video without its streams.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoDescription {
    pub id: String,
    #[serde(rename = "teaserHeadline")]
    pub title: String,
    #[serde(rename = "teasertext")]
    pub description: String,
    #[serde(rename = "editorialDate")]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(rename = "teaserImageRef")]
    pub image: TeaserImage,
    #[serde(rename = "http://zdf.de/rels/sharing-url")]
    pub url: String,
    #[serde(rename = "mainVideoContent")]
    pub main_video_content: MainVideoContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MainVideoContent {
    #[serde(rename = "http://zdf.de/rels/target")]
    pub target: VideoTarget,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoTarget {
    /// Length in seconds.
    pub duration: u64,
    #[serde(rename = "http://zdf.de/rels/streams/ptmd-template")]
    pub ptmd_template: String,
}

impl VideoDescription {
    pub fn duration(&self) -> u64 {
        self.main_video_content.target.duration
    }

    pub fn streams_url(&self) -> String {
        let path = self
            .main_video_content
            .target
            .ptmd_template
            .replace("{playerId}", PLAYER_ID);
        format!("{ZDF_API_BASE}{path}")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeaserImage {
    #[serde(rename = "altText")]
    pub alt: String,
    /// Image URLs keyed by a `WIDTHxHEIGHT` label.
    #[serde(deserialize_with = "ordered_map::deserialize")]
    pub layouts: Vec<(String, String)>,
}

/* ---------- Streams ---------- */

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoStreams {
    #[serde(rename = "priorityList")]
    pub priority_list: Vec<StreamGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamGroup {
    #[serde(rename = "formitaeten")]
    pub formats: Vec<StreamFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamFormat {
    pub is_adaptive: bool,
    pub mime_type: String,
    pub qualities: Vec<StreamQuality>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamQuality {
    /// Tier label such as "veryhigh", "high" or "low".
    pub quality: String,
    pub audio: StreamAudio,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamAudio {
    pub tracks: Vec<AudioTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioTrack {
    pub class: String,
    pub language: String,
    #[serde(rename = "uri")]
    pub url: String,
}

/* ---------- Client ---------- */

/// Finds the API token embedded in a zdf.de page.
pub fn extract_bearer_token(page: &str) -> Option<&str> {
    API_TOKEN
        .captures(page)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str())
}

/// Client for the ZDF content API. Every request carries the bearer token
/// scraped from the website.
pub struct ZdfApi {
    max_episodes: u32,
    bearer_token: String,
    transport: Arc<dyn HttpTransport>,
}

impl ZdfApi {
    /// Fetches a bearer token and returns a ready client.
    pub async fn connect(max_episodes: u32, transport: Arc<dyn HttpTransport>) -> FeedResult<Self> {
        let body = transport.get(BEARER_TOKEN_SOURCE_URL, &[]).await?;
        let page = String::from_utf8_lossy(&body);
        let token = extract_bearer_token(&page).ok_or_else(|| {
            FeedError::UpstreamMalformed("Could not find bearer token on ZDF main page".to_string())
        })?;
        tracing::info!("Obtained ZDF API token");
        Ok(Self::with_token(max_episodes, token, transport))
    }

    pub fn with_token(
        max_episodes: u32,
        bearer_token: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            max_episodes,
            bearer_token: bearer_token.into(),
            transport,
        }
    }

    pub async fn get_show(&self, show_path: &str) -> FeedResult<Show> {
        self.get_json(&format!("{ZDF_API_BASE}/content/documents/zdf/{show_path}"))
            .await
    }

    /// Loads at most `max_episodes` videos of `show`, newest first.
    pub async fn get_show_videos(&self, show: &Show) -> FeedResult<ShowSearchResult> {
        self.get_json(&show.search_url(self.max_episodes)).await
    }

    pub async fn get_streams(&self, video: &VideoDescription) -> FeedResult<VideoStreams> {
        self.get_json(&video.streams_url()).await
    }

    /// Whether a media file exists at `url`.
    pub async fn exists(&self, url: &str) -> bool {
        self.transport.probe(url).await.is_ok()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> FeedResult<T> {
        let headers = [(
            "Api-Auth".to_string(),
            format!("Bearer {}", self.bearer_token),
        )];
        let body = self.transport.get(url, &headers).await?;
        parse_json(url, &body)
    }
}
