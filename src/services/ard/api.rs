use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

use super::funk;
use crate::error::{FeedError, FeedResult};
use crate::ports::http::HttpTransport;
use crate::services::{ordered_map, parse_json};

const ARD_API_BASE: &str = "https://api.ardmediathek.de/page-gateway";

/* ---------- Show ---------- */

/// Response of the asset widget endpoint: the latest episodes of a show.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Show {
    pub teasers: Vec<Teaser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Teaser {
    pub id: String,
    pub long_title: String,
    pub links: TeaserLinks,
    pub show: TeaserShow,
    #[serde(deserialize_with = "ordered_map::deserialize")]
    pub images: Vec<(String, ShowImage)>,
    pub broadcasted_on: Option<DateTime<FixedOffset>>,
    /// Length in seconds.
    pub duration: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeaserLinks {
    pub target: LinkTarget,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkTarget {
    /// API URL of the video document.
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeaserShow {
    pub id: String,
    pub title: String,
    pub long_synopsis: String,
    /// Keyed by aspect ratio label such as "16x9" or "1x1".
    #[serde(deserialize_with = "ordered_map::deserialize")]
    pub images: Vec<(String, ShowImage)>,
}

/// An image whose `src` contains a `{width}` placeholder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowImage {
    pub title: String,
    pub src: String,
    pub alt: String,
}

impl ShowImage {
    pub fn url_for_width(&self, width: i64) -> String {
        self.src.replace("{width}", &width.to_string())
    }
}

impl Show {
    /// The first teaser must carry the show title and at least one show
    /// image, since the channel is built from it.
    fn has_valid_teaser(&self) -> bool {
        self.teasers
            .first()
            .is_some_and(|teaser| !teaser.show.title.is_empty() && !teaser.show.images.is_empty())
    }
}

/* ---------- Video ---------- */

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShowVideo {
    pub tracking: Tracking,
    pub widgets: Vec<VideoWidget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tracking {
    pub ati_custom_vars: AtiCustomVars,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtiCustomVars {
    pub channel: String,
    pub metadata_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoWidget {
    pub media_collection: MediaCollection,
    pub image: ShowImage,
    pub synopsis: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaCollection {
    pub embedded: EmbeddedMedia,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddedMedia {
    #[serde(rename = "_mediaArray")]
    pub media_array: Vec<MediaEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaEntry {
    #[serde(rename = "_mediaStreamArray")]
    pub media_streams: Vec<MediaStream>,
}

/// One rendition of a video. A width of 0 marks an adaptive stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MediaStream {
    #[serde(rename = "_cdn")]
    pub cdn: String,
    #[serde(rename = "_width")]
    pub width: i64,
    #[serde(rename = "_height")]
    pub height: i64,
    #[serde(rename = "_stream")]
    pub stream: StreamUrls,
}

/// `_stream` is either a single URL or a list of URLs upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamUrls(pub Vec<String>);

impl<'de> Deserialize<'de> for StreamUrls {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(url) => StreamUrls(vec![url]),
            OneOrMany::Many(urls) => StreamUrls(urls),
        })
    }
}

impl ShowVideo {
    /// Number of streams with a known width, across all widgets.
    pub fn sized_stream_count(&self) -> usize {
        self.media_entries()
            .flat_map(|entry| &entry.media_streams)
            .filter(|stream| stream.width != 0)
            .count()
    }

    /// Puts `streams` into every media entry of every widget.
    pub fn replace_streams(&mut self, streams: Vec<MediaStream>) {
        for widget in &mut self.widgets {
            for entry in &mut widget.media_collection.embedded.media_array {
                entry.media_streams = streams.clone();
            }
        }
    }

    fn media_entries(&self) -> impl Iterator<Item = &MediaEntry> {
        self.widgets
            .iter()
            .flat_map(|widget| &widget.media_collection.embedded.media_array)
    }
}

/* ---------- Client ---------- */

/// Client for the ARD Mediathek page gateway.
pub struct ArdApi {
    max_episodes: u32,
    transport: Arc<dyn HttpTransport>,
}

impl ArdApi {
    pub fn new(max_episodes: u32, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            max_episodes,
            transport,
        }
    }

    pub fn show_url(&self, show_id: &str) -> String {
        format!(
            "{ARD_API_BASE}/widgets/ard/asset/{show_id}?pageNumber=0&pageSize={}",
            self.max_episodes
        )
    }

    /// Loads the latest episodes of a show.
    pub async fn get_show(&self, show_id: &str) -> FeedResult<Show> {
        let url = self.show_url(show_id);
        let body = self.transport.get(&url, &[]).await?;
        let show: Show = parse_json(&url, &body)?;
        if !show.has_valid_teaser() {
            return Err(FeedError::UpstreamMalformed(
                "The show has no valid teasers".to_string(),
            ));
        }
        Ok(show)
    }

    /// Loads the video document behind a teaser link. Videos of the funk
    /// channel that come without sized streams get them from nexx.
    pub async fn get_video(&self, video_url: &str) -> FeedResult<ShowVideo> {
        let body = self.transport.get(video_url, &[]).await?;
        let mut video: ShowVideo = parse_json(video_url, &body)?;
        funk::remediate(self.transport.as_ref(), &mut video).await;
        Ok(video)
    }
}
