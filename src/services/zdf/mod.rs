//! Feeds for shows of the ZDF Mediathek.

pub mod api;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::OnceCell;

use self::api::{Show, VideoDescription, VideoStreams, ZdfApi};
use crate::clock::Clock;
use crate::error::FeedResult;
use crate::ports::feed::FeedBuilder;
use crate::ports::http::HttpTransport;
use crate::request_parameters::RequestParameters;
use crate::rss::{Channel, Enclosure, Feed, Guid, Image, Item, itunes_duration};
use crate::services::selection::{
    best_image_by_area, insert_tier, quality_tier_url, upgrade_candidates,
};

const VIDEO_MIME_TYPE: &str = "video/mp4";
const AUDIO_LANGUAGE: &str = "deu";
const AUDIO_CLASS: &str = "main";
const VERY_HIGH_QUALITY: &str = "veryhigh";

static SHOW_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9-]+/)*[a-zA-Z0-9-]+$").unwrap());

pub fn is_valid_show_path(path: &str) -> bool {
    SHOW_PATH.is_match(path)
}

pub struct ZdfFeedBuilder {
    max_episodes: u32,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    /// Connected on first use. A failed connect leaves it empty so the next
    /// request tries again.
    api: OnceCell<ZdfApi>,
}

impl ZdfFeedBuilder {
    pub fn new(max_episodes: u32, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_episodes,
            transport,
            clock,
            api: OnceCell::new(),
        }
    }

    async fn api(&self) -> FeedResult<&ZdfApi> {
        self.api
            .get_or_try_init(|| ZdfApi::connect(self.max_episodes, self.transport.clone()))
            .await
    }

    fn channel(&self, show: &Show) -> Channel {
        let image_url = best_image_by_area(&show.image.layouts).to_string();
        let description = show.description().to_string();
        Channel {
            title: show.title.clone(),
            description: Some(description.clone()),
            link: show.url.clone(),
            last_build_date: Some(self.clock.now()),
            image: Some(Image {
                url: image_url.clone(),
                title: show.image.alt.clone(),
                link: show.url.clone(),
                ..Default::default()
            }),
            itunes_subtitle: show.title.clone(),
            itunes_summary: Some(description),
            itunes_image: Some(image_url),
            ..Default::default()
        }
    }
}

fn item(video: &VideoDescription, video_url: String) -> Item {
    Item {
        title: video.title.clone(),
        link: video.url.clone(),
        description: Some(video.description.clone()),
        pub_date: video.date,
        guid: Some(Guid::opaque(video.id.clone())),
        enclosure: Some(Enclosure {
            url: video_url,
            mime_type: VIDEO_MIME_TYPE.to_string(),
            length: None,
        }),
        itunes_duration: itunes_duration(video.duration()),
        itunes_title: video.title.clone(),
        itunes_summary: Some(video.description.clone()),
        itunes_image: Some(best_image_by_area(&video.image.layouts).to_string()),
        ..Default::default()
    }
}

/// Progressive mp4 renditions with the German main audio track, keyed by
/// quality tier. Later entries win within a tier.
pub fn quality_tiers(streams: &VideoStreams) -> Vec<(String, String)> {
    let mut tiers = Vec::new();
    let formats = streams
        .priority_list
        .iter()
        .flat_map(|group| &group.formats)
        .filter(|format| !format.is_adaptive && format.mime_type == VIDEO_MIME_TYPE);
    for format in formats {
        for quality in &format.qualities {
            for track in &quality.audio.tracks {
                if track.language == AUDIO_LANGUAGE && track.class == AUDIO_CLASS {
                    insert_tier(&mut tiers, &quality.quality, &track.url);
                }
            }
        }
    }
    tiers
}

/// URL of the best rendition. The "veryhigh" tier is checked for an even
/// better file; no rendition at all yields an empty URL.
async fn best_video_url(api: &ZdfApi, streams: &VideoStreams) -> String {
    let tiers = quality_tiers(streams);
    match quality_tier_url(&tiers) {
        Some((VERY_HIGH_QUALITY, url)) => highest_resolution_stream(api, url).await,
        Some((_, url)) => url.to_string(),
        None => String::new(),
    }
}

/// First existing higher-bitrate variant of `url`, or `url` itself.
async fn highest_resolution_stream(api: &ZdfApi, url: &str) -> String {
    let Some(candidates) = upgrade_candidates(url) else {
        return url.to_string();
    };
    for candidate in candidates {
        if api.exists(&candidate).await {
            tracing::debug!(url = %candidate, "Found higher resolution stream");
            return candidate;
        }
    }
    url.to_string()
}

#[async_trait::async_trait]
impl FeedBuilder for ZdfFeedBuilder {
    #[tracing::instrument(skip(self))]
    async fn build(&self, identifier: &str, parameters: &RequestParameters) -> FeedResult<String> {
        let api = self.api().await?;
        let show = api.get_show(identifier).await?;
        let search = api.get_show_videos(&show).await?;

        let mut items = Vec::with_capacity(search.results.len());
        for result in &search.results {
            let video = &result.video;
            if !parameters.accepts_duration(video.duration()) {
                tracing::debug!(video = %video.id, duration = video.duration(), "Skipping short episode");
                continue;
            }
            let streams = api.get_streams(video).await?;
            let video_url = best_video_url(api, &streams).await;
            items.push(item(video, video_url));
        }
        tracing::info!(items = items.len(), "Built ZDF feed");

        let mut channel = self.channel(&show);
        channel.items = items;
        Feed { channel }.to_xml()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::FeedError;
    use crate::test_utils::{FixtureTransport, ManualClock, read_fixture};

    const TEST_SHOW_PATH: &str = "comedy/die-testshow";
    const TOKEN_URL: &str = "https://www.zdf.de/nachrichten/heute-journal";
    const SHOW_URL: &str = "https://api.zdf.de/content/documents/zdf/comedy/die-testshow";
    const SEARCH_URL: &str = "https://api.zdf.de/search/documents?hasVideo=true&q=*&types=page-video&sortOrder=desc&sortBy=date&limit=50&contentId=die-testshow-100";
    const STREAMS_1_URL: &str =
        "https://api.zdf.de/tmd/2/ngplayer_2_4/vod/ptmd/mediathek/210115_folge_eins_tst";
    const STREAMS_2_URL: &str =
        "https://api.zdf.de/tmd/2/ngplayer_2_4/vod/ptmd/mediathek/210110_folge_zwei_tst";
    const VIDEO_1_PREFIX: &str =
        "https://rodlzdf-a.akamaihd.net/none/zdf/21/01/210115_folge_eins_tst/1/210115_folge_eins_tst";

    fn show_transport() -> FixtureTransport {
        FixtureTransport::new()
            .route(TOKEN_URL, "zdf_heute_journal.html")
            .route(SHOW_URL, "zdf_show.json")
            .route(SEARCH_URL, "zdf_search.json")
            .route(STREAMS_1_URL, "zdf_streams_1.json")
            .route(STREAMS_2_URL, "zdf_streams_2.json")
            .existing(&format!("{VIDEO_1_PREFIX}_3328k_p36v13.mp4"))
            .existing(&format!("{VIDEO_1_PREFIX}_3328k_p36v14.mp4"))
    }

    fn builder(transport: FixtureTransport) -> (ZdfFeedBuilder, Arc<FixtureTransport>) {
        let transport = Arc::new(transport);
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2021, 1, 20, 12, 0, 0).unwrap());
        let builder = ZdfFeedBuilder::new(50, transport.clone(), Arc::new(clock));
        (builder, transport)
    }

    fn streams(file: &str) -> VideoStreams {
        serde_json::from_str(&read_fixture(file)).unwrap()
    }

    #[test]
    fn test_show_path_validation() {
        assert!(is_valid_show_path("comedy/die-testshow"));
        assert!(is_valid_show_path("die-testshow"));
        assert!(is_valid_show_path("a/b/c-1"));
        assert!(!is_valid_show_path(""));
        assert!(!is_valid_show_path("comedy/"));
        assert!(!is_valid_show_path("/comedy"));
        assert!(!is_valid_show_path("comedy//show"));
        assert!(!is_valid_show_path("comedy/die_testshow"));
        assert!(!is_valid_show_path("../secret"));
    }

    #[test]
    fn test_quality_tiers_filter_formats_and_tracks() {
        let tiers = quality_tiers(&streams("zdf_streams_1.json"));
        let labels: Vec<&str> = tiers.iter().map(|(tier, _)| tier.as_str()).collect();
        assert_eq!(labels, vec!["veryhigh", "high", "low"]);
        assert!(tiers.iter().all(|(_, url)| url.ends_with(".mp4")));
        assert!(tiers.iter().all(|(_, url)| !url.contains("_dgs_")));
    }

    #[tokio::test]
    async fn test_build_feed() {
        let (builder, _) = builder(show_transport());
        let xml = builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap();
        assert_eq!(xml, read_fixture("zdf_feed.xml").trim_end());
    }

    #[tokio::test]
    async fn test_build_feed_skips_short_episodes_without_fetching_streams() {
        let (builder, transport) = builder(show_transport());
        let parameters = RequestParameters {
            width: 1920,
            minimum_length_in_seconds: 600,
        };
        let xml = builder.build(TEST_SHOW_PATH, &parameters).await.unwrap();

        assert_eq!(xml, read_fixture("zdf_feed_min_length.xml").trim_end());
        assert!(!transport.requested_urls().iter().any(|url| url == STREAMS_2_URL));
    }

    #[tokio::test]
    async fn test_upgrade_probes_best_candidates_first() {
        let (builder, transport) = builder(show_transport());
        builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap();

        let probes: Vec<String> = transport
            .requests()
            .into_iter()
            .filter(|request| request.method == "HEAD")
            .map(|request| request.url)
            .collect();
        assert_eq!(
            probes,
            vec![
                format!("{VIDEO_1_PREFIX}_3360k_p36v15.mp4"),
                format!("{VIDEO_1_PREFIX}_3328k_p35v14.mp4"),
                format!("{VIDEO_1_PREFIX}_3328k_p36v14.mp4"),
            ]
        );
    }

    #[tokio::test]
    async fn test_upgrade_falls_back_to_original_url() {
        let transport = Arc::new(FixtureTransport::new());
        let api = ZdfApi::with_token(50, "token", transport.clone());
        let url = format!("{VIDEO_1_PREFIX}_1628k_p13v15.mp4");

        assert_eq!(highest_resolution_stream(&api, &url).await, url);
        assert_eq!(transport.requests().len(), 7);
    }

    #[tokio::test]
    async fn test_no_matching_rendition_gives_empty_url() {
        let transport = Arc::new(FixtureTransport::new());
        let api = ZdfApi::with_token(50, "token", transport);
        let streams: VideoStreams = serde_json::from_str(
            r#"{"priorityList": [{"formitaeten": [{"isAdaptive": true, "mimeType": "application/x-mpegURL", "qualities": []}]}]}"#,
        )
        .unwrap();
        assert_eq!(best_video_url(&api, &streams).await, "");
    }

    #[tokio::test]
    async fn test_token_is_fetched_once() {
        let (builder, transport) = builder(show_transport());
        builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap();
        builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap();

        let token_requests = transport
            .requested_urls()
            .into_iter()
            .filter(|url| url == TOKEN_URL)
            .count();
        assert_eq!(token_requests, 1);
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_retried() {
        let (builder, transport) = builder(FixtureTransport::new());
        let err = builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamUnavailable { .. }));

        builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap_err();
        assert_eq!(transport.requested_urls(), vec![TOKEN_URL, TOKEN_URL]);
    }

    #[tokio::test]
    async fn test_stream_error_aborts_build() {
        let transport = FixtureTransport::new()
            .route(TOKEN_URL, "zdf_heute_journal.html")
            .route(SHOW_URL, "zdf_show.json")
            .route(SEARCH_URL, "zdf_search.json")
            .route(STREAMS_1_URL, "zdf_streams_1.json");
        let (builder, _) = builder(transport);

        let err = builder
            .build(TEST_SHOW_PATH, &RequestParameters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UpstreamUnavailable { ref url, .. } if url == STREAMS_2_URL));
    }
}
