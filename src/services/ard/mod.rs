//! Feeds for shows of the ARD Mediathek.

pub mod api;
mod funk;

use std::sync::{Arc, LazyLock};

use regex::Regex;

use self::api::{ArdApi, Show, ShowVideo, Teaser};
use crate::clock::Clock;
use crate::error::{FeedError, FeedResult};
use crate::ports::feed::FeedBuilder;
use crate::request_parameters::RequestParameters;
use crate::rss::{Channel, Enclosure, Feed, Guid, Image, Item, itunes_duration};
use crate::services::selection::{nearest_width_url, preferred_aspect_image};

const MEDIATHEK_BASE: &str = "https://www.ardmediathek.de/ard";
const VIDEO_MIME_TYPE: &str = "video/mp4";

static SHOW_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());

pub fn is_valid_show_id(id: &str) -> bool {
    SHOW_ID.is_match(id)
}

pub struct ArdFeedBuilder {
    api: ArdApi,
    clock: Arc<dyn Clock>,
}

impl ArdFeedBuilder {
    pub fn new(api: ArdApi, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    async fn item(&self, teaser: &Teaser, parameters: &RequestParameters) -> FeedResult<Item> {
        let video_url = &teaser.links.target.href;
        let video = self.api.get_video(video_url).await?;
        let Some(widget) = video.widgets.first() else {
            return Err(FeedError::UpstreamMalformed(format!(
                "Video {video_url} has no widgets"
            )));
        };

        let stream_url = best_stream_url(&video, parameters.width);
        let image_url = widget.image.url_for_width(parameters.width);

        Ok(Item {
            title: teaser.long_title.clone(),
            link: format!("{MEDIATHEK_BASE}/video/{}", teaser.id),
            description: Some(widget.synopsis.clone()),
            pub_date: teaser.broadcasted_on,
            guid: Some(Guid::opaque(teaser.id.clone())),
            enclosure: Some(Enclosure {
                url: stream_url.to_string(),
                mime_type: VIDEO_MIME_TYPE.to_string(),
                length: None,
            }),
            itunes_duration: itunes_duration(teaser.duration),
            itunes_title: teaser.long_title.clone(),
            itunes_summary: Some(widget.synopsis.clone()),
            itunes_image: Some(image_url),
            ..Default::default()
        })
    }

    fn channel(&self, show_id: &str, show: &Show, parameters: &RequestParameters) -> Channel {
        // get_show guarantees a first teaser with images
        let show_info = &show.teasers[0].show;
        let link = format!("{MEDIATHEK_BASE}/sendung/{show_id}");
        let image_url = preferred_aspect_image(&show_info.images)
            .map(|image| image.url_for_width(parameters.width))
            .unwrap_or_default();

        Channel {
            title: show_info.title.clone(),
            description: Some(show_info.long_synopsis.clone()),
            link: link.clone(),
            last_build_date: Some(self.clock.now()),
            image: Some(Image {
                url: image_url.clone(),
                title: show_info.title.clone(),
                link,
                ..Default::default()
            }),
            itunes_summary: Some(show_info.long_synopsis.clone()),
            itunes_image: Some(image_url),
            ..Default::default()
        }
    }
}

/// Nearest-width pick over the streams of the first media entry of the
/// first widget.
fn best_stream_url(video: &ShowVideo, width: i64) -> &str {
    let streams = video
        .widgets
        .first()
        .and_then(|widget| widget.media_collection.embedded.media_array.first())
        .map(|entry| entry.media_streams.as_slice())
        .unwrap_or_default();
    nearest_width_url(
        width,
        streams
            .iter()
            .map(|stream| (stream.width, stream.stream.0.iter().map(String::as_str))),
    )
}

#[async_trait::async_trait]
impl FeedBuilder for ArdFeedBuilder {
    #[tracing::instrument(skip(self))]
    async fn build(&self, identifier: &str, parameters: &RequestParameters) -> FeedResult<String> {
        let show = self.api.get_show(identifier).await?;

        let mut items = Vec::with_capacity(show.teasers.len());
        for teaser in &show.teasers {
            if !parameters.accepts_duration(teaser.duration) {
                tracing::debug!(teaser = %teaser.id, duration = teaser.duration, "Skipping short episode");
                continue;
            }
            items.push(self.item(teaser, parameters).await?);
        }
        tracing::info!(items = items.len(), "Built ARD feed");

        let mut channel = self.channel(identifier, &show, parameters);
        channel.items = items;
        Feed { channel }.to_xml()
    }
}
