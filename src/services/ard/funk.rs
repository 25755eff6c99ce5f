//! Videos of the funk channel are often published in the Mediathek with
//! adaptive streams only. The nexx API behind funk knows the progressive
//! renditions, so those are used instead.

use std::sync::LazyLock;

use chrono::Utc;
use md5::{Digest, Md5};
use regex::Regex;
use serde::Deserialize;

use super::api::{MediaStream, ShowVideo, StreamUrls};
use crate::error::{FeedError, FeedResult};
use crate::ports::http::HttpTransport;

pub const FUNK_CHANNEL: &str = "funk";

const NEXX_API_BASE: &str = "https://api.nexx.cloud/v3";
const FUNK_DOMAIN_ID: u32 = 741;
const FUNK_DOMAIN_HASH: &str = "CA4SDGOBTRM421IRNO0";

static FUNK_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"video/([0-9]+)$").unwrap());

static FILE_DISTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+:([0-9]+)x([0-9]+):([^:,]+)").unwrap());

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionInitResponse {
    result: SessionInitResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionInitResult {
    general: SessionGeneral,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionGeneral {
    cid: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoMetadataResponse {
    result: VideoMetadataResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VideoMetadataResult {
    streamdata: StreamData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct StreamData {
    pub cdn_type: String,
    #[serde(rename = "cdnShieldHTTPS")]
    pub cdn_shield_https: String,
    pub q_account: String,
    pub q_prefix: String,
    pub q_locator: String,
    /// e.g. `3001:1280x720:2-w7FWPztXm9hnZpbjMcKq,4152:1920x1080:1-Nf3kJwdpTrgHGLY2jtPv`
    pub azure_file_distribution: String,
}

/// Replaces the streams of a funk video if it has no sized stream yet.
///
/// Never fails: problems talking to nexx are logged and the video is left
/// untouched.
pub(super) async fn remediate(transport: &dyn HttpTransport, video: &mut ShowVideo) {
    let vars = &video.tracking.ati_custom_vars;
    if vars.channel != FUNK_CHANNEL {
        return;
    }
    let Some(video_id) = funk_video_id(&vars.metadata_id) else {
        return;
    };
    if video.sized_stream_count() != 0 {
        return;
    }

    match nexx_streams(transport, &video_id).await {
        Ok(streams) if streams.is_empty() => {
            tracing::debug!(video_id, "nexx knows no progressive streams");
        }
        Ok(streams) => {
            tracing::debug!(video_id, count = streams.len(), "Replacing streams by funk videos");
            video.replace_streams(streams);
        }
        Err(error) => {
            tracing::warn!(video_id, %error, "Could not replace media streams by funk videos");
        }
    }
}

fn funk_video_id(metadata_id: &str) -> Option<String> {
    FUNK_VIDEO_ID
        .captures(metadata_id)
        .map(|captures| captures[1].to_string())
}

async fn nexx_streams(transport: &dyn HttpTransport, video_id: &str) -> FeedResult<Vec<MediaStream>> {
    let cid = init_session(transport).await?;
    let stream_data = video_metadata(transport, video_id, &cid).await?;
    Ok(distribution_streams(&stream_data))
}

async fn init_session(transport: &dyn HttpTransport) -> FeedResult<String> {
    let url = format!("{NEXX_API_BASE}/{FUNK_DOMAIN_ID}/session/init");
    let form = vec![("nxp_devh".to_string(), device_id())];
    let body = transport.post_form(&url, &form, &[]).await?;

    let response: SessionInitResponse = serde_json::from_slice(&body)
        .map_err(|e| FeedError::RemediationFailed(format!("Invalid session response: {e}")))?;
    if response.result.general.cid.is_empty() {
        return Err(FeedError::RemediationFailed(
            "No cid from initializing session".to_string(),
        ));
    }
    Ok(response.result.general.cid)
}

async fn video_metadata(
    transport: &dyn HttpTransport,
    video_id: &str,
    cid: &str,
) -> FeedResult<StreamData> {
    let url = format!("{NEXX_API_BASE}/{FUNK_DOMAIN_ID}/videos/byid/{video_id}");
    let form: Vec<(String, String)> = [
        ("addStatusDetails", "1"),
        ("addStreamDetails", "1"),
        ("addFeatures", "1"),
        ("addCaptions", "1"),
        ("addBumpers", "1"),
        ("captionFormat", "data"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let headers = vec![
        ("x-request-cid".to_string(), cid.to_string()),
        ("x-request-token".to_string(), request_token()),
    ];
    let body = transport.post_form(&url, &form, &headers).await?;

    let response: VideoMetadataResponse = serde_json::from_slice(&body)
        .map_err(|e| FeedError::RemediationFailed(format!("Invalid video metadata: {e}")))?;
    Ok(response.result.streamdata)
}

/// `<unix seconds>:<random five digit number>`
fn device_id() -> String {
    format!("{}:{}", Utc::now().timestamp(), fastrand::u32(10000..100000))
}

fn request_token() -> String {
    let digest = Md5::digest(format!("byid{FUNK_DOMAIN_ID}{FUNK_DOMAIN_HASH}"));
    format!("{digest:x}")
}

pub(super) fn distribution_streams(data: &StreamData) -> Vec<MediaStream> {
    FILE_DISTRIBUTION
        .captures_iter(&data.azure_file_distribution)
        .map(|captures| {
            let url = format!(
                "https://{}{}/files/{}/{}/{}.mp4",
                data.cdn_shield_https, data.q_account, data.q_prefix, data.q_locator, &captures[3]
            );
            MediaStream {
                cdn: data.cdn_type.clone(),
                width: captures[1].parse().unwrap_or(0),
                height: captures[2].parse().unwrap_or(0),
                stream: StreamUrls(vec![url]),
            }
        })
        .collect()
}
