//! Picking the best image and video rendition out of what an upstream offers.
//!
//! Everything here is pure. Candidate maps are `(label, value)` pairs in the
//! order the upstream document listed them, so "first seen" is well defined.

use std::sync::LazyLock;

use regex::Regex;

static DIMENSIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]+)x([0-9]+)").unwrap());

static BITRATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[0-9]+k_p[0-9]+v[0-9]+\.mp4$").unwrap());

pub const PREFERRED_ASPECT_RATIO: &str = "16x9";

/// Known high-bitrate renditions, lowest priority first.
pub const UPGRADE_SUFFIXES: [&str; 7] = [
    "3256k_p15v12.mp4",
    "3296k_p15v13.mp4",
    "3328k_p36v12.mp4",
    "3328k_p36v13.mp4",
    "3328k_p36v14.mp4",
    "3328k_p35v14.mp4",
    "3360k_p36v15.mp4",
];

const QUALITY_PREFERENCE: [&str; 3] = ["veryhigh", "high", "low"];

/// Pixel area described by a `WIDTHxHEIGHT` label, 0 for anything else.
pub fn image_area(label: &str) -> u64 {
    let Some(captures) = DIMENSIONS.captures(label) else {
        return 0;
    };
    let width: u64 = captures[1].parse().unwrap_or(0);
    let height: u64 = captures[2].parse().unwrap_or(0);
    width.saturating_mul(height)
}

/// URL of the largest image. Ties keep the earlier entry; if no label has a
/// usable size the result is empty.
pub fn best_image_by_area(images: &[(String, String)]) -> &str {
    let mut biggest_area = 0;
    let mut best_url = "";
    for (label, url) in images {
        let area = image_area(label);
        if area > biggest_area {
            biggest_area = area;
            best_url = url;
        }
    }
    best_url
}

/// The candidate labelled "16x9", or the first candidate when there is none.
pub fn preferred_aspect_image<T>(images: &[(String, T)]) -> Option<&T> {
    images
        .iter()
        .find(|(label, _)| label == PREFERRED_ASPECT_RATIO)
        .or_else(|| images.first())
        .map(|(_, image)| image)
}

/// URL of the mp4 rendition whose width is closest to `target`.
///
/// `streams` yields each rendition's width with the URLs it is served from.
/// A rendition has to be strictly closer than the current best to replace it,
/// and the search starts from an imaginary rendition of width 0. Within a
/// closer rendition every URL containing "mp4" is taken in turn, so the last
/// one wins. Returns an empty string if nothing qualifies.
pub fn nearest_width_url<'a, I, U>(target: i64, streams: I) -> &'a str
where
    I: IntoIterator<Item = (i64, U)>,
    U: IntoIterator<Item = &'a str>,
{
    let mut best_width = 0;
    let mut best_url = "";
    for (width, urls) in streams {
        let closer = target.abs_diff(width) < target.abs_diff(best_width);
        for url in urls {
            if closer && url.contains("mp4") {
                best_width = width;
                best_url = url;
            }
        }
    }
    best_url
}

/// Records `url` for `tier`; a later URL for the same tier replaces the
/// earlier one but keeps its position.
pub fn insert_tier(tiers: &mut Vec<(String, String)>, tier: &str, url: &str) {
    match tiers.iter_mut().find(|(label, _)| label == tier) {
        Some(entry) => entry.1 = url.to_string(),
        None => tiers.push((tier.to_string(), url.to_string())),
    }
}

/// Picks "veryhigh", then "high", then "low", then whatever comes first.
/// Returns the chosen tier together with its URL.
pub fn quality_tier_url(tiers: &[(String, String)]) -> Option<(&str, &str)> {
    QUALITY_PREFERENCE
        .iter()
        .find_map(|wanted| tiers.iter().find(|(tier, _)| tier == wanted))
        .or_else(|| tiers.first())
        .map(|(tier, url)| (tier.as_str(), url.as_str()))
}

/// URLs worth probing for a higher bitrate version of `url`, best first.
///
/// `None` when the file name does not follow the `_<bitrate>k_p<N>v<M>.mp4`
/// naming scheme.
pub fn upgrade_candidates(url: &str) -> Option<Vec<String>> {
    let suffix = BITRATE_SUFFIX.find(url)?;
    let prefix = &url[..suffix.start()];
    Some(
        UPGRADE_SUFFIXES
            .iter()
            .rev()
            .map(|candidate| format!("{prefix}_{candidate}"))
            .collect(),
    )
}
