use chrono::{DateTime, FixedOffset, Utc};

pub const ITUNES_NAMESPACE: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
pub const RSS_VERSION: &str = "2.0";

/// Root of an RSS document.
///
/// Plain `String` fields that are empty are left out of the XML. `Option`
/// fields are left out when `None` and written (possibly empty) otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub channel: Channel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub title: String,
    /// Written as CDATA.
    pub description: Option<String>,
    pub link: String,
    pub last_build_date: Option<DateTime<Utc>>,
    pub image: Option<Image>,
    pub itunes_subtitle: String,
    pub itunes_author: String,
    /// Written as CDATA.
    pub itunes_summary: Option<String>,
    pub itunes_category: String,
    /// `href` of the `itunes:image` element.
    pub itunes_image: Option<String>,
    pub itunes_explicit: bool,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub link: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub guid: Option<Guid>,
    pub enclosure: Option<Enclosure>,
    pub itunes_duration: String,
    pub itunes_title: String,
    pub itunes_subtitle: String,
    pub itunes_summary: Option<String>,
    pub itunes_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Guid {
    pub value: String,
    pub is_perma_link: bool,
}

impl Guid {
    /// An opaque identifier that is not a URL.
    pub fn opaque(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_perma_link: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub length: Option<u64>,
}

/// Formats a duration the way podcast clients expect `itunes:duration`:
/// `S`, `M:SS` or `H:MM:SS`.
pub fn itunes_duration(seconds: u64) -> String {
    let secs = seconds % 60;
    let minutes = (seconds / 60) % 60;
    let hours = seconds / 3600;
    if hours == 0 && minutes == 0 {
        format!("{secs}")
    } else if hours == 0 {
        format!("{minutes}:{secs:02}")
    } else {
        format!("{hours}:{minutes:02}:{secs:02}")
    }
}
