use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::model::{Channel, Feed, ITUNES_NAMESPACE, Image, Item, RSS_VERSION};
use crate::error::{FeedError, FeedResult};

type XmlWriter = Writer<Vec<u8>>;

impl Feed {
    /// Serializes the feed with an XML declaration and four-space indentation.
    pub fn to_xml(&self) -> FeedResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(BytesStart::new("rss").with_attributes([
            ("xmlns:itunes", ITUNES_NAMESPACE),
            ("version", RSS_VERSION),
        ])))?;
        write_channel(&mut writer, &self.channel)?;
        writer.write_event(Event::End(BytesEnd::new("rss")))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| FeedError::Serialization(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

fn write_channel(w: &mut XmlWriter, channel: &Channel) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(w, "title", &channel.title)?;
    if let Some(description) = &channel.description {
        cdata_element(w, "description", description)?;
    }
    optional_text_element(w, "link", &channel.link)?;
    if let Some(date) = &channel.last_build_date {
        text_element(w, "lastBuildDate", &date.to_rfc2822())?;
    }
    if let Some(image) = &channel.image {
        write_image(w, image)?;
    }
    optional_text_element(w, "itunes:subtitle", &channel.itunes_subtitle)?;
    optional_text_element(w, "itunes:author", &channel.itunes_author)?;
    if let Some(summary) = &channel.itunes_summary {
        cdata_element(w, "itunes:summary", summary)?;
    }
    if !channel.itunes_category.is_empty() {
        w.create_element("itunes:category")
            .with_attribute(("text", channel.itunes_category.as_str()))
            .write_empty()?;
    }
    if let Some(href) = &channel.itunes_image {
        itunes_image(w, href)?;
    }
    text_element(
        w,
        "itunes:explicit",
        if channel.itunes_explicit { "true" } else { "false" },
    )?;

    for item in &channel.items {
        write_item(w, item)?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))
}

fn write_image(w: &mut XmlWriter, image: &Image) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new("image")))?;
    text_element(w, "url", &image.url)?;
    optional_text_element(w, "title", &image.title)?;
    optional_text_element(w, "link", &image.link)?;
    if let Some(width) = image.width {
        text_element(w, "width", &width.to_string())?;
    }
    if let Some(height) = image.height {
        text_element(w, "height", &height.to_string())?;
    }
    w.write_event(Event::End(BytesEnd::new("image")))
}

fn write_item(w: &mut XmlWriter, item: &Item) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new("item")))?;

    text_element(w, "title", &item.title)?;
    optional_text_element(w, "link", &item.link)?;
    if let Some(description) = &item.description {
        cdata_element(w, "description", description)?;
    }
    if let Some(date) = &item.pub_date {
        text_element(w, "pubDate", &date.to_rfc2822())?;
    }
    if let Some(guid) = &item.guid {
        w.create_element("guid")
            .with_attribute(("isPermaLink", if guid.is_perma_link { "true" } else { "false" }))
            .write_text_content(BytesText::new(&guid.value))?;
    }
    if let Some(enclosure) = &item.enclosure {
        let length = enclosure.length.map(|l| l.to_string());
        let mut element = w
            .create_element("enclosure")
            .with_attribute(("url", enclosure.url.as_str()))
            .with_attribute(("type", enclosure.mime_type.as_str()));
        if let Some(length) = &length {
            element = element.with_attribute(("length", length.as_str()));
        }
        element.write_empty()?;
    }
    optional_text_element(w, "itunes:duration", &item.itunes_duration)?;
    optional_text_element(w, "itunes:title", &item.itunes_title)?;
    optional_text_element(w, "itunes:subtitle", &item.itunes_subtitle)?;
    if let Some(summary) = &item.itunes_summary {
        cdata_element(w, "itunes:summary", summary)?;
    }
    if let Some(href) = &item.itunes_image {
        itunes_image(w, href)?;
    }

    w.write_event(Event::End(BytesEnd::new("item")))
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> io::Result<()> {
    w.create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn optional_text_element(w: &mut XmlWriter, name: &str, text: &str) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    text_element(w, name, text)
}

fn itunes_image(w: &mut XmlWriter, href: &str) -> io::Result<()> {
    w.create_element("itunes:image")
        .with_attribute(("href", href))
        .write_empty()?;
    Ok(())
}

/// Writes `text` as CDATA. A literal `]]>` cannot appear inside one section,
/// so it is split across two.
fn cdata_element(w: &mut XmlWriter, name: &str, text: &str) -> io::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    let pieces: Vec<&str> = text.split("]]>").collect();
    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        let mut section = String::with_capacity(piece.len() + 3);
        if i > 0 {
            section.push('>');
        }
        section.push_str(piece);
        if i < last {
            section.push_str("]]");
        }
        w.write_event(Event::CData(BytesCData::new(section)))?;
    }
    w.write_event(Event::End(BytesEnd::new(name)))
}
