use std::fmt;

use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::app::{GatorError, Result};
use crate::domain::{ParsedFeed, ParsedItem};

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS 2.0 document and decode HTML entities in its text fields.
    ///
    /// Only unprefixed `title`, `link`, `description`, `item` and `pubDate`
    /// elements are read; `atom:link` and other extensions are skipped.
    /// Links and publish dates are passed through untouched.
    pub fn parse(&self, body: &[u8]) -> Result<ParsedFeed> {
        let mut feed = read_channel(body)?;

        feed.title = unescape(&feed.title);
        feed.description = unescape(&feed.description);
        for item in &mut feed.items {
            item.title = unescape(&item.title);
            item.description = unescape(&item.description);
        }

        Ok(feed)
    }
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
}

impl Field {
    fn from_name(name: &[u8], in_item: bool) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"pubDate" if in_item => Some(Field::PubDate),
            _ => None,
        }
    }
}

fn read_channel(body: &[u8]) -> Result<ParsedFeed> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    // Qualified names of the open elements, root first.
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut feed = ParsedFeed::default();
    let mut saw_channel = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                saw_channel |= opens_channel(&path, &name);
                if opens_item(&path, &name) {
                    feed.items.push(ParsedItem::default());
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                saw_channel |= opens_channel(&path, name.as_ref());
                if opens_item(&path, name.as_ref()) {
                    feed.items.push(ParsedItem::default());
                }
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(e)) => {
                if let Some(slot) = text_slot(&mut feed, &path) {
                    slot.push_str(&e.unescape().map_err(parse_error)?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(slot) = text_slot(&mut feed, &path) {
                    slot.push_str(std::str::from_utf8(&e).map_err(parse_error)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(parse_error(e)),
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(GatorError::Parse("unexpected end of document".into()));
    }
    if !saw_channel {
        return Err(GatorError::Parse("missing <channel> element".into()));
    }

    Ok(feed)
}

fn opens_channel(path: &[Vec<u8>], name: &[u8]) -> bool {
    path.len() == 1 && name == b"channel"
}

fn opens_item(path: &[Vec<u8>], name: &[u8]) -> bool {
    path.len() == 2 && path[1].as_slice() == b"channel" && name == b"item"
}

/// The string that text at `path` belongs to, if any.
fn text_slot<'a>(feed: &'a mut ParsedFeed, path: &[Vec<u8>]) -> Option<&'a mut String> {
    match path {
        [_, channel, name] if channel.as_slice() == b"channel" => {
            match Field::from_name(name, false)? {
                Field::Title => Some(&mut feed.title),
                Field::Link => Some(&mut feed.link),
                Field::Description => Some(&mut feed.description),
                Field::PubDate => None,
            }
        }
        [_, channel, item, name]
            if channel.as_slice() == b"channel" && item.as_slice() == b"item" =>
        {
            let item = feed.items.last_mut()?;
            match Field::from_name(name, true)? {
                Field::Title => Some(&mut item.title),
                Field::Link => Some(&mut item.link),
                Field::Description => Some(&mut item.description),
                Field::PubDate => Some(&mut item.pub_date),
            }
        }
        _ => None,
    }
}

fn parse_error(e: impl fmt::Display) -> GatorError {
    GatorError::Parse(e.to_string())
}

fn unescape(text: &str) -> String {
    decode_html_entities(text).into_owned()
}
