//! RSS 2.0 and Atom parsing into raw hits.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use presswatch_core::RawHit;

use crate::error::FeedError;
use crate::text::clean_text;

pub const PROVIDER: &str = "google-alerts-rss";

const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Published,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" | b"summary" | b"content" | b"encoded" => Some(Self::Summary),
            b"pubDate" | b"published" | b"updated" | b"date" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: String,
    link: String,
    summary: String,
    published: String,
}

impl EntryBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Summary => &mut self.summary,
            Field::Published => &mut self.published,
        };
        target.push_str(text);
    }

    fn take_href(&mut self, element: &BytesStart<'_>) {
        if !self.link.is_empty() {
            return;
        }
        let mut href = None;
        let mut alternate = true;
        for attr in element.attributes().flatten() {
            let value = attr.unescape_value().unwrap_or_default();
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value.into_owned()),
                b"rel" => alternate = value == "alternate",
                _ => {}
            }
        }
        if let Some(href) = href.filter(|_| alternate) {
            self.link = href;
        }
    }

    fn finish(self) -> Option<RawHit> {
        let link = self.link.trim();
        if link.is_empty() {
            return None;
        }
        let title = clean_text(&self.title);
        let published = self.published.trim();
        Some(RawHit {
            title: if title.is_empty() {
                UNTITLED.to_string()
            } else {
                title
            },
            url: unwrap_google_redirect(link),
            snippet: clean_text(&self.summary),
            published_at: (!published.is_empty()).then(|| published.to_string()),
            provider: PROVIDER.to_string(),
        })
    }
}

/// Parse an RSS `<item>` or Atom `<entry>` feed into [`RawHit`]s.
///
/// Titles and summaries are entity-decoded and stripped of markup; entries
/// without a link are dropped. Google redirect links are replaced by their
/// target.
///
/// # Errors
///
/// Returns [`FeedError::Xml`] if the XML is malformed.
pub fn parse_feed(xml: &str) -> Result<Vec<RawHit>, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut hits = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    // Only the first <published>/<updated>/<pubDate> of an entry counts.
    let mut published_seen = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = e.local_name();
                let name = local.as_ref();
                if name == b"item" || name == b"entry" {
                    entry = Some(EntryBuilder::default());
                    field = None;
                    published_seen = false;
                } else if let Some(current) = entry.as_mut() {
                    if name == b"link" {
                        current.take_href(&e);
                    }
                    if field.is_none() {
                        field = Field::from_local_name(name).filter(|f| {
                            *f != Field::Published || !published_seen
                        });
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(current) = entry.as_mut() {
                    if e.local_name().as_ref() == b"link" {
                        current.take_href(&e);
                    }
                }
            }
            Event::End(e) => {
                let local = e.local_name();
                let name = local.as_ref();
                if name == b"item" || name == b"entry" {
                    if let Some(hit) = entry.take().and_then(EntryBuilder::finish) {
                        hits.push(hit);
                    }
                    field = None;
                } else if field.is_some() && Field::from_local_name(name) == field {
                    if field == Some(Field::Published) {
                        published_seen = true;
                    }
                    field = None;
                }
            }
            Event::Text(e) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = e.unescape().unwrap_or_default();
                    append(current, f, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(current), Some(f)) = (entry.as_mut(), field) {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    append(current, f, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(hits)
}

fn append(entry: &mut EntryBuilder, field: Field, text: &str) {
    if field == Field::Summary || field == Field::Title {
        entry.push(field, " ");
    }
    entry.push(field, text);
}

/// Google Alerts wraps every article in `https://www.google.com/url?...&url=<target>`.
#[must_use]
pub fn unwrap_google_redirect(link: &str) -> String {
    let Ok(parsed) = Url::parse(link) else {
        return link.to_string();
    };
    let is_google = parsed
        .host_str()
        .is_some_and(|host| host.to_lowercase().contains("google.com"));
    if !is_google {
        return link.to_string();
    }
    parsed
        .query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, target)| target.into_owned())
        .filter(|target| !target.is_empty())
        .unwrap_or_else(|| link.to_string())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
