use chrono::{DateTime, Utc};
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

use super::fetcher::FetchError;

/// `pubDate` layout used by RSS 2.0 feeds: RFC 1123 with a numeric zone
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Parsed `<channel>` of an RSS document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

/// One `<item>` of a channel, in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Raw `pubDate` text, see [`parse_pub_date`]
    pub pub_date: String,
}

/// Parse an RSS 2.0 document.
///
/// Only `title`, `link`, `description` and `pubDate` directly under the first
/// `channel` (or under its `item`s) are read. Prefixed names such as
/// `atom:link` are different elements and are ignored. Title and description
/// are HTML-unescaped after XML decoding since many feeds double-escape them.
pub fn parse_rss(content: &[u8]) -> Result<RssFeed, FetchError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| FetchError::Parse(format!("document is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut buf = String::new();
    let mut feed = RssFeed::default();
    let mut item: Option<RssItem> = None;
    let mut channel_seen = false;
    let mut channel_done = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if !channel_done {
                    if name == b"channel" && !channel_seen {
                        channel_seen = true;
                    } else if name == b"item" && parent_is(&stack, b"channel") {
                        item = Some(RssItem::default());
                    }
                }
                stack.push(name);
                // A field starts empty; markup nested in it keeps the text so far
                if in_field(&stack) {
                    buf.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                // `<item/>` still counts as an (empty) item
                if !channel_done && e.name().as_ref() == b"item" && parent_is(&stack, b"channel") {
                    feed.items.push(RssItem::default());
                }
            }
            // Only a field's own character data counts, not that of nested markup
            Ok(Event::Text(e)) if in_field(&stack) => buf.push_str(&decode_text(&e)),
            Ok(Event::CData(e)) if in_field(&stack) => {
                buf.push_str(&String::from_utf8_lossy(&e))
            }
            Ok(Event::End(_)) => {
                let Some(name) = stack.pop() else {
                    return Err(FetchError::Parse("unbalanced closing tag".to_string()));
                };

                if channel_seen && !channel_done {
                    let value = buf.trim();
                    match name.as_slice() {
                        b"channel" => channel_done = true,
                        b"item" if parent_is(&stack, b"channel") => {
                            if let Some(done) = item.take() {
                                feed.items.push(done);
                            }
                        }
                        field if parent_is(&stack, b"item") => {
                            if let Some(ref mut current) = item {
                                assign_item_field(current, field, value);
                            }
                        }
                        field if parent_is(&stack, b"channel") => {
                            assign_channel_field(&mut feed, field, value);
                        }
                        _ => {}
                    }
                }
                if !in_field(&stack) {
                    buf.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FetchError::Parse("unexpected end of document".to_string()));
    }
    if !channel_seen {
        return Err(FetchError::Parse("missing <channel> element".to_string()));
    }

    feed.title = unescape_html(&feed.title);
    feed.description = unescape_html(&feed.description);
    for item in &mut feed.items {
        item.title = unescape_html(&item.title);
        item.description = unescape_html(&item.description);
    }

    Ok(feed)
}

/// Parse an item's `pubDate`.
///
/// Tries the numeric-zone layout first, then general RFC 2822 (named zones
/// like `GMT`). Empty or unparseable input yields `None`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_str(raw, PUB_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn parent_is(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.last().map(|n| n.as_slice() == name).unwrap_or(false)
}

/// Whether the innermost open element is a direct field of `channel` or `item`
fn in_field(stack: &[Vec<u8>]) -> bool {
    match stack {
        [.., parent, current] => {
            current.as_slice() != b"item"
                && matches!(parent.as_slice(), b"channel" | b"item")
        }
        _ => false,
    }
}

fn decode_text(e: &BytesText<'_>) -> String {
    match e.unescape() {
        Ok(text) => text.into_owned(),
        // HTML-only entities such as `&nbsp;` are not valid XML. The HTML
        // decoder also knows the XML ones, so nothing in the run stays escaped.
        Err(_) => unescape_html(&String::from_utf8_lossy(e)),
    }
}

fn assign_channel_field(feed: &mut RssFeed, field: &[u8], value: &str) {
    match field {
        b"title" => feed.title = value.to_string(),
        b"link" => feed.link = value.to_string(),
        b"description" => feed.description = value.to_string(),
        _ => {}
    }
}

fn assign_item_field(item: &mut RssItem, field: &[u8], value: &str) {
    match field {
        b"title" => item.title = value.to_string(),
        b"link" => item.link = value.to_string(),
        b"description" => item.description = value.to_string(),
        b"pubDate" => item.pub_date = value.to_string(),
        _ => {}
    }
}

fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
  <title>Boot.dev Blog</title>
  <link>https://blog.boot.dev/</link>
  <atom:link href="https://blog.boot.dev/index.xml" rel="self" type="application/rss+xml"/>
  <description>Recent content on Boot.dev Blog</description>
  <item>
    <title>The Zen of Proverbs</title>
    <link>https://blog.boot.dev/zen</link>
    <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
    <description>20 rules of thumb &amp;amp; more</description>
  </item>
  <item>
    <title><![CDATA[Learn <Go>]]></title>
    <link>
      https://blog.boot.dev/go
    </link>
    <pubDate>not a date</pubDate>
    <description>It&amp;#39;s &amp;quot;fun&amp;quot;</description>
  </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_channel_and_items() {
        let feed = parse_rss(SAMPLE_RSS.as_bytes()).unwrap();

        assert_eq!(feed.title, "Boot.dev Blog");
        assert_eq!(feed.link, "https://blog.boot.dev/");
        assert_eq!(feed.description, "Recent content on Boot.dev Blog");
        assert_eq!(feed.items.len(), 2);

        assert_eq!(feed.items[0].title, "The Zen of Proverbs");
        assert_eq!(feed.items[0].link, "https://blog.boot.dev/zen");
        assert_eq!(feed.items[0].pub_date, "Mon, 02 Jan 2006 15:04:05 -0700");

        assert_eq!(feed.items[1].title, "Learn <Go>");
        assert_eq!(feed.items[1].link, "https://blog.boot.dev/go");
    }

    #[test]
    fn test_double_escaped_text_is_unescaped() {
        let feed = parse_rss(SAMPLE_RSS.as_bytes()).unwrap();

        assert_eq!(feed.items[0].description, "20 rules of thumb & more");
        assert_eq!(feed.items[1].description, "It's \"fun\"");
    }

    #[test]
    fn test_html_only_entities() {
        let doc = r#"<rss><channel><title>A&nbsp;B</title></channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "A\u{a0}B");
    }

    #[test]
    fn test_html_only_entity_next_to_double_escaped_text() {
        let doc = r#"<rss><channel><item>
            <title>Tom&nbsp;&amp;amp;&nbsp;Jerry</title>
            <description>5 &lt; 6&nbsp;&amp;lt;b&amp;gt;</description>
        </item></channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();
        assert_eq!(feed.items[0].title, "Tom\u{a0}&\u{a0}Jerry");
        assert_eq!(feed.items[0].description, "5 < 6\u{a0}<b>");
    }

    #[test]
    fn test_nested_markup_keeps_surrounding_text() {
        let doc = r#"<rss><channel>
            <title>Chan <i>nel</i> name</title>
            <item>
                <title>Post</title>
                <description>Hello <b>world</b> again</description>
                <link>https://example.com/<span>x</span>post</link>
            </item>
        </channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();

        assert_eq!(feed.title, "Chan  name");
        assert_eq!(feed.items[0].title, "Post");
        assert_eq!(feed.items[0].description, "Hello  again");
        assert_eq!(feed.items[0].link, "https://example.com/post");
    }

    #[test]
    fn test_nested_element_does_not_leak_into_next_field() {
        let doc = r#"<rss><channel><item>
            <description>before <p>inner</p></description>
            <title>Next</title>
        </item></channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();

        assert_eq!(feed.items[0].description, "before");
        assert_eq!(feed.items[0].title, "Next");
    }

    #[test]
    fn test_empty_channel() {
        let doc = r#"<rss version="2.0"><channel><title>Quiet</title></channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "Quiet");
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_item_fields_do_not_leak_into_channel() {
        let doc = r#"<rss><channel>
            <item><title>item title</title></item>
        </channel></rss>"#;
        let feed = parse_rss(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "");
        assert_eq!(feed.items[0].title, "item title");
    }

    #[test]
    fn test_missing_channel_is_parse_error() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>x</title></feed>"#;
        assert!(matches!(parse_rss(atom.as_bytes()), Err(FetchError::Parse(_))));

        assert!(matches!(parse_rss(b"plain text"), Err(FetchError::Parse(_))));
        assert!(matches!(parse_rss(b""), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let mismatched = "<rss><channel><title>x</channel></rss>";
        assert!(matches!(parse_rss(mismatched.as_bytes()), Err(FetchError::Parse(_))));

        let truncated = "<rss><channel><title>x</title>";
        assert!(matches!(parse_rss(truncated.as_bytes()), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_parse_pub_date_numeric_zone() {
        let parsed = parse_pub_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_pub_date_named_zone() {
        let parsed = parse_pub_date("Tue, 10 Jun 2003 04:00:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2003, 6, 10, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_absent() {
        assert_eq!(parse_pub_date(""), None);
        assert_eq!(parse_pub_date("   "), None);
        assert_eq!(parse_pub_date("yesterday"), None);
        assert_eq!(parse_pub_date("2006-01-02"), None);
    }
}
