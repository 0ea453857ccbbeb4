//! Minimal RSS item extraction.
//!
//! The feeds this crate reads are plain RSS 2.0 with flat `<item>` blocks,
//! so a small scanner over the raw markup is enough; it handles CDATA
//! sections and the five core XML entities and nothing more.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
}

pub(crate) fn items(xml: &str) -> Vec<RawItem> {
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(fragment) = next_element(rest, "item") {
        out.push(RawItem {
            title: element_text(fragment.body, "title").unwrap_or_default(),
            link: element_text(fragment.body, "link").unwrap_or_default(),
            summary: element_text(fragment.body, "description").unwrap_or_default(),
            published: element_text(fragment.body, "pubDate").unwrap_or_default(),
        });
        rest = fragment.tail;
    }
    out
}

struct Fragment<'a> {
    body: &'a str,
    tail: &'a str,
}

/// First `<tag ...>body</tag>` element in `xml`, with the remainder after
/// the closing tag. Nested same-name elements are not supported.
fn next_element<'a>(xml: &'a str, tag: &str) -> Option<Fragment<'a>> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut search_from = 0;
    loop {
        let start = xml[search_from..].find(&open)? + search_from;
        let after_name = start + open.len();
        // Reject prefixes such as <itemref> when looking for <item>.
        match xml[after_name..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') => {}
            _ => {
                search_from = after_name;
                continue;
            }
        }
        let body_start = xml[after_name..].find('>')? + after_name + 1;
        let body_end = xml[body_start..].find(&close)? + body_start;
        return Some(Fragment {
            body: &xml[body_start..body_end],
            tail: &xml[body_end + close.len()..],
        });
    }
}

fn element_text(fragment: &str, tag: &str) -> Option<String> {
    let element = next_element(fragment, tag)?;
    Some(decode_text(element.body.trim()))
}

/// Strips one CDATA wrapper and decodes the core entities.
fn decode_text(raw: &str) -> String {
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
        .unwrap_or(raw);

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let entity = &rest[idx..];
        let (decoded, consumed) = if entity.starts_with("&amp;") {
            ('&', "&amp;".len())
        } else if entity.starts_with("&lt;") {
            ('<', "&lt;".len())
        } else if entity.starts_with("&gt;") {
            ('>', "&gt;".len())
        } else if entity.starts_with("&quot;") {
            ('"', "&quot;".len())
        } else if entity.starts_with("&#39;") {
            ('\'', "&#39;".len())
        } else {
            ('&', 1)
        };
        out.push(decoded);
        rest = &rest[idx + consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_text, items};

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
<title>Free games!</title>
<item>
  <title>Free Game A</title>
  <link>https://community.example.com/announcements/a</link>
  <description><![CDATA[Grab it now &amp; enjoy<br>Offer good through December 21, 1600 GMT<br>]]></description>
  <pubDate>Wed, 30 Dec 2020 16:00:01 +0000</pubDate>
</item>
<item>
  <title>Free Game B &amp; Friends</title>
  <link>https://community.example.com/announcements/b</link>
  <description>plain body</description>
  <pubDate>Thu, 31 Dec 2020 09:00:00 +0000</pubDate>
</item>
</channel>
</rss>
"#;

    #[test]
    fn extracts_every_item_with_its_fields() {
        let parsed = items(SAMPLE);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].title, "Free Game A");
        assert_eq!(parsed[0].link, "https://community.example.com/announcements/a");
        assert_eq!(parsed[0].published, "Wed, 30 Dec 2020 16:00:01 +0000");
        assert!(parsed[0].summary.contains("Offer good through"));
        assert_eq!(parsed[1].title, "Free Game B & Friends");
        assert_eq!(parsed[1].summary, "plain body");
    }

    #[test]
    fn cdata_wrapper_is_stripped_and_entities_decoded() {
        assert_eq!(decode_text("<![CDATA[a &amp; b]]>"), "a & b");
        assert_eq!(decode_text("x &lt;br&gt; &quot;y&quot; &#39;z&#39;"), "x <br> \"y\" 'z'");
        assert_eq!(decode_text("lone & ampersand"), "lone & ampersand");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let parsed = items("<item><title>only title</title></item>");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "only title");
        assert!(parsed[0].link.is_empty());
        assert!(parsed[0].summary.is_empty());
    }

    #[test]
    fn channel_title_is_not_mistaken_for_an_item() {
        let parsed = items(SAMPLE);
        assert!(parsed.iter().all(|item| item.title != "Free games!"));
    }
}
