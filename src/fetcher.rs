use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

/// Daily opinions listing and its RSS mirror. Both carry the same
/// badge + title pairs; RSS is the cheaper poll target.
pub const OPINIONS_URL: &str = "https://www.njcourts.gov/attorneys/opinions";
pub const OPINIONS_RSS_URL: &str = "https://www.njcourts.gov/attorneys/opinions/rss";

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());
static BADGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class="[^"]*badge[^"]*"[^>]*>([^<]+)<"#).unwrap()
});
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a[^>]*>(.*?)</a>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One listing entry: the short decision-type badge plus the raw title.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub badge: String,
    pub title: String,
}

pub async fn fetch_text(url: &str) -> Result<String> {
    info!("Fetching {}", url);
    let client = reqwest::Client::new();
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    Ok(body)
}

/// Pull (badge, title) pairs out of the opinions listing HTML. The page
/// structure is one `<li>` per announcement with a badge span and the
/// title inside the opinion link.
pub fn extract_announcements(html: &str) -> Vec<Announcement> {
    let mut out = Vec::new();
    for item in ITEM_RE.captures_iter(html) {
        let block = &item[1];
        let title = match ANCHOR_RE.captures(block) {
            Some(caps) => clean_fragment(&caps[1]),
            None => continue,
        };
        if title.is_empty() {
            continue;
        }
        let badge = BADGE_RE
            .captures(block)
            .map(|caps| clean_fragment(&caps[1]))
            .unwrap_or_default();
        out.push(Announcement { badge, title });
    }
    out
}

/// Parse an RSS feed whose item titles look like
/// "Unpublished Appellate: SMITH V. JONES (ESSEX COUNTY)".
pub fn parse_rss(xml: &str) -> Result<Vec<Announcement>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut items = Vec::new();
    let mut in_item = false;
    let mut in_title = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"item" => in_item = true,
                b"title" if in_item => in_title = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_title => {
                let raw = e.unescape()?.to_string();
                let (badge, title) = match raw.split_once(':') {
                    Some((b, t)) => (b.trim().to_string(), t.trim().to_string()),
                    None => (String::new(), raw.trim().to_string()),
                };
                if !title.is_empty() {
                    items.push(Announcement { badge, title });
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"title" => in_title = false,
                b"item" => in_item = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

fn clean_fragment(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    let text = text
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#160;", " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_badge_and_title() {
        let html = r#"
            <ul>
              <li><span class="badge">Unpublished Appellate</span>
                  <a href="/op/a0517-19.pdf">SMITH V. <b>JONES</b> (ESSEX COUNTY, L-0517-19)</a></li>
              <li><span class="badge">Supreme</span>
                  <a href="/op/a73-21.pdf">STATE V. ROE (A-73-21)</a></li>
            </ul>"#;
        let items = extract_announcements(html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].badge, "Unpublished Appellate");
        assert_eq!(items[0].title, "SMITH V. JONES (ESSEX COUNTY, L-0517-19)");
        assert_eq!(items[1].badge, "Supreme");
    }

    #[test]
    fn list_items_without_links_skipped() {
        let html = "<li>No opinions reported today</li>";
        assert!(extract_announcements(html).is_empty());
    }

    #[test]
    fn rss_titles_split_on_badge_prefix() {
        let xml = r#"<?xml version="1.0"?>
            <rss><channel>
              <title>Opinions</title>
              <item><title>Unpublished Appellate: SMITH V. JONES (L-0517-19)</title></item>
              <item><title>STATE V. ROE</title></item>
            </channel></rss>"#;
        let items = parse_rss(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].badge, "Unpublished Appellate");
        assert_eq!(items[0].title, "SMITH V. JONES (L-0517-19)");
        assert_eq!(items[1].badge, "");
        assert_eq!(items[1].title, "STATE V. ROE");
    }
}
