// src/fetch/parse.rs
//! Unified parsing of the two upstream response shapes: an RSS item list and
//! a JSON `{items:[...]}` body. Both produce the same `NewsRecord` sequence;
//! the caller selects the format by content type, not by sniffing inline.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;

use crate::types::NewsRecord;

/// Upstream body format, decided by the transport from the content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Rss,
    Json,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<RssSource>,
}

/// `<source url="…">연합뉴스</source>` — the display name is the text node.
#[derive(Debug, Deserialize)]
struct RssSource {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "$text")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonBody {
    #[serde(default)]
    items: Vec<JsonItem>,
}

#[derive(Debug, Deserialize)]
struct JsonItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "originallink")]
    original_link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse a response body into records attributed to `search_term`.
///
/// Missing optional fields degrade to defaults: no `source` leaves the
/// publisher unresolved, no `pubDate` defers to the date stage's "now"
/// fallback. Items without a link are dropped — a record without a URL has
/// no identity downstream.
pub fn parse_response(body: &str, format: ResponseFormat, search_term: &str) -> Result<Vec<NewsRecord>> {
    match format {
        ResponseFormat::Rss => parse_rss(body, search_term),
        ResponseFormat::Json => parse_json(body, search_term),
    }
}

fn parse_rss(body: &str, search_term: &str) -> Result<Vec<NewsRecord>> {
    let xml = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml).context("parsing rss feed xml")?;

    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let Some(link) = it.link.filter(|l| !l.trim().is_empty()) else {
            continue;
        };
        let publisher = it.source.as_ref().and_then(|s| s.name.clone());
        let original_url = it.source.as_ref().and_then(|s| s.url.clone());
        out.push(NewsRecord {
            title: clean_text(it.title.as_deref().unwrap_or_default()),
            url: link.trim().to_string(),
            original_url,
            published_at: None,
            raw_date: it.pub_date,
            summary: clean_text(it.description.as_deref().unwrap_or_default()),
            search_term: search_term.to_string(),
            publisher,
            category: None,
            clean_title: None,
        });
    }
    Ok(out)
}

fn parse_json(body: &str, search_term: &str) -> Result<Vec<NewsRecord>> {
    let parsed: JsonBody = serde_json::from_str(body).context("parsing json feed body")?;

    let mut out = Vec::with_capacity(parsed.items.len());
    for it in parsed.items {
        let Some(link) = it.link.filter(|l| !l.trim().is_empty()) else {
            continue;
        };
        out.push(NewsRecord {
            title: clean_text(it.title.as_deref().unwrap_or_default()),
            url: link.trim().to_string(),
            original_url: it.original_link.filter(|l| !l.trim().is_empty()),
            published_at: None,
            raw_date: it.pub_date,
            summary: clean_text(it.description.as_deref().unwrap_or_default()),
            search_term: search_term.to_string(),
            publisher: None,
            category: None,
            clean_title: None,
        });
    }
    Ok(out)
}

/// Decode HTML entities, strip tags, collapse whitespace. Feed titles and
/// descriptions routinely carry `<b>` highlighting and `&quot;` entities.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Feeds embed bare HTML entities that are not valid XML; replace the usual
/// suspects before handing the body to the XML parser.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>검색 결과</title>
  <item>
    <title>삼성전자, 1분기 &lt;b&gt;실적&lt;/b&gt; 발표 - 연합뉴스</title>
    <link>https://news.example.com/a/1</link>
    <pubDate>Tue, 07 May 2024 03:00:00 GMT</pubDate>
    <description>&lt;p&gt;영업이익이&amp;nbsp;증가했다&lt;/p&gt;</description>
    <source url="https://www.yna.co.kr">연합뉴스</source>
  </item>
  <item>
    <title>링크 없는 기사</title>
    <pubDate>Tue, 07 May 2024 04:00:00 GMT</pubDate>
  </item>
  <item>
    <title>날짜 없는 기사</title>
    <link>https://news.example.com/a/2</link>
  </item>
</channel></rss>"#;

    const JSON_FIXTURE: &str = r#"{
      "lastBuildDate": "Tue, 07 May 2024 12:00:00 +0900",
      "total": 2, "start": 1, "display": 2,
      "items": [
        {"title": "SK하이닉스 <b>HBM</b> 증설", "originallink": "https://www.mk.co.kr/b/2",
         "link": "https://n.news.naver.com/mnews/article/009/0005300000",
         "description": "고대역폭 메모리 투자 확대", "pubDate": "Tue, 07 May 2024 09:30:00 +0900"},
        {"title": "링크 없음", "description": "무시됨"}
      ]
    }"#;

    #[test]
    fn rss_items_parse_with_source_and_cleaned_text() {
        let out = parse_response(RSS_FIXTURE, ResponseFormat::Rss, "삼성").unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "삼성전자, 1분기 실적 발표 - 연합뉴스");
        assert_eq!(out[0].summary, "영업이익이 증가했다");
        assert_eq!(out[0].publisher.as_deref(), Some("연합뉴스"));
        assert_eq!(out[0].original_url.as_deref(), Some("https://www.yna.co.kr"));
        assert_eq!(out[0].search_term, "삼성");
        assert!(out[0].published_at.is_none());
    }

    #[test]
    fn rss_items_without_link_are_dropped_and_missing_date_degrades() {
        let out = parse_response(RSS_FIXTURE, ResponseFormat::Rss, "삼성").unwrap();
        assert!(out.iter().all(|r| !r.url.is_empty()));
        let undated = out.iter().find(|r| r.title == "날짜 없는 기사").unwrap();
        assert!(undated.raw_date.is_none());
        assert!(undated.publisher.is_none());
    }

    #[test]
    fn json_items_parse_with_original_link() {
        let out = parse_response(JSON_FIXTURE, ResponseFormat::Json, "HBM").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "SK하이닉스 HBM 증설");
        assert_eq!(out[0].original_url.as_deref(), Some("https://www.mk.co.kr/b/2"));
        assert_eq!(
            out[0].raw_date.as_deref(),
            Some("Tue, 07 May 2024 09:30:00 +0900")
        );
    }

    #[test]
    fn malformed_bodies_error_instead_of_panicking() {
        assert!(parse_response("<rss><channel>", ResponseFormat::Rss, "q").is_err());
        assert!(parse_response("{not json", ResponseFormat::Json, "q").is_err());
    }

    #[test]
    fn empty_item_lists_are_fine() {
        let out = parse_response(
            r#"<rss><channel><title>t</title></channel></rss>"#,
            ResponseFormat::Rss,
            "q",
        )
        .unwrap();
        assert!(out.is_empty());
        let out = parse_response(r#"{"items": []}"#, ResponseFormat::Json, "q").unwrap();
        assert!(out.is_empty());
    }
}
