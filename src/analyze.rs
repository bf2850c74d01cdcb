// src/analyze.rs
//! Seam to the downstream generative text-analysis collaborator. The
//! pipeline's contract stops at producing the bounded candidate list plus
//! enough per-record metadata to cite sources; the collaborator itself is an
//! opaque function behind the `Analyst` trait, so tests and callers without
//! a provider plug in a mock or the disabled stub.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::NewsRecord;

/// One entry of the serialized candidate list handed to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateEntry {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub summary: String,
}

/// A selection returned by the collaborator; free-text responses that fail
/// structured parsing degrade to `reason` carrying the raw text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selection {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub importance: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Downstream collaborator: candidate list in, selections out.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn select(&self, candidates: &[NewsRecord]) -> Result<Vec<Selection>>;
    /// Name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Serialize candidates to the JSON shape the collaborator receives:
/// title, url, date, publisher, summary per record.
pub fn candidates_as_json(records: &[NewsRecord]) -> Result<String> {
    let entries: Vec<CandidateEntry> = records.iter().map(entry_of).collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Plain-text rendition, one candidate per block, for prompt templates that
/// take prose instead of JSON.
pub fn candidates_as_text(records: &[NewsRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        let e = entry_of(r);
        out.push_str(&format!(
            "{}. {} ({}, {})\n   {}\n   {}\n",
            i + 1,
            e.title,
            e.publisher.as_deref().unwrap_or("-"),
            e.date.as_deref().unwrap_or("-"),
            e.url,
            e.summary,
        ));
    }
    out
}

fn entry_of(r: &NewsRecord) -> CandidateEntry {
    CandidateEntry {
        title: r.comparable_title().to_string(),
        url: r.url.clone(),
        date: r.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
        publisher: r.publisher.clone(),
        summary: r.summary.clone(),
    }
}

/// Parse a collaborator response: structured JSON when it is, otherwise a
/// single free-text selection wrapping the raw response.
pub fn parse_selection_response(raw: &str) -> Vec<Selection> {
    if let Ok(list) = serde_json::from_str::<Vec<Selection>>(raw) {
        return list;
    }
    #[derive(Deserialize)]
    struct Wrapped {
        #[serde(rename = "selected_news")]
        selected: Vec<Selection>,
    }
    if let Ok(w) = serde_json::from_str::<Wrapped>(raw) {
        return w.selected;
    }
    let text = raw.trim();
    if text.is_empty() {
        return Vec::new();
    }
    vec![Selection {
        title: String::new(),
        url: String::new(),
        importance: None,
        reason: Some(text.to_string()),
    }]
}

/// Stub used when no collaborator is configured: selects nothing.
pub struct DisabledAnalyst;

#[async_trait]
impl Analyst for DisabledAnalyst {
    async fn select(&self, _candidates: &[NewsRecord]) -> Result<Vec<Selection>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic mock: selects the first `take` candidates verbatim.
pub struct MockAnalyst {
    pub take: usize,
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn select(&self, candidates: &[NewsRecord]) -> Result<Vec<Selection>> {
        Ok(candidates
            .iter()
            .take(self.take)
            .map(|r| Selection {
                title: r.comparable_title().to_string(),
                url: r.url.clone(),
                importance: None,
                reason: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn record(title: &str, url: &str) -> NewsRecord {
        NewsRecord {
            title: title.to_string(),
            url: url.to_string(),
            original_url: None,
            published_at: Some(
                FixedOffset::east_opt(9 * 3600)
                    .unwrap()
                    .with_ymd_and_hms(2024, 5, 7, 9, 0, 0)
                    .unwrap(),
            ),
            raw_date: None,
            summary: "요약".to_string(),
            search_term: "삼성".to_string(),
            publisher: Some("연합뉴스".to_string()),
            category: None,
            clean_title: None,
        }
    }

    #[test]
    fn candidates_serialize_with_citation_fields() {
        let json = candidates_as_json(&[record("제목", "https://a/1")]).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v[0]["title"], "제목");
        assert_eq!(v[0]["url"], "https://a/1");
        assert_eq!(v[0]["date"], "2024-05-07");
        assert_eq!(v[0]["publisher"], "연합뉴스");
    }

    #[test]
    fn structured_and_free_text_responses_both_parse() {
        let structured = r#"[{"title":"t","url":"https://a/1","importance":"상"}]"#;
        let parsed = parse_selection_response(structured);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].importance.as_deref(), Some("상"));

        let wrapped = r#"{"selected_news":[{"title":"t","url":"https://a/1"}]}"#;
        assert_eq!(parse_selection_response(wrapped).len(), 1);

        let free = parse_selection_response("오늘은 선별할 기사가 없습니다.");
        assert_eq!(free.len(), 1);
        assert!(free[0].reason.is_some());

        assert!(parse_selection_response("").is_empty());
    }

    #[test]
    fn text_rendition_numbers_and_cites_every_candidate() {
        let text = candidates_as_text(&[record("첫 기사", "https://a/1"), record("둘째", "https://a/2")]);
        assert!(text.starts_with("1. 첫 기사 (연합뉴스, 2024-05-07)"));
        assert!(text.contains("2. 둘째"));
        assert!(text.contains("https://a/2"));
    }

    #[tokio::test]
    async fn disabled_analyst_selects_nothing() {
        let out = DisabledAnalyst
            .select(&[record("a", "https://a/1")])
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(DisabledAnalyst.name(), "disabled");
    }

    #[tokio::test]
    async fn mock_analyst_is_bounded_and_deterministic() {
        let records = vec![record("a", "https://a/1"), record("b", "https://a/2")];
        let analyst = MockAnalyst { take: 1 };
        let out = analyst.select(&records).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://a/1");
    }
}
