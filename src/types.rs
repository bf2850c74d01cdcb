// src/types.rs
use anyhow::{bail, Result};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// One news hit as it travels through the pipeline.
///
/// Raw source fields (`title`, `url`, `summary`) are never rewritten after the
/// fetch stage; derived values go into `clean_title`, `published_at` and
/// `publisher`, and stages work on copies rather than mutating shared records.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsRecord {
    /// Raw headline, possibly with an embedded publisher suffix.
    pub title: String,
    /// Canonical or aggregator-redirect link. Non-empty for every record the
    /// fetcher emits.
    pub url: String,
    /// Publisher-resolved link when the source wraps articles behind an
    /// aggregator redirect. Preferred over `url` for publisher resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    /// Normalized timestamp; `None` until the date stage runs, always present
    /// afterwards (best effort, "now" on total parse failure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Raw timestamp string as returned by the source, consumed by the date
    /// stage. `None` when the feed item carried no date at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_date: Option<String>,
    /// Secondary descriptive text, HTML-stripped at parse time.
    pub summary: String,
    /// The keyword or OR-group that produced this record. Attribution only,
    /// never part of record equality for dedup purposes.
    pub search_term: String,
    /// Resolved canonical publisher name; `None` until the resolver runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Caller-supplied grouping label, opaque to the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Title with the publisher suffix stripped, filled by the resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_title: Option<String>,
}

impl NewsRecord {
    /// Title to use for similarity comparisons: the cleaned variant when the
    /// resolver produced one, the raw headline otherwise.
    pub fn comparable_title(&self) -> &str {
        self.clean_title.as_deref().unwrap_or(&self.title)
    }

    /// Link to prefer when resolving the publisher.
    pub fn publisher_link(&self) -> &str {
        self.original_url.as_deref().unwrap_or(&self.url)
    }
}

/// Date comparison granularity for the window filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateGranularity {
    /// Compare full instants.
    Instant,
    /// Truncate both sides to calendar dates (in the record's own offset)
    /// before comparing. Caller-selected, matching day-based clipping runs.
    DateOnly,
}

/// Inclusive time interval. `start <= end` is a constructor precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Self> {
        if start > end {
            bail!("invalid time window: start {start} is after end {end}");
        }
        Ok(Self { start, end })
    }

    /// Inclusive containment check at the given granularity.
    pub fn contains(&self, at: DateTime<FixedOffset>, granularity: DateGranularity) -> bool {
        match granularity {
            DateGranularity::Instant => self.start <= at && at <= self.end,
            DateGranularity::DateOnly => {
                let d = at.date_naive();
                self.start.date_naive() <= d && d <= self.end.date_naive()
            }
        }
    }
}

/// Caller-supplied allow-list: canonical publisher name → non-empty alias
/// list (domain fragments, abbreviations, alternate spellings). Read-only to
/// the pipeline; ordering is kept stable so alias trials are deterministic.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct TrustConfig {
    pub publishers: BTreeMap<String, Vec<String>>,
}

impl TrustConfig {
    pub fn new(publishers: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let cfg = Self { publishers };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Caller programming errors surface here, before any network call.
    pub fn validate(&self) -> Result<()> {
        for (name, aliases) in &self.publishers {
            if name.trim().is_empty() {
                bail!("trust config contains an empty publisher name");
            }
            if aliases.iter().all(|a| a.trim().is_empty()) {
                bail!("trust config entry '{name}' has no usable aliases");
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// All (canonical name, alias) pairs, aliases in their configured order.
    pub fn alias_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.publishers.iter().flat_map(|(name, aliases)| {
            aliases
                .iter()
                .filter(|a| !a.trim().is_empty())
                .map(move |a| (name.as_str(), a.as_str()))
        })
    }
}

/// Per-stage record counts, reported for observability with every run.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StageCounts {
    /// Records collected across all keywords, before any filtering.
    pub collected: usize,
    /// Records surviving the time-window check.
    pub date_filtered: usize,
    /// Records surviving the trust check.
    pub trust_filtered: usize,
    /// Records surviving duplicate collapsing.
    pub deduped: usize,
}

/// Outcome of one pipeline run. An empty candidate list is a valid outcome,
/// not an error.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub candidates: Vec<NewsRecord>,
    pub counts: StageCounts,
}

impl RunReport {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
