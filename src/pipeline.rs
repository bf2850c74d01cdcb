// src/pipeline.rs
//! Stage composition: fetch → date annotate → window filter → trust filter
//! → dedup → bounded candidate list. Each stage produces a new sequence;
//! per-stage counts are reported with every run.

use anyhow::{bail, Result};
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::dates;
use crate::dedup::dedupe;
use crate::fetch::{FeedTransport, FetchMode, NewsFetcher};
use crate::filter::{filter_trust, filter_window};
use crate::publisher::PublisherResolver;
use crate::types::{DateGranularity, NewsRecord, RunReport, StageCounts, TimeWindow, TrustConfig};

/// One-time metrics registration so the series carry descriptions wherever a
/// recorder is installed.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("clip_records_total", "Records collected from the feed.");
        describe_counter!("clip_fetch_errors_total", "Feed fetch/parse errors.");
        describe_counter!(
            "clip_window_dropped_total",
            "Records outside the requested time window."
        );
        describe_counter!(
            "clip_trust_dropped_total",
            "Records from publishers outside the trust config."
        );
        describe_counter!("clip_dedup_total", "Records removed as duplicates.");
    });
}

/// Per-run knobs. `Default` matches the original clipping runs: 50 records
/// per keyword, 100 candidates at most, per-keyword queries, instants
/// compared at full granularity.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper bound on records requested per query (not a guarantee).
    pub limit_per_query: usize,
    /// Hard cap on the emitted candidate list.
    pub max_candidates: usize,
    /// How keywords become upstream queries.
    pub mode: FetchMode,
    /// Window comparison granularity.
    pub granularity: DateGranularity,
    /// Publisher priority order for duplicate collapsing, most authoritative
    /// first. Empty means ties fall through to recency.
    pub dedup_priority: Vec<String>,
    /// Opaque grouping label stamped on every record of this run.
    pub category: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit_per_query: 50,
            max_candidates: 100,
            mode: FetchMode::PerKeyword,
            granularity: DateGranularity::Instant,
            dedup_priority: Vec::new(),
            category: None,
        }
    }
}

/// The pipeline orchestrator. Owns nothing between runs; every invocation
/// works on its own record sequences and a run is discardable once the
/// report is returned.
pub struct Pipeline<T: FeedTransport> {
    fetcher: NewsFetcher<T>,
}

impl<T: FeedTransport> Pipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            fetcher: NewsFetcher::new(transport),
        }
    }

    /// Override the pause between successive feed requests (zero in tests).
    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.fetcher = self.fetcher.with_politeness_delay(delay);
        self
    }

    /// Run all stages in order. Caller programming errors (empty keyword
    /// set, inverted window, malformed trust config) fail fast before any
    /// network call; per-keyword fetch failures and an all-empty outcome
    /// are normal results, never errors.
    pub async fn run(
        &self,
        keywords: &[String],
        window: &TimeWindow,
        trust: Option<&TrustConfig>,
        options: &RunOptions,
    ) -> Result<RunReport> {
        ensure_metrics_described();
        validate_inputs(keywords, trust, options)?;

        let collected = self
            .fetcher
            .fetch_batch(keywords, options.limit_per_query, options.mode, trust)
            .await?;
        let mut counts = StageCounts {
            collected: collected.len(),
            ..StageCounts::default()
        };
        tracing::info!(collected = counts.collected, "feed collection finished");

        let annotated = dates::annotate(collected, dates::kst());
        let resolver = PublisherResolver::new(trust);
        let resolved = resolver.annotate(annotated);

        let dated = filter_window(resolved, window, options.granularity);
        counts.date_filtered = dated.len();
        counter!("clip_window_dropped_total")
            .increment((counts.collected - counts.date_filtered) as u64);

        let trusted = filter_trust(dated, trust);
        counts.trust_filtered = trusted.len();
        counter!("clip_trust_dropped_total")
            .increment((counts.date_filtered - counts.trust_filtered) as u64);

        let mut deduped = dedupe(trusted, &options.dedup_priority);
        counts.deduped = deduped.len();
        counter!("clip_dedup_total")
            .increment((counts.trust_filtered - counts.deduped) as u64);

        deduped.truncate(options.max_candidates);
        if let Some(category) = &options.category {
            for r in &mut deduped {
                r.category = Some(category.clone());
            }
        }

        gauge!("clip_last_run_candidates").set(deduped.len() as f64);
        if deduped.is_empty() {
            tracing::info!("pipeline produced no candidates");
        } else {
            tracing::info!(
                candidates = deduped.len(),
                date_filtered = counts.date_filtered,
                trust_filtered = counts.trust_filtered,
                "pipeline finished"
            );
        }

        Ok(RunReport {
            candidates: deduped,
            counts,
        })
    }

    /// Access to the fetcher for callers composing stages manually.
    pub fn fetcher(&self) -> &NewsFetcher<T> {
        &self.fetcher
    }
}

/// Convenience: annotate + filter + dedup over already-fetched records, for
/// callers that collect through their own transport arrangement.
pub fn refine(
    records: Vec<NewsRecord>,
    window: &TimeWindow,
    trust: Option<&TrustConfig>,
    options: &RunOptions,
) -> Result<RunReport> {
    if let Some(t) = trust {
        t.validate()?;
    }
    let mut counts = StageCounts {
        collected: records.len(),
        ..StageCounts::default()
    };
    let annotated = dates::annotate(records, dates::kst());
    let resolver = PublisherResolver::new(trust);
    let resolved = resolver.annotate(annotated);
    let dated = filter_window(resolved, window, options.granularity);
    counts.date_filtered = dated.len();
    let trusted = filter_trust(dated, trust);
    counts.trust_filtered = trusted.len();
    let mut deduped = dedupe(trusted, &options.dedup_priority);
    counts.deduped = deduped.len();
    deduped.truncate(options.max_candidates);
    Ok(RunReport {
        candidates: deduped,
        counts,
    })
}

fn validate_inputs(
    keywords: &[String],
    trust: Option<&TrustConfig>,
    options: &RunOptions,
) -> Result<()> {
    if keywords.iter().all(|k| k.trim().is_empty()) {
        bail!("keyword set is empty");
    }
    if options.limit_per_query == 0 {
        bail!("limit_per_query must be a positive integer");
    }
    if options.max_candidates == 0 {
        bail!("max_candidates must be a positive integer");
    }
    if let Some(t) = trust {
        t.validate()?;
    }
    Ok(())
}
