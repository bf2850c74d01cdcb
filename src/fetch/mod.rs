// src/fetch/mod.rs
//! Multi-keyword feed collection with per-query failure isolation.
//!
//! The upstream source imposes informal rate limits, so fetches run
//! sequentially with an optional politeness pause between requests. One
//! failing query logs a warning and contributes zero records; sibling
//! queries always proceed.

pub mod parse;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;

use crate::types::{NewsRecord, TrustConfig};
use parse::{parse_response, ResponseFormat};

/// Largest page the upstream will serve per request.
pub const PAGE_SIZE: usize = 100;

/// Default pause between successive requests in one batch.
pub const DEFAULT_POLITENESS_DELAY: Duration = Duration::from_millis(300);

/// Per-call HTTP wait bound.
const HTTP_TIMEOUT: Duration = Duration::from_secs(12);

/// How a keyword batch is turned into upstream queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One paginated query per keyword; each record keeps its own keyword as
    /// `search_term`.
    PerKeyword,
    /// All keywords joined into a single boolean-OR query. Trades
    /// per-keyword attribution for request-count reduction; records share
    /// the joined query as `search_term`.
    OrGroup,
    /// One request per (keyword, publisher alias) pair, restricted to that
    /// publisher's domain. Requires a trust config.
    SiteScoped,
}

/// Transport seam: one page of the upstream feed. The HTTP implementation
/// lives behind this trait so tests can run against fixtures.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Fetch one page for `query`. `start` is the 1-based offset of the
    /// first item requested, `count` the page size. Sources without
    /// pagination may ignore both and return their single page.
    async fn fetch_page(&self, query: &str, start: usize, count: usize)
        -> Result<(String, ResponseFormat)>;
}

/// Reqwest-backed transport against a fixed base endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    format: ResponseFormat,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, format: ResponseFormat) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("Mozilla/5.0 (compatible; news-clipper/0.1)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
            format,
        }
    }

    /// Google News style RSS search endpoint, Korean locale.
    pub fn google_news_rss() -> Self {
        Self::new("https://news.google.com/rss/search", ResponseFormat::Rss)
    }

    fn page_url(&self, query: &str, start: usize, count: usize) -> String {
        let q = urlencoding::encode(query);
        match self.format {
            ResponseFormat::Rss => {
                format!("{}?q={}&hl=ko&gl=KR&ceid=KR:ko", self.base_url, q)
            }
            ResponseFormat::Json => format!(
                "{}?query={}&display={}&start={}&sort=date",
                self.base_url, q, count, start
            ),
        }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        count: usize,
    ) -> Result<(String, ResponseFormat)> {
        let url = self.page_url(query, start, count);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("feed request failed: {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            // Rate limiting and other non-2xx answers are the same skip-and-
            // continue case as a network failure.
            bail!("feed returned status {status} for {url}");
        }
        let body = resp.text().await.context("reading feed response body")?;
        Ok((body, self.format))
    }
}

/// Keyword-set fetcher over a transport.
pub struct NewsFetcher<T: FeedTransport> {
    transport: T,
    politeness_delay: Duration,
}

impl<T: FeedTransport> NewsFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            politeness_delay: DEFAULT_POLITENESS_DELAY,
        }
    }

    /// Override the inter-request pause (zero in tests).
    pub fn with_politeness_delay(mut self, delay: Duration) -> Self {
        self.politeness_delay = delay;
        self
    }

    /// Fetch up to `limit` records for one query string. Fails on empty
    /// query or zero limit; those are caller errors, not feed conditions.
    pub async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NewsRecord>> {
        self.fetch_attributed(query, query, limit).await
    }

    /// Run a whole keyword batch in the given mode. Per-query failures are
    /// logged and isolated; the returned sequence is ordered by keyword,
    /// never by arrival timing.
    pub async fn fetch_batch(
        &self,
        keywords: &[String],
        limit_per_query: usize,
        mode: FetchMode,
        trust: Option<&TrustConfig>,
    ) -> Result<Vec<NewsRecord>> {
        if keywords.iter().all(|k| k.trim().is_empty()) {
            bail!("keyword set is empty");
        }
        if limit_per_query == 0 {
            bail!("limit must be a positive integer");
        }

        let keywords: Vec<&str> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let mut out = Vec::new();
        match mode {
            FetchMode::PerKeyword => {
                for (i, kw) in keywords.iter().enumerate() {
                    if i > 0 {
                        self.pause().await;
                    }
                    out.extend(self.fetch_isolated(kw, kw, limit_per_query).await);
                }
            }
            FetchMode::OrGroup => {
                let joined = keywords.join(" OR ");
                out.extend(self.fetch_isolated(&joined, &joined, limit_per_query).await);
            }
            FetchMode::SiteScoped => {
                let Some(trust) = trust.filter(|t| !t.is_empty()) else {
                    bail!("site-scoped fetch requires a non-empty trust config");
                };
                for (i, kw) in keywords.iter().enumerate() {
                    if i > 0 {
                        self.pause().await;
                    }
                    for (publisher, aliases) in &trust.publishers {
                        out.extend(
                            self.fetch_site_scoped(kw, publisher, aliases, limit_per_query)
                                .await,
                        );
                    }
                }
            }
        }
        counter!("clip_records_total").increment(out.len() as u64);
        Ok(out)
    }

    /// Site-scoped search for one (keyword, publisher) pair: try the
    /// publisher's aliases in order and stop at the first alias yielding a
    /// non-empty result, to avoid redundant calls once a working alias is
    /// found. Errors count as empty and move on to the next alias.
    pub async fn fetch_site_scoped(
        &self,
        keyword: &str,
        publisher: &str,
        aliases: &[String],
        limit: usize,
    ) -> Vec<NewsRecord> {
        for (i, alias) in aliases.iter().filter(|a| !a.trim().is_empty()).enumerate() {
            if i > 0 {
                self.pause().await;
            }
            let query = site_query(keyword, alias.trim());
            let records = self.fetch_isolated(&query, keyword, limit).await;
            if !records.is_empty() {
                tracing::debug!(keyword, publisher, alias = alias.as_str(), hits = records.len(), "site-scoped alias hit");
                return records;
            }
        }
        Vec::new()
    }

    /// One query with failure isolation: any error becomes a warning and an
    /// empty result so sibling queries are unaffected.
    async fn fetch_isolated(&self, query: &str, attribution: &str, limit: usize) -> Vec<NewsRecord> {
        match self.fetch_attributed(query, attribution, limit).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, query, "feed query failed, skipping");
                counter!("clip_fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }

    /// Offset-paginated fetch. Stops when a page comes back short or the
    /// running total reaches `limit`.
    async fn fetch_attributed(
        &self,
        query: &str,
        attribution: &str,
        limit: usize,
    ) -> Result<Vec<NewsRecord>> {
        if query.trim().is_empty() {
            bail!("query must be non-empty");
        }
        if limit == 0 {
            bail!("limit must be a positive integer");
        }

        let mut out: Vec<NewsRecord> = Vec::new();
        let mut start = 1usize;
        loop {
            let want = (limit - out.len()).min(PAGE_SIZE);
            let (body, format) = self.transport.fetch_page(query, start, want).await?;
            let page = parse_response(&body, format, attribution)?;
            let got = page.len();
            let room = limit - out.len();
            out.extend(page.into_iter().take(room));
            if got < want || out.len() >= limit {
                break;
            }
            start += got;
            self.pause().await;
        }
        Ok(out)
    }

    async fn pause(&self) {
        if !self.politeness_delay.is_zero() {
            tokio::time::sleep(self.politeness_delay).await;
        }
    }
}

/// Upstream query restricted to one publisher alias: dotted aliases become a
/// `site:` qualifier, display-name aliases a quoted term.
fn site_query(keyword: &str, alias: &str) -> String {
    if alias.contains('.') {
        format!("{keyword} site:{alias}")
    } else {
        format!("{keyword} \"{alias}\"")
    }
}
