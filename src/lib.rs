// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod publisher;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::fetch::{FeedTransport, FetchMode, HttpTransport, NewsFetcher};
pub use crate::pipeline::{Pipeline, RunOptions};
pub use crate::publisher::PublisherResolver;
pub use crate::types::{
    DateGranularity, NewsRecord, RunReport, StageCounts, TimeWindow, TrustConfig,
};

/// Install the default tracing subscriber for binaries and examples. Honors
/// `RUST_LOG`; safe to call once at startup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
