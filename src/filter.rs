// src/filter.rs
//! Time-window and publisher-trust filtering. The two checks are independent
//! and composable; callers may apply either or both.

use crate::types::{DateGranularity, NewsRecord, TimeWindow, TrustConfig};

/// Keep records whose `published_at` lies inside the inclusive window.
/// Records without a timestamp never reach this stage in the composed
/// pipeline; defensive inputs without one are dropped.
pub fn filter_window(
    records: Vec<NewsRecord>,
    window: &TimeWindow,
    granularity: DateGranularity,
) -> Vec<NewsRecord> {
    records
        .into_iter()
        .filter(|r| {
            r.published_at
                .map(|at| window.contains(at, granularity))
                .unwrap_or(false)
        })
        .collect()
}

/// Keep records whose resolved publisher matches any alias of any trusted
/// entry, case-insensitively, by equality or substring containment. An
/// absent publisher is untrusted. `None` config passes everything — the
/// open-world default.
pub fn filter_trust(records: Vec<NewsRecord>, trust: Option<&TrustConfig>) -> Vec<NewsRecord> {
    let Some(trust) = trust else {
        return records;
    };
    records
        .into_iter()
        .filter(|r| {
            r.publisher
                .as_deref()
                .map(|p| is_trusted(p, trust))
                .unwrap_or(false)
        })
        .collect()
}

/// Case-insensitive equals-or-contains match against every alias.
pub fn is_trusted(publisher: &str, trust: &TrustConfig) -> bool {
    let p = publisher.to_lowercase();
    if p.is_empty() {
        return false;
    }
    trust.alias_pairs().any(|(canonical, alias)| {
        let a = alias.to_lowercase();
        let c = canonical.to_lowercase();
        p == a || p.contains(&a) || p == c || p.contains(&c)
    })
}
