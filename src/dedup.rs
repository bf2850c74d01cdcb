// src/dedup.rs
//! Duplicate collapsing: one representative per group of records covering
//! the same event.
//!
//! Exact URL identity is the cheap, always-correct grouping path. Titles are
//! only consulted for records whose URL matched nothing, as a heuristic for
//! re-published or syndicated coverage: token-set overlap plus Jaro-Winkler
//! on cleaned titles, with numeric figures required to agree. The 0.75
//! threshold approximates what the source delegated to an editorial
//! judgment call; it is deliberately a named constant so it can be re-tuned.

use std::collections::{BTreeSet, HashMap};

use crate::types::NewsRecord;

/// Minimum token-overlap and string-similarity score for two cleaned titles
/// to be considered the same story.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Collapse duplicates, keeping exactly one representative per group.
///
/// Within a group the representative is chosen by publisher rank in the
/// caller-supplied priority list (most-authoritative first; unlisted
/// publishers rank last), then most-recent `published_at`, then summary
/// length as a completeness proxy. Output preserves the first-seen order of
/// each group; there is no global re-sort.
pub fn dedupe(records: Vec<NewsRecord>, priority: &[String]) -> Vec<NewsRecord> {
    let mut groups: Vec<Vec<NewsRecord>> = Vec::new();
    let mut by_url: HashMap<String, usize> = HashMap::new();

    for record in records {
        if let Some(&idx) = by_url.get(&record.url) {
            groups[idx].push(record);
            continue;
        }
        // URL unseen: fall back to the title-similarity heuristic against
        // each group's first member.
        let found = groups.iter().position(|g| {
            similar_titles(g[0].comparable_title(), record.comparable_title())
        });
        match found {
            Some(idx) => {
                by_url.insert(record.url.clone(), idx);
                groups[idx].push(record);
            }
            None => {
                by_url.insert(record.url.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    groups
        .into_iter()
        .map(|g| pick_representative(g, priority))
        .collect()
}

/// Deterministic representative choice; see `dedupe`.
fn pick_representative(group: Vec<NewsRecord>, priority: &[String]) -> NewsRecord {
    let mut best: Option<NewsRecord> = None;
    for candidate in group {
        best = Some(match best {
            None => candidate,
            Some(current) => {
                if beats(&candidate, &current, priority) {
                    candidate
                } else {
                    current
                }
            }
        });
    }
    best.expect("dedupe groups are never empty")
}

fn beats(a: &NewsRecord, b: &NewsRecord, priority: &[String]) -> bool {
    let (ra, rb) = (publisher_rank(a, priority), publisher_rank(b, priority));
    if ra != rb {
        return ra < rb;
    }
    match (a.published_at, b.published_at) {
        (Some(ta), Some(tb)) if ta != tb => return ta > tb,
        _ => {}
    }
    a.summary.chars().count() > b.summary.chars().count()
}

fn publisher_rank(record: &NewsRecord, priority: &[String]) -> usize {
    let Some(publisher) = record.publisher.as_deref() else {
        return usize::MAX;
    };
    priority
        .iter()
        .position(|p| publisher.eq_ignore_ascii_case(p) || publisher.contains(p.as_str()))
        .unwrap_or(usize::MAX)
}

/// Title-similarity rule: token-set Jaccard and Jaro-Winkler both at or
/// above the threshold, and digit runs (figures, dates, amounts) must agree
/// when either title carries any.
pub fn similar_titles(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if numbers_of(a) != numbers_of(b) {
        return false;
    }
    if token_jaccard(a, b) < TITLE_SIMILARITY_THRESHOLD {
        return false;
    }
    strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase()) >= TITLE_SIMILARITY_THRESHOLD
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<String> = tokens(a).collect();
    let tb: BTreeSet<String> = tokens(b).collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    inter / union
}

fn tokens(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
}

fn numbers_of(s: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut current = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            out.insert(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.insert(current);
    }
    out
}
