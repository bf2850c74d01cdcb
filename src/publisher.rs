// src/publisher.rs
//! Canonical publisher resolution from noisy links and headlines.
//!
//! A single regex cannot tell a genuine publisher suffix from an arbitrary
//! trailing clause, so resolution is an ordered cascade of strategies, each
//! strictly less precise than the one before it:
//!
//! 1. aggregator-ID lookup (portal article links carry a press office ID)
//! 2. domain-map lookup against the caller's trust aliases
//! 3. known-name substring scan over the raw title
//! 4. trailing-delimiter heuristics on the title
//! 5. bare base domain, else an explicit unresolved sentinel
//!
//! A later strategy never overrides an earlier success.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::types::{NewsRecord, TrustConfig};

/// Sentinel: the link is a known aggregator redirect but the embedded press
/// ID is not in the table. Better than guessing a publisher.
pub const AGGREGATOR_UNCONFIRMED: &str = "(portal: unconfirmed)";

/// Sentinel: no strategy produced a name and no URL host was available.
pub const UNRESOLVED: &str = "(unresolved)";

/// Naver news office IDs for the publishers this pipeline trusts. The portal
/// wraps articles as `…news.naver.com/…/article/<office-id>/<article-id>`.
const NAVER_OFFICE_IDS: &[(&str, &str)] = &[
    ("001", "연합뉴스"),
    ("003", "뉴시스"),
    ("008", "머니투데이"),
    ("009", "매일경제"),
    ("014", "파이낸셜뉴스"),
    ("015", "한국경제"),
    ("016", "헤럴드경제"),
    ("018", "이데일리"),
    ("020", "동아일보"),
    ("023", "조선일보"),
    ("025", "중앙일보"),
    ("277", "아시아경제"),
    ("366", "조선비즈"),
];

/// Common display names scanned in titles when the trust config has no hit.
const KNOWN_DISPLAY_NAMES: &[&str] = &[
    "연합뉴스",
    "뉴시스",
    "뉴스핌",
    "한국경제",
    "매일경제",
    "조선일보",
    "조선비즈",
    "중앙일보",
    "동아일보",
    "머니투데이",
    "이데일리",
    "아시아경제",
    "헤럴드경제",
    "파이낸셜뉴스",
];

/// Generic trailing words that are never a publisher name.
const GENERIC_SUFFIX_WORDS: &[&str] = &["뉴스", "기사", "보도", "신문", "속보", "종합", "단독"];

/// Longest plausible publisher name extracted from a title suffix.
const MAX_SUFFIX_LEN: usize = 20;

static RE_AGGREGATOR_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/article/(\d{3})/\d+").unwrap());

/// Trailing-delimiter patterns, most to least reliable. Each captures the
/// candidate run of word characters at the end of the title.
static SUFFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s[-–—]\s*([\w가-힣.&\s]+?)\s*$",
        r"\[\s*([\w가-힣.&\s]+?)\s*\]\s*$",
        r"\(\s*([\w가-힣.&\s]+?)\s*\)\s*$",
        r"\s\|\s*([\w가-힣.&\s]+?)\s*$",
        r"\s/\s*([\w가-힣.&\s]+?)\s*$",
        r"\s:\s*([\w가-힣.&\s]+?)\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Result of a resolution: the canonical name plus the title with any
/// recognized publisher suffix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub publisher: String,
    pub clean_title: String,
}

/// Resolver over a caller-supplied trust table. The table is data, not
/// configuration the resolver owns; an empty table still resolves via the
/// aggregator map, the built-in display names and the title heuristics.
pub struct PublisherResolver<'a> {
    trust: Option<&'a TrustConfig>,
}

impl<'a> PublisherResolver<'a> {
    pub fn new(trust: Option<&'a TrustConfig>) -> Self {
        Self { trust }
    }

    /// Resolve the canonical publisher of one record. First success wins;
    /// pure, so applying it twice yields the same name.
    pub fn resolve(&self, record: &NewsRecord) -> Resolution {
        let title = record.title.trim();

        // A publisher the feed itself named (RSS `<source>`) is authoritative;
        // it only gets canonicalized through the trust aliases.
        if let Some(existing) = record
            .publisher
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let publisher = self
                .canonical_name(existing)
                .unwrap_or_else(|| existing.to_string());
            return Resolution {
                publisher,
                clean_title: strip_known_suffix(title),
            };
        }

        if let Some(name) = lookup_aggregator_id(record.publisher_link()) {
            return Resolution {
                publisher: name,
                clean_title: strip_known_suffix(title),
            };
        }

        let host = host_of(record.publisher_link());
        if let (Some(host), Some(trust)) = (host.as_deref(), self.trust) {
            if let Some(name) = lookup_domain(host, trust) {
                return Resolution {
                    publisher: name,
                    clean_title: strip_known_suffix(title),
                };
            }
        }

        if let Some((name, clean)) = self.scan_title_names(title) {
            return Resolution {
                publisher: name,
                clean_title: clean,
            };
        }

        if let Some((name, clean)) = extract_title_suffix(title) {
            return Resolution {
                publisher: name,
                clean_title: clean,
            };
        }

        let publisher = host
            .map(|h| base_domain(&h))
            .unwrap_or_else(|| UNRESOLVED.to_string());
        Resolution {
            publisher,
            clean_title: title.to_string(),
        }
    }

    /// Fill `publisher` and `clean_title` on a record sequence. Produces a
    /// new sequence; raw fields are untouched.
    pub fn annotate(&self, records: Vec<NewsRecord>) -> Vec<NewsRecord> {
        records
            .into_iter()
            .map(|mut r| {
                let res = self.resolve(&r);
                r.publisher = Some(res.publisher);
                r.clean_title = Some(res.clean_title);
                r
            })
            .collect()
    }

    /// Map a raw publisher string to its canonical trust-table name, when
    /// any alias matches case-insensitively by equality or containment.
    fn canonical_name(&self, raw: &str) -> Option<String> {
        let trust = self.trust?;
        let p = raw.to_lowercase();
        for (canonical, alias) in trust.alias_pairs() {
            let a = alias.to_lowercase();
            if p == a || p.contains(&a) || p == canonical.to_lowercase() {
                return Some(canonical.to_string());
            }
        }
        None
    }

    fn scan_title_names(&self, title: &str) -> Option<(String, String)> {
        // Trust aliases first (non-dotted ones are display names), then the
        // built-in list.
        if let Some(trust) = self.trust {
            for (canonical, alias) in trust.alias_pairs() {
                if alias.contains('.') {
                    continue;
                }
                if let Some(clean) = strip_name_from_title(title, alias) {
                    return Some((canonical.to_string(), clean));
                }
            }
        }
        for name in KNOWN_DISPLAY_NAMES {
            if let Some(clean) = strip_name_from_title(title, name) {
                return Some((name.to_string(), clean));
            }
        }
        None
    }
}

/// Strategy 1: aggregator-ID lookup. Returns the sentinel for a matching
/// link whose ID is unmapped.
pub(crate) fn lookup_aggregator_id(link: &str) -> Option<String> {
    let host = host_of(link)?;
    if !host.ends_with("news.naver.com") {
        return None;
    }
    let id = RE_AGGREGATOR_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    match id {
        Some(id) => Some(
            NAVER_OFFICE_IDS
                .iter()
                .find(|(k, _)| *k == id)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| AGGREGATOR_UNCONFIRMED.to_string()),
        ),
        None => None,
    }
}

/// Strategy 2: domain-map lookup. Exact host first, then suffix matches so
/// `biz.example.com` resolves like `example.com`.
pub(crate) fn lookup_domain(host: &str, trust: &TrustConfig) -> Option<String> {
    let host = host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase();
    let mut suffix_hit: Option<(usize, String)> = None;
    for (canonical, alias) in trust.alias_pairs() {
        if !alias.contains('.') {
            continue;
        }
        let alias = alias.to_ascii_lowercase();
        if host == alias {
            return Some(canonical.to_string());
        }
        if host.ends_with(&format!(".{alias}")) {
            // Prefer the longest matching alias (most specific domain).
            let better = suffix_hit
                .as_ref()
                .map(|(len, _)| alias.len() > *len)
                .unwrap_or(true);
            if better {
                suffix_hit = Some((alias.len(), canonical.to_string()));
            }
        }
    }
    suffix_hit.map(|(_, name)| name)
}

/// Strategy 3 helper: remove a known display name from the title, trimming
/// leftover separators. `None` when the name does not occur.
pub(crate) fn strip_name_from_title(title: &str, name: &str) -> Option<String> {
    let idx = title.find(name)?;
    let mut out = String::with_capacity(title.len() - name.len());
    out.push_str(&title[..idx]);
    out.push_str(&title[idx + name.len()..]);
    let clean = out
        .trim()
        .trim_end_matches(['-', '–', '—', '|', '/', ':', '[', ']', '(', ')'])
        .trim()
        .to_string();
    if clean.is_empty() {
        None
    } else {
        Some(clean)
    }
}

/// Strategy 4: trailing-delimiter heuristics. Rejected candidates (too long,
/// generic words) fall through to the next pattern.
pub(crate) fn extract_title_suffix(title: &str) -> Option<(String, String)> {
    for re in SUFFIX_PATTERNS.iter() {
        let Some(caps) = re.captures(title) else {
            continue;
        };
        let candidate = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !plausible_publisher(candidate) {
            continue;
        }
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let clean = title[..start].trim().to_string();
        if clean.is_empty() {
            continue;
        }
        return Some((candidate.to_string(), clean));
    }
    None
}

fn plausible_publisher(candidate: &str) -> bool {
    if candidate.is_empty() || candidate.chars().count() > MAX_SUFFIX_LEN {
        return false;
    }
    if GENERIC_SUFFIX_WORDS.iter().any(|w| candidate == *w) {
        return false;
    }
    // A suffix of four or more words is a clause, not a masthead.
    candidate.split_whitespace().count() <= 3
}

fn host_of(link: &str) -> Option<String> {
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Base registrable-ish domain: last two labels, keeping three for the
/// common Korean second-level zones (`co.kr`, `or.kr`, `go.kr`).
pub(crate) fn base_domain(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    let keep = if labels.len() >= 3 && matches!(labels[labels.len() - 2], "co" | "or" | "go" | "ne") {
        3
    } else {
        2
    };
    if labels.len() <= keep {
        host.to_string()
    } else {
        labels[labels.len() - keep..].join(".")
    }
}

/// Strip a recognizable suffix without naming a publisher, used when an
/// earlier strategy already decided the name.
fn strip_known_suffix(title: &str) -> String {
    match extract_title_suffix(title) {
        Some((_, clean)) => clean,
        None => title.to_string(),
    }
}
