// src/dates.rs
//! Best-effort timestamp normalization across the feed formats this pipeline
//! actually sees: RFC-2822 pub dates, ISO variants, and the Korean
//! "YYYY년 MM월 DD일" display form. Zone-less values are assumed UTC and
//! converted to the target zone; explicit offsets are honored as-is.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Korea Standard Time, the target zone for this domain.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("KST offset is in range")
}

/// Zone-less datetime patterns, tried in order after the offset-aware ones.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Date-only patterns (midnight assumed), tried last.
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y년 %m월 %d일",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
];

/// Parse a raw feed timestamp into the target zone, or `None` when no known
/// pattern applies.
pub fn parse_date(raw: &str, target: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Offset-aware forms first: the embedded offset wins, never re-converted.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&target));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&target));
    }

    // Zone-less forms are treated as UTC, then shifted into the target zone.
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(utc_to_target(naive, target));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(utc_to_target(naive, target));
        }
    }

    None
}

fn utc_to_target(naive: NaiveDateTime, target: FixedOffset) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&naive).with_timezone(&target)
}

/// Parse with the "now" fallback: an undateable article is still usable
/// content whose recency just can't be verified, so it gets the current
/// instant instead of failing the record.
pub fn normalize(raw: &str, target: FixedOffset) -> DateTime<FixedOffset> {
    match parse_date(raw, target) {
        Some(dt) => dt,
        None => {
            if !raw.trim().is_empty() {
                tracing::debug!(raw, "unparseable pub date, defaulting to now");
            }
            Utc::now().with_timezone(&target)
        }
    }
}

/// Date stage: fill `published_at` on every record from its raw feed
/// timestamp. After this, `published_at` is always present.
pub fn annotate(records: Vec<crate::types::NewsRecord>, target: FixedOffset) -> Vec<crate::types::NewsRecord> {
    records
        .into_iter()
        .map(|mut r| {
            r.published_at = match (r.raw_date.as_deref(), r.published_at) {
                (Some(raw), _) => Some(normalize(raw, target)),
                // no raw date but an instant already annotated: keep it
                (None, Some(existing)) => Some(existing),
                (None, None) => Some(normalize("", target)),
            };
            r
        })
        .collect()
}
