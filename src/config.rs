// src/config.rs
//! File loading for caller-supplied data: trust tables and keyword sets.
//! The pipeline itself never owns this data; these helpers exist so binaries
//! and tests can read the same TOML/JSON shapes.

use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::TrustConfig;

const ENV_TRUST_PATH: &str = "CLIPPER_TRUST_PATH";
const ENV_KEYWORDS_PATH: &str = "CLIPPER_KEYWORDS_PATH";

/// Load a trust table from an explicit path. Supports TOML or JSON:
///
/// ```toml
/// [publishers]
/// "조선일보" = ["조선일보", "chosun", "chosun.com"]
/// ```
///
/// ```json
/// {"조선일보": ["조선일보", "chosun", "chosun.com"]}
/// ```
pub fn load_trust_config_from(path: &Path) -> Result<TrustConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading trust config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_trust(&content, ext.as_str())
}

/// Load the trust table using env var + fallbacks:
/// 1) $CLIPPER_TRUST_PATH
/// 2) config/trusted_press.toml
/// 3) config/trusted_press.json
///
/// Absent everywhere means an empty table (open-world default downstream).
pub fn load_trust_config_default() -> Result<TrustConfig> {
    if let Ok(p) = std::env::var(ENV_TRUST_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_trust_config_from(&pb);
        }
        return Err(anyhow!("CLIPPER_TRUST_PATH points to non-existent path"));
    }
    for candidate in ["config/trusted_press.toml", "config/trusted_press.json"] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_trust_config_from(&pb);
        }
    }
    Ok(TrustConfig::default())
}

fn parse_trust(s: &str, hint_ext: &str) -> Result<TrustConfig> {
    let raw = if hint_ext == "toml" {
        parse_trust_toml(s)?
    } else if hint_ext == "json" {
        parse_trust_json(s)?
    } else {
        parse_trust_toml(s).or_else(|_| parse_trust_json(s))?
    };
    TrustConfig::new(clean_map(raw))
}

fn parse_trust_toml(s: &str) -> Result<BTreeMap<String, Vec<String>>> {
    #[derive(serde::Deserialize)]
    struct TomlTrust {
        publishers: BTreeMap<String, Vec<String>>,
    }
    let v: TomlTrust = toml::from_str(s).context("parsing trust config toml")?;
    Ok(v.publishers)
}

fn parse_trust_json(s: &str) -> Result<BTreeMap<String, Vec<String>>> {
    serde_json::from_str(s).context("parsing trust config json")
}

/// Named keyword sets, the original's keyword categories as plain data.
pub fn load_keyword_sets_from(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading keyword sets from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let raw = if ext == "toml" {
        parse_keywords_toml(&content)?
    } else if ext == "json" {
        serde_json::from_str(&content).context("parsing keyword sets json")?
    } else {
        parse_keywords_toml(&content)
            .or_else(|_| serde_json::from_str(&content).context("parsing keyword sets json"))?
    };
    let cleaned = clean_map(raw);
    if cleaned.values().all(|v| v.is_empty()) {
        return Err(anyhow!("keyword sets contain no usable keywords"));
    }
    Ok(cleaned)
}

/// Keyword sets via $CLIPPER_KEYWORDS_PATH, then `config/keywords.{toml,json}`.
pub fn load_keyword_sets_default() -> Result<BTreeMap<String, Vec<String>>> {
    if let Ok(p) = std::env::var(ENV_KEYWORDS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_keyword_sets_from(&pb);
        }
        return Err(anyhow!("CLIPPER_KEYWORDS_PATH points to non-existent path"));
    }
    for candidate in ["config/keywords.toml", "config/keywords.json"] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_keyword_sets_from(&pb);
        }
    }
    Ok(BTreeMap::new())
}

fn parse_keywords_toml(s: &str) -> Result<BTreeMap<String, Vec<String>>> {
    #[derive(serde::Deserialize)]
    struct TomlKw {
        #[serde(alias = "keywords")]
        categories: BTreeMap<String, Vec<String>>,
    }
    let v: TomlKw = toml::from_str(s).context("parsing keyword sets toml")?;
    Ok(v.categories)
}

/// Trim entries, drop empties, de-duplicate while keeping order.
fn clean_map(raw: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    raw.into_iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, vs)| {
            let mut seen = std::collections::BTreeSet::new();
            let cleaned: Vec<String> = vs
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && seen.insert(v.clone()))
                .collect();
            (k.trim().to_string(), cleaned)
        })
        .collect()
}
