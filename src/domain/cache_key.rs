//! Deterministic cache keys.
//!
//! A key is the family tag followed by a SHA-256 over the subject ids and
//! the canonical JSON of the computation inputs. `serde_json` keeps object
//! keys sorted, so logically equal inputs hash the same regardless of the
//! order the client sent them in.
//!
//! Keys produced by [`derive_windowed`] also fold in the freshness window
//! the computation falls in, so a new window always yields a new key and an
//! expired row never blocks its replacement. Records stored under a windowed
//! key must expire no later than [`window_end`].
//!
//! Every stored key starts with its family tag (see [`qualify`]), which keeps
//! keys unique across all family tables.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{CacheFamily, Subject};

#[must_use]
pub fn derive(family: CacheFamily, subject: &Subject, inputs: &Value) -> String {
    hash(family, subject, inputs, None)
}

/// Like [`derive`], scoped to the horizon-sized window containing `now`.
#[must_use]
pub fn derive_windowed(
    family: CacheFamily,
    subject: &Subject,
    inputs: &Value,
    now: DateTime<Utc>,
    horizon: Duration,
) -> String {
    hash(family, subject, inputs, Some(window_index(now, horizon)))
}

/// Index of the horizon-sized window `now` falls in, counted from the epoch.
#[must_use]
pub fn window_index(now: DateTime<Utc>, horizon: Duration) -> i64 {
    now.timestamp().div_euclid(horizon.num_seconds().max(1))
}

/// First instant after the window `now` falls in.
///
/// Capped at `now + horizon` for timestamps chrono can't represent.
#[must_use]
pub fn window_end(now: DateTime<Utc>, horizon: Duration) -> DateTime<Utc> {
    let secs = horizon.num_seconds().max(1);
    let end = window_index(now, horizon)
        .checked_add(1)
        .and_then(|next| next.checked_mul(secs))
        .and_then(|ts| DateTime::from_timestamp(ts, 0));
    let cap = now + horizon;
    end.map_or(cap, |end| end.min(cap))
}

/// Prefixes `key` with the family tag unless it already carries it.
#[must_use]
pub fn qualify(family: CacheFamily, key: &str) -> String {
    let tag = family.as_str();
    match key.strip_prefix(tag) {
        Some(rest) if rest.starts_with(':') => key.to_string(),
        _ => format!("{tag}:{key}"),
    }
}

/// Key for the record that replaces an expired one stored under `key`.
#[must_use]
pub fn successor(key: &str, stale_generated_at: DateTime<Utc>) -> String {
    format!("{key}.r{}", stale_generated_at.timestamp_micros())
}

fn hash(family: CacheFamily, subject: &Subject, inputs: &Value, window: Option<i64>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(family.as_str().as_bytes());
    for id in subject.profile_ids() {
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
    }
    hasher.update([0u8]);
    hasher.update(inputs.to_string().as_bytes());
    if let Some(window) = window {
        hasher.update([0u8]);
        hasher.update(window.to_be_bytes());
    }

    format!("{}:{}", family.as_str(), hex::encode(hasher.finalize()))
}
