use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{CacheError, CacheFamily, Subject};

/// Past this year the four-digit timestamp format no longer sorts.
pub const MAX_EXPIRY_YEAR: i32 = 9999;

/// Formats a timestamp the way every table stores it.
///
/// Fixed-width microseconds with a `Z` suffix keep lexical order equal to
/// chronological order, which the expiry queries rely on.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CacheError::Internal(format!("bad stored timestamp '{raw}': {e}")))
}

/// A persisted, computed artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheRecord {
    pub id: String,
    pub family: CacheFamily,
    pub owner_id: String,
    pub subject: Subject,
    pub cache_key: String,
    pub payload: Value,
    pub auxiliary_inputs: Option<Value>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Validity is derived from `expires_at`, never stored.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Input to `put`. `generated_at` is stamped by the store, not the caller.
#[derive(Debug, Clone)]
pub struct NewCacheRecord {
    pub owner_id: String,
    pub subject: Subject,
    pub cache_key: String,
    pub payload: Value,
    pub auxiliary_inputs: Option<Value>,
    pub expires_at: DateTime<Utc>,
}

impl NewCacheRecord {
    /// Checks everything that can be decided without touching storage.
    pub fn validate(&self, family: CacheFamily, now: DateTime<Utc>) -> Result<(), CacheError> {
        self.subject.ensure_fits(family)?;

        if let Subject::Pair {
            profile_id,
            counterpart_profile_id,
        } = &self.subject
            && profile_id == counterpart_profile_id
        {
            return Err(CacheError::SelfComparison(profile_id.clone()));
        }

        if self.cache_key.trim().is_empty() {
            return Err(CacheError::InvalidSubject(
                "cache key cannot be empty".to_string(),
            ));
        }

        if self.expires_at <= now || self.expires_at.year() > MAX_EXPIRY_YEAR {
            return Err(CacheError::InvalidExpiry {
                generated_at: format_timestamp(now),
                expires_at: format_timestamp(self.expires_at),
            });
        }

        Ok(())
    }
}
