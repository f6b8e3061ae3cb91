//! Decides whether a looked-up record can be served.
//!
//! The policy is horizon-agnostic: it only compares `now` with the
//! record's own `expires_at`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::CacheRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Miss,
    /// The row still exists but must not be served.
    Expired(CacheRecord),
    Hit(CacheRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Miss,
    Expired,
    Hit,
}

impl Freshness {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Miss => "miss",
            Self::Expired => "expired",
            Self::Hit => "hit",
        }
    }
}

#[must_use]
pub fn evaluate(record: Option<CacheRecord>, now: DateTime<Utc>) -> Lookup {
    match record {
        None => Lookup::Miss,
        Some(record) if now >= record.expires_at => Lookup::Expired(record),
        Some(record) => Lookup::Hit(record),
    }
}

impl Lookup {
    #[must_use]
    pub const fn freshness(&self) -> Freshness {
        match self {
            Self::Miss => Freshness::Miss,
            Self::Expired(_) => Freshness::Expired,
            Self::Hit(_) => Freshness::Hit,
        }
    }

    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// The underlying row, served or not.
    #[must_use]
    pub const fn record(&self) -> Option<&CacheRecord> {
        match self {
            Self::Miss => None,
            Self::Expired(record) | Self::Hit(record) => Some(record),
        }
    }

    /// The record if it may be served.
    #[must_use]
    pub fn into_hit(self) -> Option<CacheRecord> {
        match self {
            Self::Hit(record) => Some(record),
            Self::Miss | Self::Expired(_) => None,
        }
    }
}
