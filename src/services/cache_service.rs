//! Domain service for reading and filling the chart caches.
//!
//! Wraps the owner-scoped store with the freshness policy and the
//! fill-convergence rule: a `DuplicateKey` on insert means another writer
//! won the race, so the loser reads the winner back instead of failing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{CacheError, CacheFamily, CacheRecord, Caller, Subject};
use crate::services::freshness::Lookup;

/// What the calculation engine hands back for one computation.
#[derive(Debug, Clone)]
pub struct Computation {
    pub payload: Value,
    pub auxiliary_inputs: Option<Value>,
}

/// The external ephemeris / chart calculation engine.
#[async_trait::async_trait]
pub trait ChartCalculator: Send + Sync {
    async fn compute(
        &self,
        family: CacheFamily,
        subject: &Subject,
        inputs: &Value,
    ) -> anyhow::Result<Computation>;
}

/// A computed artifact to be stored. The owner is always the caller.
#[derive(Debug, Clone)]
pub struct FillRequest {
    pub subject: Subject,
    pub cache_key: String,
    pub payload: Value,
    pub auxiliary_inputs: Option<Value>,
    /// Defaults to now plus the family horizon.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedFrom {
    /// A valid record was already cached.
    Cache,
    /// This call stored the record.
    Inserted,
    /// Another writer stored the same key first; its live record was read back.
    Converged,
}

impl ServedFrom {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Inserted => "inserted",
            Self::Converged => "converged",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub record: CacheRecord,
    pub source: ServedFrom,
}

/// Domain service trait for the chart caches.
#[async_trait::async_trait]
pub trait CacheService: Send + Sync {
    /// Looks up `cache_key` and applies the freshness policy.
    async fn lookup(
        &self,
        caller: &Caller,
        family: CacheFamily,
        cache_key: &str,
    ) -> Result<Lookup, CacheError>;

    /// Latest record the caller holds about `profile_id`, with freshness.
    async fn latest(
        &self,
        caller: &Caller,
        family: CacheFamily,
        profile_id: &str,
    ) -> Result<Lookup, CacheError>;

    /// Stores a computed artifact, converging on the existing record when
    /// the key is already taken by a live one. A key held by an expired
    /// record is filled under its successor instead.
    async fn fill(
        &self,
        caller: &Caller,
        family: CacheFamily,
        request: FillRequest,
    ) -> Result<Served, CacheError>;

    /// Serves a valid cached artifact or computes, stores and returns a new one.
    async fn get_or_compute(
        &self,
        caller: &Caller,
        family: CacheFamily,
        subject: Subject,
        inputs: &Value,
        calculator: &dyn ChartCalculator,
    ) -> Result<Served, CacheError>;

    async fn set_auxiliary_inputs(
        &self,
        caller: &Caller,
        family: CacheFamily,
        record_id: &str,
        auxiliary_inputs: Option<Value>,
    ) -> Result<Option<CacheRecord>, CacheError>;

    /// Idempotent delete; `false` if the record was already gone.
    async fn remove(
        &self,
        caller: &Caller,
        family: CacheFamily,
        record_id: &str,
    ) -> Result<bool, CacheError>;
}
