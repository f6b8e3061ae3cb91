//! `SeaORM` implementation of the `CacheService` trait.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::Store;
use crate::domain::{
    CacheError, CacheFamily, CacheRecord, Caller, NewCacheRecord, Subject, cache_key,
};
use crate::services::cache_service::{CacheService, ChartCalculator, FillRequest, Served, ServedFrom};
use crate::services::freshness::{self, Lookup};

/// A put that loses the race retries once if the winner vanished before it
/// could be read back.
const FILL_RETRIES: usize = 1;

const MAX_SUCCESSOR_HOPS: usize = 4;

pub struct SeaOrmCacheService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmCacheService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    async fn horizon(&self, family: CacheFamily) -> chrono::Duration {
        self.config.read().await.cache.horizon(family)
    }

    fn record_lookup(family: CacheFamily, lookup: &Lookup) {
        metrics::counter!(
            "cache_lookups_total",
            "family" => family.as_str(),
            "outcome" => lookup.freshness().as_str()
        )
        .increment(1);
    }

    fn record_fill(family: CacheFamily, source: ServedFrom) {
        metrics::counter!(
            "cache_fills_total",
            "family" => family.as_str(),
            "outcome" => source.as_str()
        )
        .increment(1);
    }
}

#[async_trait]
impl CacheService for SeaOrmCacheService {
    async fn lookup(
        &self,
        caller: &Caller,
        family: CacheFamily,
        cache_key: &str,
    ) -> Result<Lookup, CacheError> {
        let record = self.store.cache(family, caller).get_by_key(cache_key).await?;
        let lookup = freshness::evaluate(record, self.store.clock().now());
        Self::record_lookup(family, &lookup);
        Ok(lookup)
    }

    async fn latest(
        &self,
        caller: &Caller,
        family: CacheFamily,
        profile_id: &str,
    ) -> Result<Lookup, CacheError> {
        let record = self
            .store
            .cache(family, caller)
            .get_latest_for_subject(caller.id(), profile_id)
            .await?;
        let lookup = freshness::evaluate(record, self.store.clock().now());
        Self::record_lookup(family, &lookup);
        Ok(lookup)
    }

    async fn fill(
        &self,
        caller: &Caller,
        family: CacheFamily,
        request: FillRequest,
    ) -> Result<Served, CacheError> {
        let expires_at = match request.expires_at {
            Some(expires_at) => expires_at,
            None => self.store.clock().now() + self.horizon(family).await,
        };

        let mut draft = NewCacheRecord {
            owner_id: caller.id().to_string(),
            subject: request.subject,
            cache_key: request.cache_key,
            payload: request.payload,
            auxiliary_inputs: request.auxiliary_inputs,
            expires_at,
        };

        let cache = self.store.cache(family, caller);
        let mut retries = 0;
        let mut hops = 0;

        loop {
            match cache.put(draft.clone()).await {
                Ok(record) => {
                    Self::record_fill(family, ServedFrom::Inserted);
                    return Ok(Served {
                        record,
                        source: ServedFrom::Inserted,
                    });
                }
                Err(CacheError::DuplicateKey(key)) => {
                    let stored = cache.get_by_key(&key).await?;
                    match freshness::evaluate(stored, self.store.clock().now()) {
                        Lookup::Hit(record) => {
                            debug!(
                                event = "cache_fill_converged",
                                family = %family,
                                cache_key = %key,
                                "Lost fill race, serving the stored record"
                            );
                            Self::record_fill(family, ServedFrom::Converged);
                            return Ok(Served {
                                record,
                                source: ServedFrom::Converged,
                            });
                        }
                        Lookup::Expired(stale) if hops < MAX_SUCCESSOR_HOPS => {
                            debug!(
                                family = %family,
                                cache_key = %key,
                                "Key holds an expired record, filling its successor"
                            );
                            draft.cache_key = cache_key::successor(&key, stale.generated_at);
                            hops += 1;
                        }
                        Lookup::Miss if retries < FILL_RETRIES => {
                            debug!(
                                family = %family,
                                cache_key = %key,
                                "Fill winner vanished, retrying"
                            );
                            retries += 1;
                        }
                        _ => return Err(CacheError::DuplicateKey(key)),
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_or_compute(
        &self,
        caller: &Caller,
        family: CacheFamily,
        subject: Subject,
        inputs: &Value,
        calculator: &dyn ChartCalculator,
    ) -> Result<Served, CacheError> {
        subject.ensure_fits(family)?;

        let now = self.store.clock().now();
        let horizon = self.horizon(family).await;
        // Windowed keys expire with their window, so the next window's key
        // never misses a record that is still live.
        let base = cache_key::derive_windowed(family, &subject, inputs, now, horizon);

        // An expired row keeps its key, so its replacement goes under a
        // successor key derived from the stale row. Follow that chain.
        let mut key = base;
        let mut hops = 0;
        loop {
            match self.lookup(caller, family, &key).await? {
                Lookup::Hit(record) => {
                    return Ok(Served {
                        record,
                        source: ServedFrom::Cache,
                    });
                }
                Lookup::Miss => break,
                Lookup::Expired(stale) if hops < MAX_SUCCESSOR_HOPS => {
                    key = cache_key::successor(&key, stale.generated_at);
                    hops += 1;
                }
                Lookup::Expired(_) => {
                    key = cache_key::successor(&key, now);
                    break;
                }
            }
        }

        info!(
            event = "cache_recompute",
            family = %family,
            subject = %subject.primary(),
            "Computing chart artifact"
        );

        let computation = calculator
            .compute(family, &subject, inputs)
            .await
            .map_err(|e| CacheError::Internal(format!("chart calculation failed: {e}")))?;

        self.fill(
            caller,
            family,
            FillRequest {
                subject,
                cache_key: key,
                payload: computation.payload,
                auxiliary_inputs: computation.auxiliary_inputs,
                expires_at: Some(cache_key::window_end(now, horizon)),
            },
        )
        .await
    }

    async fn set_auxiliary_inputs(
        &self,
        caller: &Caller,
        family: CacheFamily,
        record_id: &str,
        auxiliary_inputs: Option<Value>,
    ) -> Result<Option<CacheRecord>, CacheError> {
        self.store
            .cache(family, caller)
            .set_auxiliary_inputs(record_id, auxiliary_inputs)
            .await
    }

    async fn remove(
        &self,
        caller: &Caller,
        family: CacheFamily,
        record_id: &str,
    ) -> Result<bool, CacheError> {
        let removed = self.store.cache(family, caller).delete(record_id).await?;
        if removed {
            debug!(
                event = "cache_record_deleted",
                family = %family,
                record_id = %record_id,
                "Deleted cache record"
            );
        }
        Ok(removed)
    }
}
