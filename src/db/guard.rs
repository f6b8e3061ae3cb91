//! Owner-scoped access to cache records and profiles.
//!
//! These handles are the only way to reach the underlying repositories, so
//! every read and write is checked against the authenticated [`Caller`]
//! before it touches storage, the same guarantee row-level security gives a
//! database-backed deployment.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::repositories::cache::CacheRepository;
use super::repositories::profile::{NewProfile, ProfileRepository};
use crate::clock::Clock;
use crate::domain::{
    CacheError, CacheFamily, CacheRecord, Caller, NewCacheRecord, cache_key, format_timestamp,
};
use crate::entities::profiles;

pub struct ScopedCache {
    repo: CacheRepository,
    profiles: ProfileRepository,
    family: CacheFamily,
    caller: Caller,
    clock: Arc<dyn Clock>,
}

impl ScopedCache {
    pub(crate) fn new(
        repo: CacheRepository,
        profiles: ProfileRepository,
        family: CacheFamily,
        caller: Caller,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            profiles,
            family,
            caller,
            clock,
        }
    }

    fn ensure_owner(&self, owner_id: &str) -> Result<(), CacheError> {
        if self.caller.owns(owner_id) {
            Ok(())
        } else {
            warn!(
                event = "cache_access_denied",
                family = %self.family,
                caller = %self.caller,
                owner = %owner_id,
                "Rejected cross-owner cache access"
            );
            Err(CacheError::forbidden(self.caller.id(), owner_id))
        }
    }

    /// Stores a freshly computed artifact.
    ///
    /// The key is stored with its family tag, see [`cache_key::qualify`].
    /// Fails with `DuplicateKey` when the key is taken; callers that race on
    /// the same key should fall back to [`Self::get_by_key`].
    pub async fn put(&self, mut record: NewCacheRecord) -> Result<CacheRecord, CacheError> {
        self.ensure_owner(&record.owner_id)?;

        let now = self.clock.now();
        record.validate(self.family, now)?;
        record.cache_key = cache_key::qualify(self.family, &record.cache_key);

        for profile_id in record.subject.profile_ids() {
            let profile = self
                .profiles
                .get(profile_id)
                .await?
                .ok_or_else(|| CacheError::SubjectNotFound(profile_id.to_string()))?;
            self.ensure_owner(&profile.user_id)?;
        }

        let stored = self.repo.insert(record, now).await?;

        debug!(
            event = "cache_record_stored",
            family = %self.family,
            record_id = %stored.id,
            cache_key = %stored.cache_key,
            expires_at = %format_timestamp(stored.expires_at),
            "Stored cache record"
        );

        Ok(stored)
    }

    /// Returns the raw row for `cache_key`, expired or not.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<CacheRecord>, CacheError> {
        let key = cache_key::qualify(self.family, key);
        let Some(record) = self.repo.find_by_key(&key).await? else {
            return Ok(None);
        };

        self.ensure_owner(&record.owner_id)?;
        Ok(Some(record))
    }

    pub async fn get_by_id(&self, record_id: &str) -> Result<Option<CacheRecord>, CacheError> {
        let Some(record) = self.repo.find_by_id(record_id).await? else {
            return Ok(None);
        };

        self.ensure_owner(&record.owner_id)?;
        Ok(Some(record))
    }

    /// Most recently generated record for `(owner_id, profile_id)`,
    /// regardless of validity.
    pub async fn get_latest_for_subject(
        &self,
        owner_id: &str,
        profile_id: &str,
    ) -> Result<Option<CacheRecord>, CacheError> {
        self.ensure_owner(owner_id)?;
        self.repo.latest_for_subject(owner_id, profile_id).await
    }

    /// Idempotent: returns `false` when the record is already gone.
    pub async fn delete(&self, record_id: &str) -> Result<bool, CacheError> {
        let Some(record) = self.repo.find_by_id(record_id).await? else {
            return Ok(false);
        };

        self.ensure_owner(&record.owner_id)?;
        self.repo.delete_by_id(record_id).await
    }

    /// Replaces the auxiliary inputs of an existing record. Owner, subject,
    /// key, payload and expiry are never rewritten.
    pub async fn set_auxiliary_inputs(
        &self,
        record_id: &str,
        auxiliary_inputs: Option<Value>,
    ) -> Result<Option<CacheRecord>, CacheError> {
        let Some(record) = self.repo.find_by_id(record_id).await? else {
            return Ok(None);
        };

        self.ensure_owner(&record.owner_id)?;

        let now = self.clock.now();
        if !self
            .repo
            .update_auxiliary_inputs(record_id, auxiliary_inputs.as_ref(), now)
            .await?
        {
            return Ok(None);
        }

        self.repo.find_by_id(record_id).await
    }
}

pub struct ScopedProfiles {
    repo: ProfileRepository,
    caller: Caller,
    clock: Arc<dyn Clock>,
}

impl ScopedProfiles {
    pub(crate) fn new(repo: ProfileRepository, caller: Caller, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            caller,
            clock,
        }
    }

    fn ensure_owner(&self, profile: &profiles::Model) -> Result<(), CacheError> {
        if self.caller.owns(&profile.user_id) {
            Ok(())
        } else {
            Err(CacheError::forbidden(self.caller.id(), &profile.user_id))
        }
    }

    pub async fn create(&self, profile: NewProfile) -> Result<profiles::Model, CacheError> {
        let now = format_timestamp(self.clock.now());
        Ok(self.repo.create(self.caller.id(), profile, &now).await?)
    }

    pub async fn list(&self) -> Result<Vec<profiles::Model>, CacheError> {
        Ok(self.repo.list_for_user(self.caller.id()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<profiles::Model>, CacheError> {
        let Some(profile) = self.repo.get(id).await? else {
            return Ok(None);
        };

        self.ensure_owner(&profile)?;
        Ok(Some(profile))
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Option<profiles::Model>, CacheError> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        let now = format_timestamp(self.clock.now());
        Ok(self.repo.rename(id, name, &now).await?)
    }

    /// Deletes the profile and, by cascade, every cache record about it.
    pub async fn delete(&self, id: &str) -> Result<bool, CacheError> {
        if self.get(id).await?.is_none() {
            return Ok(false);
        }

        Ok(self.repo.delete(id).await?)
    }
}
