//! `SeaORM` implementation of the `ProfileService` trait.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tracing::info;

use crate::db::{NewProfile, Store};
use crate::domain::Caller;
use crate::services::profile_service::{
    CreateProfileRequest, ProfileDto, ProfileError, ProfileService,
};

pub struct SeaOrmProfileService {
    store: Store,
}

impl SeaOrmProfileService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    fn validate_name(name: &str) -> Result<(), ProfileError> {
        if name.trim().is_empty() {
            return Err(ProfileError::Validation(
                "Profile name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate(request: &CreateProfileRequest) -> Result<(), ProfileError> {
        Self::validate_name(&request.name)?;

        if NaiveDate::parse_from_str(&request.birth_date, "%Y-%m-%d").is_err() {
            return Err(ProfileError::Validation(format!(
                "Invalid birth date: {} (expected YYYY-MM-DD)",
                request.birth_date
            )));
        }

        let time_ok = NaiveTime::parse_from_str(&request.birth_time, "%H:%M:%S").is_ok()
            || NaiveTime::parse_from_str(&request.birth_time, "%H:%M").is_ok();
        if !time_ok {
            return Err(ProfileError::Validation(format!(
                "Invalid birth time: {} (expected HH:MM or HH:MM:SS)",
                request.birth_time
            )));
        }

        if !(-90.0..=90.0).contains(&request.latitude) {
            return Err(ProfileError::Validation(format!(
                "Latitude out of range: {}",
                request.latitude
            )));
        }

        if !(-180.0..=180.0).contains(&request.longitude) {
            return Err(ProfileError::Validation(format!(
                "Longitude out of range: {}",
                request.longitude
            )));
        }

        let tz = request.timezone.trim();
        if tz.is_empty() || tz.contains(char::is_whitespace) {
            return Err(ProfileError::Validation(format!(
                "Invalid timezone: '{}'",
                request.timezone
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ProfileService for SeaOrmProfileService {
    async fn list(&self, caller: &Caller) -> Result<Vec<ProfileDto>, ProfileError> {
        let profiles = self.store.profiles(caller).list().await?;
        Ok(profiles.into_iter().map(ProfileDto::from).collect())
    }

    async fn get(&self, caller: &Caller, id: &str) -> Result<ProfileDto, ProfileError> {
        self.store
            .profiles(caller)
            .get(id)
            .await?
            .map(ProfileDto::from)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    async fn create(
        &self,
        caller: &Caller,
        request: CreateProfileRequest,
    ) -> Result<ProfileDto, ProfileError> {
        Self::validate(&request)?;

        let profile = self
            .store
            .profiles(caller)
            .create(NewProfile {
                name: request.name.trim().to_string(),
                birth_date: request.birth_date,
                birth_time: request.birth_time,
                birth_place: request.birth_place,
                latitude: request.latitude,
                longitude: request.longitude,
                timezone: request.timezone.trim().to_string(),
            })
            .await?;

        info!(event = "profile_created", profile_id = %profile.id, "Created birth profile");

        Ok(ProfileDto::from(profile))
    }

    async fn rename(
        &self,
        caller: &Caller,
        id: &str,
        name: &str,
    ) -> Result<ProfileDto, ProfileError> {
        Self::validate_name(name)?;

        self.store
            .profiles(caller)
            .rename(id, name.trim())
            .await?
            .map(ProfileDto::from)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    async fn delete(&self, caller: &Caller, id: &str) -> Result<(), ProfileError> {
        if !self.store.profiles(caller).delete(id).await? {
            return Err(ProfileError::NotFound(id.to_string()));
        }

        info!(event = "profile_deleted", profile_id = %id, "Deleted birth profile and its cached charts");
        Ok(())
    }
}
