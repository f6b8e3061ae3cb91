//! Domain service for birth profiles, the subjects of every cached chart.
//!
//! Deleting a profile removes every cached artifact about it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CacheError, Caller};
use crate::entities::profiles;

/// Public representation of a birth profile.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfileDto {
    pub id: String,
    pub name: String,
    pub birth_date: String,
    pub birth_time: String,
    pub birth_place: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<profiles::Model> for ProfileDto {
    fn from(model: profiles::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            birth_date: model.birth_date,
            birth_time: model.birth_time,
            birth_place: model.birth_place,
            latitude: model.latitude,
            longitude: model.longitude,
            timezone: model.timezone,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Fields a client may set when creating a profile. There is deliberately
/// no owner field: the owner is the authenticated caller.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CreateProfileRequest {
    pub name: String,
    pub birth_date: String,
    pub birth_time: String,
    #[serde(default)]
    pub birth_place: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

/// Errors specific to profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ProfileError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            CacheError::SubjectNotFound(id) => Self::NotFound(id),
            CacheError::Database(msg) => Self::Database(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for ProfileError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Domain service trait for profiles.
#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    /// Lists the caller's profiles, oldest first.
    async fn list(&self, caller: &Caller) -> Result<Vec<ProfileDto>, ProfileError>;

    async fn get(&self, caller: &Caller, id: &str) -> Result<ProfileDto, ProfileError>;

    async fn create(
        &self,
        caller: &Caller,
        request: CreateProfileRequest,
    ) -> Result<ProfileDto, ProfileError>;

    async fn rename(&self, caller: &Caller, id: &str, name: &str)
    -> Result<ProfileDto, ProfileError>;

    /// Deletes a profile and, by cascade, its cached artifacts.
    async fn delete(&self, caller: &Caller, id: &str) -> Result<(), ProfileError>;
}
