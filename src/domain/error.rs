use thiserror::Error;

/// Errors raised by the cache store and its access guard.
///
/// A cache miss is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Forbidden: caller {caller} may not access records owned by {owner}")]
    Forbidden { caller: String, owner: String },

    #[error("Cache key already exists: {0}")]
    DuplicateKey(String),

    #[error("Invalid expiry {expires_at}: must be after {generated_at} and before year 10000")]
    InvalidExpiry {
        generated_at: String,
        expires_at: String,
    },

    #[error("Profile {0} cannot be compared with itself")]
    SelfComparison(String),

    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    #[error("Profile not found: {0}")]
    SubjectNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    #[must_use]
    pub fn forbidden(caller: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::Forbidden {
            caller: caller.into(),
            owner: owner.into(),
        }
    }
}

impl From<sea_orm::DbErr> for CacheError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("payload encoding: {err}"))
    }
}

impl From<anyhow::Error> for CacheError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
