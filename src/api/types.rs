use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::FamilyStats;
use crate::domain::CacheRecord;
use crate::services::{Freshness, Lookup, Served, ServedFrom};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Result of a cache lookup. Expired rows are returned for inspection but
/// flagged so clients recompute.
#[derive(Debug, Serialize)]
pub struct CacheLookupDto {
    pub freshness: Freshness,
    pub record: Option<CacheRecord>,
}

impl From<Lookup> for CacheLookupDto {
    fn from(lookup: Lookup) -> Self {
        let freshness = lookup.freshness();
        let record = match lookup {
            Lookup::Miss => None,
            Lookup::Expired(record) | Lookup::Hit(record) => Some(record),
        };
        Self { freshness, record }
    }
}

/// Body of `POST /api/cache/{family}`.
///
/// The owner is never part of the body; it is always the authenticated caller.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FillCacheRequest {
    pub profile_id: String,
    #[serde(default)]
    pub counterpart_profile_id: Option<String>,
    /// Explicit key. When absent the key is derived from `inputs`.
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub inputs: Option<Value>,
    pub payload: Value,
    #[serde(default)]
    pub auxiliary_inputs: Option<Value>,
    /// Defaults to now plus the family horizon.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ServedDto {
    pub source: ServedFrom,
    pub record: CacheRecord,
}

impl From<Served> for ServedDto {
    fn from(served: Served) -> Self {
        Self {
            source: served.source,
            record: served.record,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAuxiliaryInputsRequest {
    pub auxiliary_inputs: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameProfileRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResultDto {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database: bool,
    pub caches: Vec<FamilyStats>,
}
