//! Cache endpoints for the three chart families.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::str::FromStr;
use std::sync::Arc;

use super::{
    ApiError, ApiResponse, AppState, CacheLookupDto, DeleteResultDto, FillCacheRequest,
    ServedDto, UpdateAuxiliaryInputsRequest,
};
use crate::domain::{CacheFamily, Caller, Subject, cache_key};
use crate::services::FillRequest;

fn parse_family(raw: &str) -> Result<CacheFamily, ApiError> {
    CacheFamily::from_str(raw).map_err(ApiError::from)
}

/// `POST /api/cache/{family}`
pub async fn fill(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(family): Path<String>,
    Json(body): Json<FillCacheRequest>,
) -> Result<Json<ApiResponse<ServedDto>>, ApiError> {
    let family = parse_family(&family)?;

    let subject = match body.counterpart_profile_id {
        Some(counterpart) => Subject::pair(body.profile_id, counterpart)?,
        None => Subject::profile(body.profile_id),
    };
    subject.ensure_fits(family)?;

    let (key, expires_at) = match (body.cache_key, &body.inputs) {
        (Some(key), _) => (key, body.expires_at),
        (None, Some(inputs)) => {
            let horizon = state.config().read().await.cache.horizon(family);
            let now = state.store().clock().now();
            let window_end = cache_key::window_end(now, horizon);
            (
                cache_key::derive_windowed(family, &subject, inputs, now, horizon),
                Some(body.expires_at.map_or(window_end, |at| at.min(window_end))),
            )
        }
        (None, None) => {
            return Err(ApiError::validation(
                "Either cache_key or inputs must be provided",
            ));
        }
    };

    let served = state
        .cache_service()
        .fill(
            &caller,
            family,
            FillRequest {
                subject,
                cache_key: key,
                payload: body.payload,
                auxiliary_inputs: body.auxiliary_inputs,
                expires_at,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(ServedDto::from(served))))
}

/// `GET /api/cache/{family}/keys/{cache_key}`
pub async fn get_by_key(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((family, key)): Path<(String, String)>,
) -> Result<Json<ApiResponse<CacheLookupDto>>, ApiError> {
    let family = parse_family(&family)?;
    let lookup = state.cache_service().lookup(&caller, family, &key).await?;
    Ok(Json(ApiResponse::success(CacheLookupDto::from(lookup))))
}

/// `GET /api/profiles/{id}/cache/{family}/latest`
pub async fn latest_for_profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((profile_id, family)): Path<(String, String)>,
) -> Result<Json<ApiResponse<CacheLookupDto>>, ApiError> {
    let family = parse_family(&family)?;
    let lookup = state
        .cache_service()
        .latest(&caller, family, &profile_id)
        .await?;
    Ok(Json(ApiResponse::success(CacheLookupDto::from(lookup))))
}

/// `PATCH /api/cache/{family}/records/{id}`
pub async fn update_auxiliary_inputs(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((family, id)): Path<(String, String)>,
    Json(body): Json<UpdateAuxiliaryInputsRequest>,
) -> Result<Json<ApiResponse<crate::domain::CacheRecord>>, ApiError> {
    let family = parse_family(&family)?;
    let record = state
        .cache_service()
        .set_auxiliary_inputs(&caller, family, &id, body.auxiliary_inputs)
        .await?
        .ok_or_else(|| ApiError::not_found("Cache record", &id))?;
    Ok(Json(ApiResponse::success(record)))
}

/// `DELETE /api/cache/{family}/records/{id}`
///
/// Succeeds whether or not the record still existed.
pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path((family, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DeleteResultDto>>, ApiError> {
    let family = parse_family(&family)?;
    let deleted = state.cache_service().remove(&caller, family, &id).await?;
    Ok(Json(ApiResponse::success(DeleteResultDto { deleted })))
}
