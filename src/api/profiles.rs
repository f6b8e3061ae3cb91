use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, DeleteResultDto, RenameProfileRequest};
use crate::domain::Caller;
use crate::services::{CreateProfileRequest, ProfileDto};

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<Vec<ProfileDto>>>, ApiError> {
    let profiles = state.profile_service().list(&caller).await?;
    Ok(Json(ApiResponse::success(profiles)))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let profile = state.profile_service().get(&caller, &id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let profile = state.profile_service().create(&caller, payload).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn rename_profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(payload): Json<RenameProfileRequest>,
) -> Result<Json<ApiResponse<ProfileDto>>, ApiError> {
    let profile = state
        .profile_service()
        .rename(&caller, &id, &payload.name)
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Removes the profile together with every cached chart about it.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteResultDto>>, ApiError> {
    state.profile_service().delete(&caller, &id).await?;
    Ok(Json(ApiResponse::success(DeleteResultDto { deleted: true })))
}
