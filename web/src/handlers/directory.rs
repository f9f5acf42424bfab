//! Profile, community and amenity endpoints.
//!
//! - `POST /api/users` - create a profile after sign-up
//! - `GET /api/me`, `PUT /api/me` - the caller's profile
//! - `POST /api/me/avatar` - upload a profile photo (raw body)
//! - `PUT /api/users/:id/status` - activate or deactivate (admins)
//! - `GET /api/communities`, `POST /api/communities`
//! - `GET /api/communities/:id/members`
//! - `GET /api/amenities?community_id=`, `POST /api/amenities`,
//!   `PUT /api/amenities/:id` (admins)

use super::CommunityFilter;
use crate::WebResult;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{Amenity, AmenityId, Community, CommunityId, User, UserId, UserStatus};
use roomly_engine::directory::{AmenityUpdate, NewAmenity, NewCommunity, NewProfile, ProfileUpdate};
use roomly_engine::{Rewarded, Upload};
use serde::Deserialize;

/// Header naming an uploaded file.
pub const FILE_NAME_HEADER: &str = "X-File-Name";

/// Request to change an account's status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `ACTIVE` or `INACTIVE`
    pub status: UserStatus,
}

/// Create a profile for a freshly signed-up account.
///
/// # Errors
///
/// 422 for missing fields, 409 if the e-mail is taken.
pub async fn create_profile<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Json(profile): Json<NewProfile>,
) -> WebResult<(StatusCode, Json<User>)> {
    let user = state.roomly.directory.create_profile(profile).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's profile.
///
/// # Errors
///
/// 404 if the caller has no profile.
pub async fn me<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
) -> WebResult<Json<User>> {
    Ok(Json(state.roomly.directory.profile(actor).await?))
}

/// Update the caller's name, tower or apartment.
///
/// # Errors
///
/// 422 for an empty name, 404 if the caller has no profile.
pub async fn update_me<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Json(update): Json<ProfileUpdate>,
) -> WebResult<Json<User>> {
    Ok(Json(
        state.roomly.directory.update_profile(actor, update).await?,
    ))
}

/// Upload the caller's profile photo. The body is the image itself; the
/// file name comes from `X-File-Name`.
///
/// # Errors
///
/// 422 for an empty body, 500 if the upload fails.
pub async fn set_avatar<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    headers: HeaderMap,
    body: Bytes,
) -> WebResult<Json<Rewarded<User>>> {
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("avatar")
        .to_string();

    let upload = Upload {
        file_name,
        bytes: body.to_vec(),
    };
    Ok(Json(state.roomly.directory.set_avatar(actor, upload).await?))
}

/// Activate or deactivate an account.
///
/// # Errors
///
/// 403 for non-admins, 404 for an unknown user.
pub async fn set_user_status<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(user_id): Path<UserId>,
    Json(request): Json<StatusRequest>,
) -> WebResult<Json<User>> {
    let user = state
        .roomly
        .directory
        .set_user_status(actor, user_id, request.status)
        .await?;
    Ok(Json(user))
}

/// Every community, by name.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_communities<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
) -> WebResult<Json<Vec<Community>>> {
    Ok(Json(state.roomly.directory.list_communities().await?))
}

/// Register a community; the caller becomes its admin.
///
/// # Errors
///
/// 422 for missing fields or zero dimensions.
pub async fn create_community<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Json(input): Json<NewCommunity>,
) -> WebResult<(StatusCode, Json<Community>)> {
    let community = state.roomly.directory.create_community(actor, input).await?;
    Ok((StatusCode::CREATED, Json(community)))
}

/// Members of a community, by points.
///
/// # Errors
///
/// 404 for an unknown community.
pub async fn community_members<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(community_id): Path<CommunityId>,
) -> WebResult<Json<Vec<User>>> {
    Ok(Json(
        state.roomly.directory.community_members(community_id).await?,
    ))
}

/// Amenities, optionally of one community.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_amenities<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Query(filter): Query<CommunityFilter>,
) -> WebResult<Json<Vec<Amenity>>> {
    Ok(Json(
        state.roomly.directory.list_amenities(filter.community_id).await?,
    ))
}

/// Create an amenity.
///
/// # Errors
///
/// 403 for non-admins, 422 for invalid capacity or reward.
pub async fn create_amenity<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Json(input): Json<NewAmenity>,
) -> WebResult<(StatusCode, Json<Amenity>)> {
    let amenity = state.roomly.directory.create_amenity(actor, input).await?;
    Ok((StatusCode::CREATED, Json(amenity)))
}

/// Update an amenity.
///
/// # Errors
///
/// 403 for non-admins, 404 for an unknown amenity.
pub async fn update_amenity<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(amenity_id): Path<AmenityId>,
    Json(update): Json<AmenityUpdate>,
) -> WebResult<Json<Amenity>> {
    let amenity = state
        .roomly
        .directory
        .update_amenity(actor, amenity_id, update)
        .await?;
    Ok(Json(amenity))
}
