//! Join request endpoints.
//!
//! - `POST /api/join-requests` - apply to a community (no account needed)
//! - `GET /api/communities/:id/join-requests` - pending requests (admins)
//! - `POST /api/join-requests/:id/approve` - approve and link the account
//! - `POST /api/join-requests/:id/reject` - reject

use crate::WebResult;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{CommunityId, JoinRequest, JoinRequestId};
use roomly_engine::{Approval, NewJoinRequest};

/// Submit a join request.
///
/// # Errors
///
/// 422 for missing fields, 404 for an unknown community.
pub async fn submit<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Json(request): Json<NewJoinRequest>,
) -> WebResult<(StatusCode, Json<JoinRequest>)> {
    let request = state.roomly.join_requests.submit(request).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Pending requests of a community, newest first.
///
/// # Errors
///
/// 403 for non-admins.
pub async fn pending<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(community_id): Path<CommunityId>,
) -> WebResult<Json<Vec<JoinRequest>>> {
    Ok(Json(
        state
            .roomly
            .join_requests
            .pending_for(actor, community_id)
            .await?,
    ))
}

/// Approve a pending request.
///
/// # Errors
///
/// 403 for non-admins, 409 `INVALID_STATE` if already decided.
pub async fn approve<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(request_id): Path<JoinRequestId>,
) -> WebResult<Json<Approval>> {
    Ok(Json(
        state.roomly.join_requests.approve(actor, request_id).await?,
    ))
}

/// Reject a pending request.
///
/// # Errors
///
/// 403 for non-admins, 409 `INVALID_STATE` if already decided.
pub async fn reject<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Path(request_id): Path<JoinRequestId>,
) -> WebResult<Json<JoinRequest>> {
    Ok(Json(
        state.roomly.join_requests.reject(actor, request_id).await?,
    ))
}
