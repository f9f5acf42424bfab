//! Points and leaderboard endpoints.
//!
//! - `GET /api/users/:id/points` - total, level and history
//! - `GET /api/leaderboard/communities` - communities by total points
//! - `GET /api/communities/:id/leaderboard` - active residents by points
//! - `POST /api/admin/reconcile` - recompute cached totals from the ledger

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_core::types::{CommunityId, UserId};
use roomly_engine::leaderboard::{CommunityStanding, ResidentStanding};
use roomly_engine::{PointsSummary, ReconciliationReport};

/// A resident's points, level and ledger history.
///
/// # Errors
///
/// 404 for an unknown user.
pub async fn point_summary<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(user_id): Path<UserId>,
) -> WebResult<Json<PointsSummary>> {
    Ok(Json(state.roomly.leaderboard.point_summary(user_id).await?))
}

/// Communities ranked by their cached total.
///
/// # Errors
///
/// 500 on store failure.
pub async fn community_leaderboard<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
) -> WebResult<Json<Vec<CommunityStanding>>> {
    Ok(Json(state.roomly.leaderboard.community_leaderboard().await?))
}

/// Active residents of a community ranked by points.
///
/// # Errors
///
/// 404 for an unknown community.
pub async fn resident_leaderboard<S: DataStore, O: ObjectStorage>(
    State(state): State<AppState<S, O>>,
    Path(community_id): Path<CommunityId>,
) -> WebResult<Json<Vec<ResidentStanding>>> {
    let standings = state
        .roomly
        .leaderboard
        .resident_leaderboard(community_id)
        .await?;
    Ok(Json(standings))
}

/// Recompute every cached total from the ledger (admins only).
///
/// # Errors
///
/// 403 for non-admins.
pub async fn reconcile<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
) -> WebResult<Json<ReconciliationReport>> {
    let caller = state.roomly.directory.profile(actor).await?;
    if !caller.is_admin() {
        return Err(AppError::forbidden("Only admins can reconcile points"));
    }

    let report = state.roomly.points.reconcile_all().await?;
    if !report.is_clean() {
        tracing::warn!(
            user_drift = report.user_drift.len(),
            community_drift = report.community_drift.len(),
            "Reconciliation corrected cached totals"
        );
    }
    Ok(Json(report))
}
