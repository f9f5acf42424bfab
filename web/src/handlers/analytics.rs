//! Admin analytics endpoint.

use super::CommunityFilter;
use crate::WebResult;
use crate::extractors::Actor;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use roomly_core::repository::{DataStore, ObjectStorage};
use roomly_engine::AnalyticsReport;

/// Dashboard figures for the admin's own community.
///
/// ```text
/// GET /api/analytics?community_id=...
/// ```
///
/// # Errors
///
/// 403 for non-admins and for another community's `community_id`.
pub async fn report<S: DataStore, O: ObjectStorage>(
    Actor(actor): Actor,
    State(state): State<AppState<S, O>>,
    Query(filter): Query<CommunityFilter>,
) -> WebResult<Json<AnalyticsReport>> {
    Ok(Json(
        state
            .roomly
            .analytics
            .report(actor, filter.community_id)
            .await?,
    ))
}
