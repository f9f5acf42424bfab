//! Router configuration.
//!
//! Builds the complete Axum router with every endpoint.

use crate::handlers::{
    analytics, directory, feed, health_check, join_requests, points, reservations,
};
use crate::middleware::request_id;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use roomly_core::repository::{DataStore, ObjectStorage};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// Routes:
/// - `/health` (no identity needed)
/// - reservations, availability and the audit view
/// - points, leaderboards and reconciliation
/// - join requests
/// - the community feed
/// - profiles, communities and amenities
/// - analytics
///
/// Every request is tagged with a request ID, traced and allowed through CORS.
pub fn build_router<S, O>(state: AppState<S, O>) -> Router
where
    S: DataStore,
    O: ObjectStorage + Clone + 'static,
{
    let api_routes = Router::new()
        // Reservations
        .route(
            "/reservations",
            post(reservations::create_reservation::<S, O>),
        )
        .route(
            "/reservations/:id/cancel",
            post(reservations::cancel_reservation::<S, O>),
        )
        .route(
            "/reservations/:id/grade",
            post(reservations::grade_reservation::<S, O>),
        )
        .route(
            "/users/:id/reservations",
            get(reservations::list_user_reservations::<S, O>),
        )
        .route(
            "/amenities/:id/reservations",
            get(reservations::list_amenity_reservations::<S, O>),
        )
        .route(
            "/amenities/:id/availability",
            get(reservations::availability::<S, O>),
        )
        .route("/audit/reservations", get(reservations::audit::<S, O>))
        // Points
        .route("/users/:id/points", get(points::point_summary::<S, O>))
        .route(
            "/leaderboard/communities",
            get(points::community_leaderboard::<S, O>),
        )
        .route(
            "/communities/:id/leaderboard",
            get(points::resident_leaderboard::<S, O>),
        )
        .route("/admin/reconcile", post(points::reconcile::<S, O>))
        // Join requests
        .route("/join-requests", post(join_requests::submit::<S, O>))
        .route(
            "/communities/:id/join-requests",
            get(join_requests::pending::<S, O>),
        )
        .route(
            "/join-requests/:id/approve",
            post(join_requests::approve::<S, O>),
        )
        .route(
            "/join-requests/:id/reject",
            post(join_requests::reject::<S, O>),
        )
        // Feed
        .route("/posts", post(feed::create_post::<S, O>))
        .route("/posts/:id/comments", post(feed::add_comment::<S, O>))
        .route(
            "/posts/:id/like",
            post(feed::like_post::<S, O>).delete(feed::unlike_post::<S, O>),
        )
        .route(
            "/communities/:id/posts",
            get(feed::community_posts::<S, O>),
        )
        .route("/me/likes", get(feed::liked_posts::<S, O>))
        // Directory
        .route("/users", post(directory::create_profile::<S, O>))
        .route(
            "/me",
            get(directory::me::<S, O>).put(directory::update_me::<S, O>),
        )
        .route("/me/avatar", post(directory::set_avatar::<S, O>))
        .route(
            "/users/:id/status",
            put(directory::set_user_status::<S, O>),
        )
        .route(
            "/communities",
            get(directory::list_communities::<S, O>).post(directory::create_community::<S, O>),
        )
        .route(
            "/communities/:id/members",
            get(directory::community_members::<S, O>),
        )
        .route(
            "/amenities",
            get(directory::list_amenities::<S, O>).post(directory::create_amenity::<S, O>),
        )
        .route("/amenities/:id", put(directory::update_amenity::<S, O>))
        // Analytics
        .route("/analytics", get(analytics::report::<S, O>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
