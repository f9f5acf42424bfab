//! HTTP request handlers, organized by domain.
//!
//! Handlers are thin: extract, call one engine operation, serialize. Every
//! rule lives in `roomly-engine`.

pub mod analytics;
pub mod directory;
pub mod feed;
pub mod health;
pub mod join_requests;
pub mod points;
pub mod reservations;

pub use health::health_check;

use roomly_core::types::CommunityId;
use serde::Deserialize;

/// `?community_id=` filter shared by list and report endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CommunityFilter {
    /// Restrict to one community
    pub community_id: Option<CommunityId>,
}
