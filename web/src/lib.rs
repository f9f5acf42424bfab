//! HTTP surface of the Roomly community backend.
//!
//! Thin Axum handlers over the workflows in `roomly-engine`. Each request:
//!
//! 1. **Extract** the caller ([`Actor`], from `X-User-Id`) and the payload
//! 2. **Call** one engine operation
//! 3. **Map** the result to JSON, or the [`RoomlyError`](roomly_core::error::RoomlyError)
//!    to a status code through [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use roomly_web::{AppState, build_router};
//!
//! let state = AppState::new(roomly);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::AppError;
pub use extractors::{Actor, USER_ID_HEADER};
pub use metrics::{install_recorder, metrics_router};
pub use middleware::{REQUEST_ID_HEADER, RequestId, request_id};
pub use router::build_router;
pub use state::AppState;
pub use storage::LocalObjectStorage;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
