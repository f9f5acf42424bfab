//! # Roomly Core
//!
//! Domain types and collaborator traits for Roomly, a residential-community
//! management backend: residents join a tower, reserve shared amenities, post
//! to a community feed and earn points that rank them on a leaderboard.
//!
//! This crate is pure data and contracts:
//!
//! - [`types`]: identifiers, entities and lifecycle enums
//! - [`slot`]: the fixed set of bookable hour-long slots
//! - [`points`]: the closed point schedule and the level table
//! - [`error`]: the operation error taxonomy and repository errors
//! - [`environment`]: the [`Clock`](environment::Clock) abstraction
//! - [`repository`]: the data-store and object-storage traits
//!
//! Behaviour lives in `roomly-engine`; storage lives in `roomly-postgres` and
//! `roomly-testing`.
//!
//! ## Example
//!
//! ```
//! use roomly_core::points::level_for;
//! use roomly_core::slot::TimeSlot;
//!
//! let slot: TimeSlot = "10:00-11:00".parse().unwrap();
//! assert_eq!(slot.start_hour(), 10);
//! assert_eq!(level_for(200).name, "Community Leader");
//! ```

pub mod environment;
pub mod error;
pub mod points;
pub mod repository;
pub mod slot;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use error::{Result, RoomlyError, StoreError, StoreResult};
pub use points::{AwardReason, Level, PointAction, level_for};
pub use slot::TimeSlot;
pub use types::*;
