//! # Roomly Engine
//!
//! Workflows of the Roomly community backend, generic over the repository
//! traits in `roomly-core`:
//!
//! - [`ReservationManager`]: booking with slot exclusivity and category rate
//!   limits, cancellation, grading, availability and audit queries
//! - [`PointsCoordinator`]: the points saga (ledger, user total, community
//!   total) and reconciliation of the cached totals from the ledger
//! - [`Leaderboard`]: community and resident rankings, point summaries
//! - [`JoinRequestWorkflow`]: submitting and deciding join requests
//! - [`Feed`]: posts, comments and likes
//! - [`Directory`]: profiles, communities and amenities
//! - [`Analytics`]: admin dashboard figures
//!
//! [`Roomly`] wires them together over one store, one object storage and one
//! clock.
//!
//! ## Example
//!
//! ```
//! use roomly_engine::{BookingPolicy, Roomly};
//! use roomly_testing::{Fixtures, InMemoryObjectStorage, InMemoryStore, test_clock};
//! use roomly_core::environment::Clock;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let fx = Fixtures::seed(&store, &test_clock()).await.unwrap();
//! let roomly = Roomly::new(
//!     store,
//!     InMemoryObjectStorage::new(),
//!     Arc::new(test_clock()),
//!     BookingPolicy::default(),
//! );
//!
//! let tomorrow = test_clock().today().succ_opt().unwrap();
//! let booking = roomly
//!     .reservations
//!     .create(fx.alice.id, fx.pool.id, tomorrow, "10:00-11:00")
//!     .await
//!     .unwrap();
//! assert_eq!(booking.points.points(), 50);
//! # });
//! ```

mod access;
pub mod analytics;
pub mod directory;
pub mod feed;
pub mod join_requests;
pub mod leaderboard;
pub mod metrics;
pub mod points;
pub mod policy;
pub mod reservations;

pub use analytics::{Analytics, AnalyticsReport};
pub use directory::Directory;
pub use feed::{Feed, Upload};
pub use join_requests::{Approval, JoinRequestWorkflow, NewJoinRequest};
pub use leaderboard::{Leaderboard, PointsSummary};
pub use points::{
    AwardOutcome, PointsCoordinator, PointsStatus, ReconciliationReport, Rewarded, StepOutcome,
};
pub use policy::BookingPolicy;
pub use reservations::{Booking, ReservationManager, SlotAvailability};

use roomly_core::environment::Clock;
use roomly_core::repository::{DataStore, ObjectStorage};
use std::sync::Arc;

/// Every workflow, sharing one store, object storage and clock.
pub struct Roomly<S, O> {
    /// Bookings
    pub reservations: ReservationManager<S>,
    /// Points saga and reconciliation
    pub points: Arc<PointsCoordinator<S>>,
    /// Rankings
    pub leaderboard: Leaderboard<S>,
    /// Join requests
    pub join_requests: JoinRequestWorkflow<S>,
    /// Community feed
    pub feed: Feed<S, O>,
    /// Profiles, communities, amenities
    pub directory: Directory<S, O>,
    /// Admin analytics
    pub analytics: Analytics<S>,
}

impl<S: DataStore, O: ObjectStorage + Clone> Roomly<S, O> {
    /// Wire every workflow over `store`.
    pub fn new(store: S, storage: O, clock: Arc<dyn Clock>, policy: BookingPolicy) -> Self {
        let points = Arc::new(PointsCoordinator::new(store.clone(), Arc::clone(&clock)));

        Self {
            reservations: ReservationManager::new(
                store.clone(),
                Arc::clone(&points),
                Arc::clone(&clock),
                policy,
            ),
            leaderboard: Leaderboard::new(store.clone()),
            join_requests: JoinRequestWorkflow::new(store.clone(), Arc::clone(&clock)),
            feed: Feed::new(
                store.clone(),
                storage.clone(),
                Arc::clone(&points),
                Arc::clone(&clock),
            ),
            directory: Directory::new(store.clone(), storage, Arc::clone(&points), clock),
            analytics: Analytics::new(store),
            points,
        }
    }
}
