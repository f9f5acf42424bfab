//! # Roomly Testing
//!
//! Testing utilities for Roomly.
//!
//! This crate provides:
//! - [`InMemoryStore`]: every repository trait over in-process tables, with
//!   failure injection
//! - Mock implementations of the injected collaborators (clocks, object storage)
//! - [`Fixtures`]: a seeded community with an admin, residents and amenities
//!
//! ## Example
//!
//! ```
//! use roomly_testing::{Fixtures, InMemoryStore, test_clock};
//! use roomly_core::repository::UserRepository;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryStore::new();
//! let fixtures = Fixtures::seed(&store, &test_clock()).await.unwrap();
//! let admin = store.get_user(fixtures.admin.id).await.unwrap().unwrap();
//! assert!(admin.is_admin());
//! # });
//! ```

use chrono::{DateTime, Utc};
use roomly_core::environment::Clock;

pub mod fixtures;
pub mod store;

/// Mock implementations of injected collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use roomly_core::error::{StoreError, StoreResult};
    use roomly_core::repository::ObjectStorage;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use roomly_testing::mocks::FixedClock;
    /// use roomly_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 09:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle and advance
    /// the clock an engine holds.
    ///
    /// ```
    /// use roomly_testing::mocks::ManualClock;
    /// use roomly_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = ManualClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::days(15));
    /// assert_eq!(clock.now() - before, Duration::days(15));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            if let Ok(mut current) = self.time.lock() {
                *current = time;
            }
        }

        /// Move forward by `delta`
        pub fn advance(&self, delta: chrono::Duration) {
            if let Ok(mut current) = self.time.lock() {
                *current += delta;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time.lock().map_or_else(|poisoned| *poisoned.into_inner(), |t| *t)
        }
    }

    /// Object storage that keeps uploads in memory.
    #[derive(Debug, Clone, Default)]
    pub struct InMemoryObjectStorage {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl InMemoryObjectStorage {
        /// Public URL prefix of stored objects
        pub const BASE_URL: &'static str = "memory://uploads";

        /// Create an empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Bytes stored at `path`, if any
        #[must_use]
        pub fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.objects.lock().ok()?.get(path).cloned()
        }

        /// Number of stored objects
        #[must_use]
        pub fn len(&self) -> usize {
            self.objects.lock().map_or(0, |objects| objects.len())
        }

        /// Returns `true` if nothing was uploaded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// Make subsequent uploads fail (or succeed again)
        pub fn set_failing(&self, failing: bool) {
            if let Ok(mut fail) = self.fail.lock() {
                *fail = failing;
            }
        }
    }

    impl ObjectStorage for InMemoryObjectStorage {
        async fn upload(&self, path: &str, bytes: Vec<u8>) -> StoreResult<String> {
            if self.fail.lock().map(|fail| *fail).unwrap_or(true) {
                return Err(StoreError::Backend("upload rejected".into()));
            }
            self.objects
                .lock()
                .map_err(|_| StoreError::Backend("Mutex lock failed".into()))?
                .insert(path.to_string(), bytes);
            tracing::debug!(path, "Stored object in memory");
            Ok(format!("{}/{path}", Self::BASE_URL))
        }
    }
}

/// Test helpers.
pub mod helpers {
    /// Install a test-friendly tracing subscriber (idempotent).
    ///
    /// Honours `RUST_LOG`; output is captured by the test harness.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use fixtures::Fixtures;
pub use mocks::{FixedClock, InMemoryObjectStorage, ManualClock, test_clock};
pub use store::{FailPoint, InMemoryStore};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use roomly_core::repository::ObjectStorage;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();
        handle.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), test_clock().now() + chrono::Duration::hours(2));
    }

    #[tokio::test]
    async fn test_object_storage_overwrites_and_fails_on_demand() {
        let storage = InMemoryObjectStorage::new();
        let url = storage.upload("avatars/a.png", vec![1]).await.unwrap();
        assert_eq!(url, "memory://uploads/avatars/a.png");
        storage.upload("avatars/a.png", vec![2]).await.unwrap();
        assert_eq!(storage.get("avatars/a.png"), Some(vec![2]));
        assert_eq!(storage.len(), 1);

        storage.set_failing(true);
        assert!(storage.upload("avatars/b.png", vec![3]).await.is_err());
    }
}
