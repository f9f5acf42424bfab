//! Application state for Axum handlers.

use roomly_engine::Roomly;
use std::sync::Arc;

/// State shared across all HTTP handlers: every engine workflow over one
/// store `S` and one object storage `O`.
pub struct AppState<S, O> {
    /// The engine
    pub roomly: Arc<Roomly<S, O>>,
}

impl<S, O> AppState<S, O> {
    /// Wrap an engine for sharing across handlers.
    #[must_use]
    pub fn new(roomly: Roomly<S, O>) -> Self {
        Self {
            roomly: Arc::new(roomly),
        }
    }
}

// Manual impl: `Roomly` itself is not `Clone`, only the `Arc` needs to be.
impl<S, O> Clone for AppState<S, O> {
    fn clone(&self) -> Self {
        Self {
            roomly: Arc::clone(&self.roomly),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomly_testing::{InMemoryObjectStorage, InMemoryStore};

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState<InMemoryStore, InMemoryObjectStorage>>();
    }
}
