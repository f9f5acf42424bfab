//! End-to-end booking scenarios over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, NaiveDate};
use roomly_core::environment::Clock;
use roomly_core::error::RoomlyError;
use roomly_core::repository::{CommunityRepository, PointLedger, UserRepository};
use roomly_core::types::{Grade, GradeOutcome, ReservationStatus, User};
use roomly_engine::{BookingPolicy, PointsStatus, Roomly};
use roomly_testing::{Fixtures, InMemoryObjectStorage, InMemoryStore, ManualClock, test_clock};
use std::sync::Arc;

struct World {
    store: InMemoryStore,
    clock: ManualClock,
    roomly: Arc<Roomly<InMemoryStore, InMemoryObjectStorage>>,
    fx: Fixtures,
}

async fn world() -> World {
    let store = InMemoryStore::new();
    let clock = ManualClock::new(test_clock().now());
    let fx = Fixtures::seed(&store, &clock).await.unwrap();
    let roomly = Roomly::new(
        store.clone(),
        InMemoryObjectStorage::new(),
        Arc::new(clock.clone()),
        BookingPolicy::default(),
    );
    World {
        store,
        clock,
        roomly: Arc::new(roomly),
        fx,
    }
}

fn next_week() -> NaiveDate {
    test_clock().today() + Duration::days(7)
}

#[tokio::test]
async fn pool_booking_awards_points_and_blocks_the_slot() {
    let w = world().await;

    let booking = w
        .roomly
        .reservations
        .create(w.fx.alice.id, w.fx.pool.id, next_week(), "10:00-11:00")
        .await
        .unwrap();

    assert_eq!(booking.record.status, ReservationStatus::Active);
    assert_eq!(booking.record.grade, Grade::Pending);
    let PointsStatus::Awarded(outcome) = &booking.points else {
        unreachable!("points should be awarded");
    };
    assert_eq!(outcome.entry.action, "RESERVATION_COMPLETED");
    assert_eq!(outcome.entry.points, 50);

    let alice = w.store.get_user(w.fx.alice.id).await.unwrap().unwrap();
    let community = w.store.get_community(w.fx.community.id).await.unwrap().unwrap();
    assert_eq!(alice.points, 50);
    assert_eq!(community.total_points, 50);
    assert_eq!(w.store.list_user_point_logs(w.fx.alice.id).await.unwrap().len(), 1);

    let err = w
        .roomly
        .reservations
        .create(w.fx.bob.id, w.fx.pool.id, next_week(), "10:00-11:00")
        .await
        .unwrap_err();
    assert!(matches!(err, RoomlyError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_slot_have_one_winner() {
    let w = world().await;
    let contenders = 16;

    let mut residents = Vec::new();
    for i in 0..contenders {
        let user = w
            .store
            .insert_user(&User {
                community_id: Some(w.fx.community.id),
                ..User::new(format!("resident{i}@example.com"), format!("Resident {i}"), w.clock.now())
            })
            .await
            .unwrap();
        residents.push(user.id);
    }

    let handles: Vec<_> = residents
        .into_iter()
        .map(|user_id| {
            let roomly = Arc::clone(&w.roomly);
            let amenity_id = w.fx.grill.id;
            tokio::spawn(async move {
                roomly
                    .reservations
                    .create(user_id, amenity_id, next_week(), "18:00-19:00")
                    .await
            })
        })
        .collect();

    let mut won = 0;
    let mut conflicts = 0;
    for outcome in futures::future::join_all(handles).await {
        match outcome.unwrap() {
            Ok(_) => won += 1,
            Err(RoomlyError::Conflict(_)) => conflicts += 1,
            Err(other) => unreachable!("unexpected error: {other}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(conflicts, contenders - 1);
    let holders = w
        .store
        .reservations()
        .into_iter()
        .filter(|r| r.status.holds_slot())
        .count();
    assert_eq!(holders, 1);

    // Only the winner earned points.
    let community = w.store.get_community(w.fx.community.id).await.unwrap().unwrap();
    assert_eq!(community.total_points, 30);
}

#[tokio::test]
async fn pool_rate_limit_opens_after_fifteen_days() {
    let w = world().await;
    let far = test_clock().today() + Duration::days(40);

    w.roomly
        .reservations
        .create(w.fx.bob.id, w.fx.pool.id, far, "08:00-09:00")
        .await
        .unwrap();

    w.clock.advance(Duration::days(14));
    let err = w
        .roomly
        .reservations
        .create(w.fx.bob.id, w.fx.pool.id, far, "09:00-10:00")
        .await
        .unwrap_err();
    assert!(matches!(err, RoomlyError::Conflict(_)));

    w.clock.advance(Duration::days(1));
    w.roomly
        .reservations
        .create(w.fx.bob.id, w.fx.pool.id, far, "09:00-10:00")
        .await
        .unwrap();
}

#[tokio::test]
async fn lifecycle_and_reconciliation() {
    let w = world().await;

    let booking = w
        .roomly
        .reservations
        .create(w.fx.alice.id, w.fx.gym.id, next_week(), "16:00-17:00")
        .await
        .unwrap();
    let graded = w
        .roomly
        .reservations
        .grade(w.fx.admin.id, booking.record.id, GradeOutcome::Unfulfilled)
        .await
        .unwrap();
    assert_eq!(graded.grade, Grade::Unfulfilled);
    assert_eq!(graded.compliance_pct, 0);

    w.store.corrupt_user_points(w.fx.alice.id, 0);
    let report = w.roomly.points.reconcile_all().await.unwrap();
    assert_eq!(report.user_drift.len(), 1);

    let summary = w.roomly.leaderboard.point_summary(w.fx.alice.id).await.unwrap();
    assert_eq!(summary.points, 10);
    assert_eq!(w.store.sum_user_points(w.fx.alice.id).await.unwrap(), 10);

    let standings = w
        .roomly
        .leaderboard
        .resident_leaderboard(w.fx.community.id)
        .await
        .unwrap();
    assert_eq!(standings[0].user_id, w.fx.alice.id);
}
