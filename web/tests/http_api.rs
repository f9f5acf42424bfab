//! End-to-end tests of the HTTP API over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestRequest, TestResponse, TestServer};
use roomly_core::environment::Clock;
use roomly_core::types::UserId;
use roomly_engine::{BookingPolicy, Roomly};
use roomly_testing::{Fixtures, InMemoryObjectStorage, InMemoryStore, test_clock};
use roomly_web::handlers::directory::FILE_NAME_HEADER;
use roomly_web::{AppState, REQUEST_ID_HEADER, USER_ID_HEADER, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

async fn setup() -> (TestServer, Fixtures) {
    let store = InMemoryStore::new();
    let fx = Fixtures::seed(&store, &test_clock()).await.unwrap();
    let roomly = Roomly::new(
        store,
        InMemoryObjectStorage::new(),
        Arc::new(test_clock()),
        BookingPolicy::default(),
    );
    let server = TestServer::new(build_router(AppState::new(roomly))).unwrap();
    (server, fx)
}

fn tomorrow() -> String {
    test_clock().today().succ_opt().unwrap().to_string()
}

fn header(name: &str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_bytes(name.as_bytes()).unwrap(),
        HeaderValue::from_str(value).unwrap(),
    )
}

fn as_user(request: TestRequest, user: UserId) -> TestRequest {
    let (name, value) = header(USER_ID_HEADER, &user.to_string());
    request.add_header(name, value)
}

async fn book(server: &TestServer, user: UserId, amenity: String, slot: &str) -> TestResponse {
    as_user(server.post("/api/reservations"), user)
        .json(&json!({ "amenity_id": amenity, "date": tomorrow(), "time_slot": slot }))
        .await
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let (server, _) = setup().await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn test_booking_then_double_booking() {
    let (server, fx) = setup().await;

    let first = book(&server, fx.alice.id, fx.gym.id.to_string(), "10:00-11:00").await;
    first.assert_status(StatusCode::CREATED);
    let body: Value = first.json();
    assert_eq!(body["record"]["status"], "ACTIVE");
    assert_eq!(body["record"]["time_slot"], "10:00-11:00");
    assert_eq!(body["points"]["status"], "AWARDED");

    let second = book(&server, fx.bob.id, fx.gym.id.to_string(), "10:00-11:00").await;
    second.assert_status(StatusCode::CONFLICT);
    let body: Value = second.json();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let (server, fx) = setup().await;

    let response = server
        .post("/api/reservations")
        .json(&json!({ "amenity_id": fx.gym.id, "date": tomorrow(), "time_slot": "10:00-11:00" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = header(USER_ID_HEADER, "not-a-uuid");
    let response = server.get("/api/me").add_header(name, value).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_slot_is_rejected() {
    let (server, fx) = setup().await;

    let response = book(&server, fx.alice.id, fx.gym.id.to_string(), "13:00-14:00").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = book(&server, fx.alice.id, fx.gym.id.to_string(), "").await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_grading_is_admin_only_and_one_shot() {
    let (server, fx) = setup().await;
    let booking: Value = book(&server, fx.alice.id, fx.grill.id.to_string(), "18:00-19:00")
        .await
        .json();
    let id = booking["record"]["id"].as_str().unwrap().to_string();
    let url = format!("/api/reservations/{id}/grade");

    let response = as_user(server.post(&url), fx.bob.id)
        .json(&json!({ "outcome": "FULFILLED" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = as_user(server.post(&url), fx.admin.id)
        .json(&json!({ "outcome": "FULFILLED" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["grade"], "FULFILLED");
    assert_eq!(body["compliance_pct"], 100);

    let response = as_user(server.post(&url), fx.admin.id)
        .json(&json!({ "outcome": "UNFULFILLED" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_availability_reflects_bookings_and_cancellations() {
    let (server, fx) = setup().await;
    let booking: Value = book(&server, fx.alice.id, fx.gym.id.to_string(), "08:00-09:00")
        .await
        .json();
    let availability_url = format!("/api/amenities/{}/availability?date={}", fx.gym.id, tomorrow());

    let slots: Vec<Value> = server.get(&availability_url).await.json();
    assert_eq!(slots.len(), 11);
    let taken = slots.iter().find(|s| s["time_slot"] == "08:00-09:00").unwrap();
    assert_eq!(taken["available"], false);
    assert_eq!(slots.iter().filter(|s| s["available"] == true).count(), 10);

    let id = booking["record"]["id"].as_str().unwrap();
    let cancel_url = format!("/api/reservations/{id}/cancel");

    as_user(server.post(&cancel_url), fx.bob.id)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let cancelled = as_user(server.post(&cancel_url), fx.alice.id).await;
    cancelled.assert_status_ok();
    let body: Value = cancelled.json();
    assert_eq!(body["status"], "CANCELLED");

    let slots: Vec<Value> = server.get(&availability_url).await.json();
    assert!(slots.iter().all(|s| s["available"] == true));
}

#[tokio::test]
async fn test_points_and_leaderboards() {
    let (server, fx) = setup().await;
    book(&server, fx.alice.id, fx.pool.id.to_string(), "10:00-11:00")
        .await
        .assert_status(StatusCode::CREATED);

    let summary: Value = server
        .get(&format!("/api/users/{}/points", fx.alice.id))
        .await
        .json();
    assert_eq!(summary["points"], 50);
    assert_eq!(summary["history"].as_array().unwrap().len(), 1);

    let communities: Vec<Value> = server.get("/api/leaderboard/communities").await.json();
    assert_eq!(communities[0]["total_points"], 50);

    let residents: Vec<Value> = server
        .get(&format!("/api/communities/{}/leaderboard", fx.community.id))
        .await
        .json();
    assert_eq!(residents[0]["user_id"], fx.alice.id.to_string());
    assert_eq!(residents[0]["rank"], 1);
}

#[tokio::test]
async fn test_reconcile_requires_admin() {
    let (server, fx) = setup().await;

    as_user(server.post("/api/admin/reconcile"), fx.alice.id)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = as_user(server.post("/api/admin/reconcile"), fx.admin.id).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_join_request_flow() {
    let (server, fx) = setup().await;

    let signup = server
        .post("/api/users")
        .json(&json!({ "email": "carla@example.test", "name": "Carla" }))
        .await;
    signup.assert_status(StatusCode::CREATED);

    let submitted = server
        .post("/api/join-requests")
        .json(&json!({
            "community_id": fx.community.id,
            "user_email": "carla@example.test",
            "user_name": "Carla",
            "unit": "707",
            "tower": "B",
        }))
        .await;
    submitted.assert_status(StatusCode::CREATED);
    let request: Value = submitted.json();
    assert_eq!(request["status"], "PENDING");
    assert!(request["ticket_code"].as_str().unwrap().starts_with("JR-"));

    let pending_url = format!("/api/communities/{}/join-requests", fx.community.id);
    as_user(server.get(&pending_url), fx.alice.id)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let pending: Vec<Value> = as_user(server.get(&pending_url), fx.admin.id).await.json();
    assert_eq!(pending.len(), 1);

    let approve_url = format!("/api/join-requests/{}/approve", request["id"].as_str().unwrap());
    let approval = as_user(server.post(&approve_url), fx.admin.id).await;
    approval.assert_status_ok();
    let approval: Value = approval.json();
    assert_eq!(approval["request"]["status"], "APPROVED");
    assert_eq!(approval["linked_user"]["community_id"], fx.community.id.to_string());
    assert_eq!(approval["linked_user"]["apartment"], "707");

    as_user(server.post(&approve_url), fx.admin.id)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_posts_comments_and_likes() {
    let (server, fx) = setup().await;

    let form = MultipartForm::new()
        .add_text("text", "New benches by the pool")
        .add_text("post_type", "AREA_PHOTO")
        .add_part(
            "image",
            Part::bytes(vec![0x89, b'P', b'N', b'G'])
                .file_name("benches.png")
                .mime_type("image/png"),
        );
    let published = as_user(server.post("/api/posts"), fx.alice.id)
        .multipart(form)
        .await;
    published.assert_status(StatusCode::CREATED);
    let post: Value = published.json();
    assert_eq!(post["record"]["post_type"], "AREA_PHOTO");
    let image_url = post["record"]["image_url"].as_str().unwrap();
    assert!(image_url.starts_with(InMemoryObjectStorage::BASE_URL));
    assert_eq!(post["points"]["entry"]["points"], 15);
    let post_id = post["record"]["id"].as_str().unwrap().to_string();

    let comment = as_user(server.post(&format!("/api/posts/{post_id}/comments")), fx.bob.id)
        .json(&json!({ "text": "Looks great" }))
        .await;
    comment.assert_status(StatusCode::CREATED);

    let like_url = format!("/api/posts/{post_id}/like");
    let liked = as_user(server.post(&like_url), fx.bob.id).await;
    liked.assert_status_ok();
    let liked: Value = liked.json();
    assert_eq!(liked["record"], 1);
    assert_eq!(liked["points"]["status"], "AWARDED");

    as_user(server.post(&like_url), fx.bob.id)
        .await
        .assert_status(StatusCode::CONFLICT);

    let likes: Vec<Value> = as_user(server.get("/api/me/likes"), fx.bob.id).await.json();
    assert_eq!(likes, vec![json!(post_id)]);

    let feed: Vec<Value> = server
        .get(&format!("/api/communities/{}/posts", fx.community.id))
        .await
        .json();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["post"]["likes_count"], 1);
    assert_eq!(feed[0]["comments"][0]["text"], "Looks great");

    let unliked: Value = as_user(server.delete(&like_url), fx.bob.id).await.json();
    assert_eq!(unliked["likes_count"], 0);
    as_user(server.delete(&like_url), fx.bob.id)
        .await
        .assert_status(StatusCode::CONFLICT);

    // Liking again restores the like but pays the author nothing more.
    let relike: Value = as_user(server.post(&like_url), fx.bob.id).await.json();
    assert_eq!(relike["record"], 1);
    assert_eq!(relike["points"]["status"], "NOT_ELIGIBLE");
}

#[tokio::test]
async fn test_unknown_post_type_is_rejected() {
    let (server, fx) = setup().await;

    let form = MultipartForm::new()
        .add_text("text", "Hello")
        .add_text("post_type", "ANNOUNCEMENT");
    as_user(server.post("/api/posts"), fx.alice.id)
        .multipart(form)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_profile_and_avatar() {
    let (server, fx) = setup().await;

    let updated = as_user(server.put("/api/me"), fx.bob.id)
        .json(&json!({ "apartment": "303" }))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["apartment"], "303");
    assert_eq!(body["name"], "Bob");

    let (name, value) = header(FILE_NAME_HEADER, "me.jpg");
    let avatar = as_user(server.post("/api/me/avatar"), fx.bob.id)
        .add_header(name, value)
        .bytes(vec![0xFF, 0xD8, 0xFF].into())
        .await;
    avatar.assert_status_ok();
    let body: Value = avatar.json();
    assert!(body["record"]["avatar_url"].as_str().unwrap().ends_with("me.jpg"));
    assert_eq!(body["points"]["entry"]["points"], 20);
}

#[tokio::test]
async fn test_amenity_management_is_admin_only() {
    let (server, fx) = setup().await;
    let url = format!("/api/amenities/{}", fx.gym.id);

    as_user(server.put(&url), fx.alice.id)
        .json(&json!({ "capacity": 12 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let amenities: Vec<Value> = server
        .get(&format!("/api/amenities?community_id={}", fx.community.id))
        .await
        .json();
    assert_eq!(amenities.len(), 3);
}

#[tokio::test]
async fn test_analytics_for_admins() {
    let (server, fx) = setup().await;
    book(&server, fx.alice.id, fx.gym.id.to_string(), "10:00-11:00")
        .await
        .assert_status(StatusCode::CREATED);

    as_user(server.get("/api/analytics"), fx.alice.id)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let report: Value = as_user(server.get("/api/analytics"), fx.admin.id).await.json();
    assert_eq!(report["total_reservations"], 1);
    assert_eq!(report["fulfilled_reservations"], 0);
    assert_eq!(report["occupancy_rate"], 0);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let (server, _) = setup().await;
    let id = Uuid::new_v4();

    let (name, value) = header(REQUEST_ID_HEADER, &id.to_string());
    let response = server.get("/health").add_header(name, value).await;
    let echoed = response.headers().get(REQUEST_ID_HEADER).unwrap();
    assert_eq!(echoed.to_str().unwrap(), id.to_string());

    let response = server.get("/health").await;
    let generated = response.headers().get(REQUEST_ID_HEADER).unwrap();
    assert!(Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
