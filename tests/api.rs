use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use happen::{api::create_router, app_state::AppState, config::Config};

async fn app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::in_memory(dir.path().to_string_lossy().to_string());
    let state = AppState::new(config).await.unwrap();
    (create_router(state), dir)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_user(app: &Router, id: &str, name: &str) {
    let (status, _) = call(
        app,
        Method::POST,
        "/api/v1/users",
        Some(id),
        Some(json!({ "display_name": name, "email": format!("{}@example.com", id) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_venue(app: &Router, owner: &str, name: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/venues",
        Some(owner),
        Some(json!({
            "name": name,
            "description": "Live music every night",
            "location": { "address": "131 W 3rd St", "latitude": 40.7306, "longitude": -74.0005 },
            "categories": ["music", "jazz"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_event(app: &Router, creator: &str, venue_id: &str, name: &str) -> String {
    let start = Utc::now() + Duration::days(1);
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/events",
        Some(creator),
        Some(json!({
            "name": name,
            "description": "Late set",
            "start_date_time": start.timestamp_millis(),
            "end_date_time": (start + Duration::hours(3)).timestamp_millis(),
            "venue_id": venue_id,
            "location": { "address": "131 W 3rd St", "latitude": 40.7306, "longitude": -74.0005 },
            "categories": ["jazz"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _dir) = app().await;
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("ok"));
}

#[tokio::test]
async fn test_event_lifecycle_and_rsvp_counters() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    create_user(&app, "fan", "Finn").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    let event_id = create_event(&app, "owner", &venue_id, "Late Night Jazz").await;

    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}", venue_id), None, None).await;
    assert_eq!(body["data"]["event_count"], json!(1));

    let (status, body) = call(&app, Method::GET, "/api/v1/events/by-slug/late-night-jazz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["venue_name"], json!("Blue Note"));

    let rsvp_uri = format!("/api/v1/events/{}/rsvp", event_id);
    let (status, _) = call(&app, Method::POST, &rsvp_uri, Some("fan"), Some(json!({ "response_type": "going" }))).await;
    assert_eq!(status, StatusCode::OK);

    let event_uri = format!("/api/v1/events/{}", event_id);
    let (_, body) = call(&app, Method::GET, &event_uri, None, None).await;
    assert_eq!(body["data"]["attendee_count"], json!(1));

    let (_, body) = call(&app, Method::GET, &format!("{}/attendees", event_uri), None, None).await;
    assert_eq!(body["data"][0]["id"], json!("fan"));

    call(&app, Method::POST, &rsvp_uri, Some("fan"), Some(json!({ "response_type": "interested" }))).await;
    let (_, body) = call(&app, Method::GET, &event_uri, None, None).await;
    assert_eq!(body["data"]["attendee_count"], json!(0));
    assert_eq!(body["data"]["interested_count"], json!(1));

    let (_, body) = call(&app, Method::GET, &rsvp_uri, Some("fan"), None).await;
    assert_eq!(body["data"]["response_type"], json!("interested"));

    let (status, _) = call(&app, Method::DELETE, &event_uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &event_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}", venue_id), None, None).await;
    assert_eq!(body["data"]["event_count"], json!(0));
}

#[tokio::test]
async fn test_viewer_is_required_and_ownership_enforced() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    let event_id = create_event(&app, "owner", &venue_id, "Jam Session").await;

    let now = Utc::now().timestamp_millis();
    let anonymous = json!({ "name": "x", "start_date_time": now, "end_date_time": now });
    let (status, body) = call(&app, Method::POST, "/api/v1/events", None, Some(anonymous)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", body);

    let event_uri = format!("/api/v1/events/{}", event_id);
    let (status, _) = call(&app, Method::PATCH, &event_uri, Some("intruder"), Some(json!({ "name": "Hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let venue_uri = format!("/api/v1/venues/{}", venue_id);
    let (status, _) = call(&app, Method::DELETE, &venue_uri, Some("intruder"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let analytics_uri = format!("/api/v1/venues/{}/analytics", venue_id);
    let (status, _) = call(&app, Method::GET, &analytics_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::GET, &analytics_uri, Some("intruder"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::GET, &analytics_uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);

    let venue_reconcile = format!("/api/v1/venues/{}/reconcile", venue_id);
    let (status, _) = call(&app, Method::POST, &venue_reconcile, Some("intruder"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::POST, &venue_reconcile, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    let event_reconcile = format!("/api/v1/events/{}/reconcile", event_id);
    let (status, _) = call(&app, Method::POST, &event_reconcile, Some("intruder"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::POST, &event_reconcile, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Venues with events cannot be deleted, even by their owner.
    let (status, _) = call(&app, Method::DELETE, &venue_uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, Method::PATCH, &event_uri, Some("owner"), Some(json!({ "name": "Jam Session II" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], json!("jam-session-ii"));
}

#[tokio::test]
async fn test_nearby_and_search() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    create_event(&app, "owner", &venue_id, "Late Night Jazz").await;

    let (status, body) = call(&app, Method::GET, "/api/v1/events/nearby?lat=40.7308&lng=-73.9973&radius_km=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["distance_km"].as_f64().unwrap() < 1.0);

    // Los Angeles is far outside the radius.
    let (_, body) = call(&app, Method::GET, "/api/v1/venues/nearby?lat=34.0522&lng=-118.2437", None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = call(&app, Method::GET, "/api/v1/venues/nearby?lat=40.7308&lng=-73.9973&categories=jazz", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, Method::GET, "/api/v1/events/nearby?lat=123&lng=0", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, "/api/v1/events/search?q=JAZZ", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = call(&app, Method::GET, "/api/v1/venues/search?q=blue", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reviews_and_check_ins() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    create_user(&app, "fan", "Finn").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    let event_id = create_event(&app, "owner", &venue_id, "Late Night Jazz").await;

    let reviews_uri = format!("/api/v1/venues/{}/reviews", venue_id);
    let (status, _) = call(&app, Method::POST, &reviews_uri, Some("fan"), Some(json!({ "rating": 4, "title": "Great" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, &reviews_uri, Some("fan"), Some(json!({ "rating": 2 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = call(&app, Method::POST, &reviews_uri, Some("owner"), Some(json!({ "rating": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}", venue_id), None, None).await;
    assert_eq!(body["data"]["ratings"]["count"], json!(1));
    assert_eq!(body["data"]["ratings"]["distribution"], json!([0, 0, 0, 1, 0]));

    let (_, body) = call(&app, Method::GET, "/api/v1/notifications", Some("owner"), None).await;
    assert_eq!(body["data"][0]["kind"], json!("venue_review"));

    let helpful_uri = format!("/api/v1/reviews/{}_fan/helpful", venue_id);
    let (status, _) = call(&app, Method::POST, &helpful_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, body) = call(&app, Method::POST, &helpful_uri, Some("owner"), None).await;
    assert_eq!(body["data"]["helpful"], json!(1));
    let (status, body) = call(&app, Method::POST, &helpful_uri, Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["helpful"], json!(1));
    let (_, body) = call(&app, Method::POST, &helpful_uri, Some("fan"), None).await;
    assert_eq!(body["data"]["helpful"], json!(2));
    let (status, _) = call(&app, Method::POST, "/api/v1/reviews/missing/helpful", Some("fan"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let check_in_uri = format!("/api/v1/events/{}/check-in", event_id);
    let (status, _) = call(&app, Method::POST, &check_in_uri, Some("fan"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, &check_in_uri, Some("fan"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = call(&app, Method::GET, &check_in_uri, Some("fan"), None).await;
    assert_eq!(body["data"], json!(true));
    let (_, body) = call(&app, Method::GET, &check_in_uri, Some("owner"), None).await;
    assert_eq!(body["data"], json!(false));

    let (_, body) = call(&app, Method::GET, "/api/v1/users/fan", None, None).await;
    assert_eq!(body["data"]["stats"]["check_ins"], json!(1));
    assert_eq!(body["data"]["stats"]["reviews"], json!(1));

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}/analytics?days=7", venue_id), Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totals"]["check_ins"], json!(1));
    assert_eq!(body["data"]["attendance"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_friendship_follow_and_feed() {
    let (app, _dir) = app().await;
    create_user(&app, "alice", "Alice").await;
    create_user(&app, "bob", "Bob").await;
    let venue_id = create_venue(&app, "alice", "Blue Note").await;

    let (status, _) = call(&app, Method::POST, "/api/v1/friends/requests", Some("alice"), Some(json!({ "friend_id": "alice" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::POST, "/api/v1/friends/requests", Some("alice"), Some(json!({ "friend_id": "bob" }))).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, body) = call(&app, Method::POST, "/api/v1/friends/requests", Some("bob"), Some(json!({ "friend_id": "alice" }))).await;
    assert_eq!(body["data"]["id"], json!(request_id));

    let (_, body) = call(&app, Method::GET, "/api/v1/users/bob/friend-requests", Some("bob"), None).await;
    assert_eq!(body["data"][0]["sender"]["id"], json!("alice"));

    let respond_uri = format!("/api/v1/friends/requests/{}/respond", request_id);
    let (status, _) = call(&app, Method::POST, &respond_uri, Some("alice"), Some(json!({ "accept": true }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::POST, &respond_uri, Some("bob"), Some(json!({ "accept": true }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::POST, &respond_uri, Some("bob"), Some(json!({ "accept": false }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, Method::GET, "/api/v1/users/alice/friends", None, None).await;
    assert_eq!(body["data"][0]["id"], json!("bob"));

    let follow_uri = format!("/api/v1/venues/{}/follow", venue_id);
    call(&app, Method::POST, &follow_uri, Some("bob"), None).await;
    call(&app, Method::POST, &follow_uri, Some("bob"), None).await;
    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}/followers/count", venue_id), None, None).await;
    assert_eq!(body["data"]["count"], json!(1));
    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}", venue_id), None, None).await;
    assert_eq!(body["data"]["followers"], json!(1));

    let (_, body) = call(&app, Method::GET, "/api/v1/users/bob/followed-venues", None, None).await;
    assert_eq!(body["data"][0]["id"], json!(venue_id));

    let (_, body) = call(&app, Method::GET, "/api/v1/feed", Some("alice"), None).await;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"follow"), "{:?}", kinds);

    let (status, _) = call(&app, Method::DELETE, &follow_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, &format!("/api/v1/venues/{}", venue_id), None, None).await;
    assert_eq!(body["data"]["followers"], json!(0));
}

#[tokio::test]
async fn test_declined_request_can_be_resent_and_friendships_removed() {
    let (app, _dir) = app().await;
    create_user(&app, "alice", "Alice").await;
    create_user(&app, "bob", "Bob").await;
    create_user(&app, "carol", "Carol").await;

    let request = json!({ "friend_id": "bob" });
    let (_, body) = call(&app, Method::POST, "/api/v1/friends/requests", Some("alice"), Some(request.clone())).await;
    let request_id = body["data"]["id"].as_str().unwrap().to_string();
    let respond_uri = format!("/api/v1/friends/requests/{}/respond", request_id);
    let (status, _) = call(&app, Method::POST, &respond_uri, Some("bob"), Some(json!({ "accept": false }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::POST, "/api/v1/friends/requests", Some("alice"), Some(request)).await;
    assert_eq!(body["data"]["id"], json!(request_id));
    let (_, body) = call(&app, Method::GET, "/api/v1/users/bob/friend-requests", Some("bob"), None).await;
    assert_eq!(body["data"][0]["status"], json!("pending"));
    let (_, body) = call(&app, Method::GET, "/api/v1/notifications", Some("bob"), None).await;
    let requests = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == json!("friend_request"))
        .count();
    assert_eq!(requests, 2);

    let (status, _) = call(&app, Method::POST, &respond_uri, Some("bob"), Some(json!({ "accept": true }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, "/api/v1/users/alice", None, None).await;
    assert_eq!(body["data"]["stats"]["followers"], json!(1));

    let friendship_uri = format!("/api/v1/friendships/{}", request_id);
    let (status, _) = call(&app, Method::DELETE, &friendship_uri, Some("carol"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &friendship_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, Method::GET, "/api/v1/users/alice/friends", None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = call(&app, Method::GET, "/api/v1/users/alice", None, None).await;
    assert_eq!(body["data"]["stats"]["followers"], json!(0));
    let (_, body) = call(&app, Method::GET, "/api/v1/users/bob", None, None).await;
    assert_eq!(body["data"]["stats"]["following"], json!(0));

    // A sent request can be cancelled by its sender.
    call(&app, Method::POST, "/api/v1/friends/requests", Some("bob"), Some(json!({ "friend_id": "alice" }))).await;
    let (status, _) = call(&app, Method::DELETE, &friendship_uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, "/api/v1/users/alice/friend-requests", Some("alice"), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mood_board_and_category_follow() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    let event_id = create_event(&app, "owner", &venue_id, "Late Night Jazz").await;

    let board_uri = "/api/v1/users/owner/mood-board";
    let (status, _) = call(&app, Method::POST, board_uri, Some("someone"), Some(json!({ "event_id": event_id }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    call(&app, Method::POST, board_uri, Some("owner"), Some(json!({ "event_id": event_id, "note": "date night" }))).await;
    call(&app, Method::POST, board_uri, Some("owner"), Some(json!({ "event_id": event_id, "note": "with friends" }))).await;

    let (_, body) = call(&app, Method::GET, board_uri, Some("owner"), None).await;
    let saved = body["data"]["saved_events"].as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["note"], json!("with friends"));
    assert_eq!(saved[0]["event"]["id"], json!(event_id));

    let (status, _) = call(&app, Method::POST, "/api/v1/categories/jazz/follow", Some("owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, "/api/v1/users/owner/followed-categories", None, None).await;
    assert_eq!(body["data"][0]["slug"], json!("jazz"));
    assert_eq!(body["data"][0]["event_count"], json!(1));
}

#[tokio::test]
async fn test_event_image_upload_is_served() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    let venue_id = create_venue(&app, "owner", "Blue Note").await;
    let event_id = create_event(&app, "owner", &venue_id, "Late Night Jazz").await;

    let image_uri = format!("/api/v1/events/{}/image", event_id);
    let upload = json!({ "file_name": "cover.png", "data": STANDARD.encode(b"fake png") });
    let (status, _) = call(&app, Method::POST, &image_uri, Some("intruder"), Some(upload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::POST, &image_uri, Some("owner"), Some(upload)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let path = body["data"]["path"].as_str().unwrap().to_string();
    assert!(path.starts_with(&format!("/blobs/events/{}/", event_id)), "{}", path);

    let (_, body) = call(&app, Method::GET, &format!("/api/v1/events/{}", event_id), None, None).await;
    assert_eq!(body["data"]["cover_image"], json!(path));

    let response = app
        .clone()
        .oneshot(Request::builder().uri(&path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake png");

    let bad = json!({ "file_name": "notes.txt", "data": STANDARD.encode(b"text") });
    let (status, _) = call(&app, Method::POST, &image_uri, Some("owner"), Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blog_posts_and_comments() {
    let (app, _dir) = app().await;
    create_user(&app, "writer", "Wren").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/posts",
        Some("writer"),
        Some(json!({
            "title": "Hello, World!",
            "content": "x".repeat(200),
            "categories": ["Tech Talk", "News"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let post_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["slug"], json!("hello-world"));
    assert_eq!(body["data"]["author_name"], json!("Wren"));
    assert_eq!(body["data"]["excerpt"].as_str().unwrap().len(), 153);

    let comments_uri = format!("/api/v1/posts/{}/comments", post_id);
    call(&app, Method::POST, &comments_uri, Some("writer"), Some(json!({ "content": "first" }))).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    call(&app, Method::POST, &comments_uri, Some("writer"), Some(json!({ "content": "second" }))).await;
    let (status, _) = call(&app, Method::POST, &comments_uri, Some("writer"), Some(json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, Method::GET, &comments_uri, None, None).await;
    let contents: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["content"].as_str())
        .collect();
    assert_eq!(contents, vec!["first", "second"]);

    let (_, body) = call(&app, Method::GET, "/api/v1/posts/by-category/tech-talk", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = call(&app, Method::GET, "/api/v1/blog/categories", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let post_uri = format!("/api/v1/posts/{}", post_id);
    let (status, _) = call(&app, Method::DELETE, &post_uri, Some("reader"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &post_uri, Some("writer"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, &comments_uri, None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_search_and_newsletter_signup() {
    let (app, _dir) = app().await;
    create_user(&app, "writer", "Wren").await;
    for (title, content, published) in [
        ("Jazz in the Park", "Summer concerts downtown", true),
        ("Gallery Night", "New exhibits featuring JAZZ photography", true),
        ("Draft Jazz Notes", "Not ready yet", false),
        ("Food Trucks", "Tacos and more", true),
    ] {
        let body = json!({ "title": title, "content": content, "published": published });
        let (status, _) = call(&app, Method::POST, "/api/v1/posts", Some("writer"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, Method::GET, "/api/v1/posts/search?q=jazz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Gallery Night", "Jazz in the Park"]);

    let (_, body) = call(&app, Method::GET, "/api/v1/posts/search?q=%20", None, None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let signup = json!({ "email": " Reader@Example.com " });
    let (status, body) = call(&app, Method::POST, "/api/v1/newsletter", None, Some(signup)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["email"], json!("reader@example.com"));
    assert_eq!(body["data"]["source"], json!("website"));

    let again = json!({ "email": "reader@example.com" });
    let (status, _) = call(&app, Method::POST, "/api/v1/newsletter", None, Some(again)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    for email in ["", "not-an-email"] {
        let (status, body) = call(&app, Method::POST, "/api/v1/newsletter", None, Some(json!({ "email": email }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));
    }
}

#[tokio::test]
async fn test_malformed_requests_are_validation_errors() {
    let (app, _dir) = app().await;
    create_user(&app, "owner", "Olive").await;
    let now = Utc::now().timestamp_millis();

    let missing_name = json!({ "start_date_time": now, "end_date_time": now });
    let (status, body) = call(&app, Method::POST, "/api/v1/events", Some("owner"), Some(missing_name)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
    assert!(body["error"].as_str().unwrap().contains("name"), "{}", body);

    let counter_field = json!({ "name": "Gig", "start_date_time": now, "end_date_time": now, "attendee_count": 99 });
    let (status, body) = call(&app, Method::POST, "/api/v1/events", Some("owner"), Some(counter_field)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("attendee_count"), "{}", body);

    let (status, body) = call(&app, Method::GET, "/api/v1/events/nearby?lat=north&lng=1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
}
