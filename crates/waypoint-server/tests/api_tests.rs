//! Integration tests for the dashboard API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The session and the data endpoints share one
//! mock backend anchored at a fixed time.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;
use waypoint_core::{DashboardConfig, FixedClock, Session};
use waypoint_data::MockDataSource;
use waypoint_server::{AppState, build_router};

/// One day before the anchor, as a query string value.
const SINCE: &str = "2024-05-31T12:00:00Z";

fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

async fn make_test_state() -> Arc<AppState<MockDataSource>> {
    let source = Arc::new(MockDataSource::new(anchor()));
    let session = Session::new(
        DashboardConfig::default(),
        Arc::clone(&source),
        Arc::new(FixedClock::new(anchor())),
    )
    .unwrap();
    session.start().await;
    Arc::new(AppState::new(session, source))
}

async fn get(state: Arc<AppState<MockDataSource>>, uri: &str) -> (StatusCode, Vec<u8>) {
    let router = build_router(state);
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json(state: Arc<AppState<MockDataSource>>, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = get(state, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(
    state: Arc<AppState<MockDataSource>>,
    uri: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let router = build_router(state);
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn index_returns_status_page() {
    let state = make_test_state().await;
    let (status, bytes) = get(state, "/").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(bytes).unwrap();
    assert!(html.contains("Waypoint"));
    assert!(html.contains("RUNNING"));
    assert!(html.contains("/api/entities"));
}

#[tokio::test]
async fn list_entities_returns_all_trucks() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, &format!("/api/entities?start={SINCE}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 5);
    assert_eq!(json["entities"][0]["type"], "truck");
    assert_eq!(json["entities"][0]["id"], "1");
}

#[tokio::test]
async fn list_entities_applies_spatial_filter() {
    let state = make_test_state().await;
    let wkt = "POLYGON((35.1%2031.7,%2035.3%2031.7,%2035.3%2031.9,%2035.1%2031.9,%2035.1%2031.7))";
    let (status, json) = get_json(state, &format!("/api/entities?start={SINCE}&wkt={wkt}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["entities"][0]["id"], "2");
}

#[tokio::test]
async fn list_entities_rejects_non_polygon_filter() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities?wkt=POINT(35%2031)").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn list_entities_rejects_reversed_window() {
    let state = make_test_state().await;
    let (status, _) = get_json(
        state,
        "/api/entities?start=2024-06-01T12:00:00Z&end=2024-06-01T11:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn entity_events_lists_route() {
    let state = make_test_state().await;
    let (status, json) =
        get_json(state, &format!("/api/entities/truck/1/events?start={SINCE}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 8);
}

#[tokio::test]
async fn entity_events_of_unknown_entity_is_empty() {
    let state = make_test_state().await;
    let (status, json) =
        get_json(state, &format!("/api/entities/truck/9/events?start={SINCE}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn entity_details_returns_record_and_sections() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities/truck-2/details").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["details"]["entity_id"], "truck-2");
    assert_eq!(json["details"]["final_description"], "Arrived at Jerusalem");
    assert!(!json["sections"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn entity_details_of_unknown_entity_is_404() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities/truck-9/details").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn entity_details_with_malformed_key_is_400() {
    let state = make_test_state().await;
    let (status, _) = get_json(state, "/api/entities/truck/details").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_highlights_in_window() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, &format!("/api/highlights?start={SINCE}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 10);
}

#[tokio::test]
async fn default_window_follows_the_session_clock() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/highlights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 10);
}

#[tokio::test]
async fn group_search_filters_options() {
    let state = make_test_state().await;
    let (status, json) = get_json(Arc::clone(&state), "/api/groups/search?q=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Groups"].as_array().unwrap().len(), 1);
    assert_eq!(json["Groups"][0]["label"], "Group 2");

    let (_, json) = get_json(state, "/api/groups/search?q=nothing").await;
    assert!(json.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn state_returns_loaded_snapshot() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entities"].as_array().unwrap().len(), 5);
    assert!(json["focus"]["focusedEntity"].is_null());
}

#[tokio::test]
async fn post_focus_interaction_loads_entity_timeline() {
    let state = make_test_state().await;
    let body = serde_json::json!({ "type": "focusEntity", "key": "truck-1" });
    let (status, json) = post_json(Arc::clone(&state), "/api/interactions", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["focus"]["focusedEntity"], "truck-1");
    assert_eq!(json["entityItems"].as_array().unwrap().len(), 8);

    // The session keeps the focus for later reads.
    let (_, json) = get_json(state, "/api/state").await;
    assert_eq!(json["focus"]["focusedEntity"], "truck-1");
}

#[tokio::test]
async fn post_invalid_spatial_filter_is_rejected() {
    let state = make_test_state().await;
    let body = serde_json::json!({ "type": "setSpatialFilter", "wkt": "POINT(35 31)" });
    let (status, json) = post_json(state, "/api/interactions", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], 422);
}

#[tokio::test]
async fn post_unknown_interaction_is_a_client_error() {
    let state = make_test_state().await;
    let body = serde_json::json!({ "type": "teleport" });
    let (status, _) = post_json(state, "/api/interactions", &body).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let state = make_test_state().await;
    let (status, _) = get(state, "/api/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
