//! Integration tests for gallery-api endpoints
//!
//! Drives the router with `oneshot` over an in-memory SQLite catalog seeded
//! with three categories and three items:
//! - alpha: items 1, 3
//! - beta:  items 2, 3
//! - gamma: (empty)

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gallery_api::{build_router, AppState};
use gallery_common::db::init_memory_database;
use gallery_common::store::{CatalogAdmin, NewItem, SqliteStore};
use gallery_common::{AssociationStore, Category, CategoryId, Error, Item, ItemId};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

const IDLE: Duration = Duration::from_secs(600);

/// Test helper: seeded catalog store
async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::new(init_memory_database().await.expect("in-memory db"));
    let alpha = store.create_category("Alpha", "first").await.unwrap().id;
    let beta = store.create_category("Beta", "").await.unwrap().id;
    store.create_category("Gamma", "").await.unwrap();

    for (name, category) in [("one", &alpha), ("two", &beta), ("three", &alpha)] {
        store
            .register_item(NewItem {
                name: name.to_string(),
                asset_url: format!("https://cdn.example/{}.jpg", name),
                category: Some(category.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    store.associate_item(ItemId(3), &beta).await.unwrap();
    store
}

async fn setup_app() -> Router {
    build_router(AppState::with_catalog(seeded_store().await, IDLE))
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

async fn open_session(app: &Router) -> (String, Value) {
    let (status, body) = send(app, request("POST", "/api/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["session_id"].as_str().unwrap().to_string();
    (id, body["frame"].clone())
}

async fn toggle(app: &Router, session: &str, category: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            &format!("/api/sessions/{}/toggle", session),
            json!({ "category": category }),
        ),
    )
    .await
}

/// Store that can be switched to "unreachable" mid-test
struct FlakyStore {
    inner: SqliteStore,
    down: AtomicBool,
}

#[async_trait]
impl AssociationStore for FlakyStore {
    async fn list_categories(&self) -> gallery_common::Result<Vec<Category>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::UpstreamUnavailable("connection refused".to_string()));
        }
        self.inner.list_categories().await
    }

    async fn list_items(&self, filter: Option<&CategoryId>) -> gallery_common::Result<Vec<Item>> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::UpstreamUnavailable("connection refused".to_string()));
        }
        self.inner.list_items(filter).await
    }

    async fn associate_item(&self, item: ItemId, category: &CategoryId) -> gallery_common::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::UpstreamUnavailable("connection refused".to_string()));
        }
        self.inner.associate_item(item, category).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gallery-api");
    assert_eq!(body["backend"], "sqlite");
    assert!(body["version"].is_string());
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_list_categories_includes_empty() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/api/categories")).await;

    assert_eq!(status, StatusCode::OK);
    let cats = body.as_array().unwrap();
    let slugs: Vec<&str> = cats.iter().map(|c| c["slug"].as_str().unwrap()).collect();
    assert_eq!(slugs, vec!["alpha", "beta", "gamma"]);
    assert_eq!(cats[0]["count"], 2);
    assert_eq!(cats[0]["description"], "first");
    assert_eq!(cats[2]["count"], 0);
}

#[tokio::test]
async fn test_create_rename_delete_category() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/categories", json!({ "name": "Night Sky" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "night-sky");

    let (status, body) = send(
        &app,
        json_request("POST", "/api/categories", json!({ "name": "night sky" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        json_request("PATCH", "/api/categories/night-sky", json!({ "name": "Stars" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Stars");
    assert_eq!(body["slug"], "night-sky");

    let (status, _) = send(&app, request("DELETE", "/api/categories/night-sky")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, request("DELETE", "/api/categories/night-sky")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "INVALID_CATEGORY");
}

// =============================================================================
// Items
// =============================================================================

#[tokio::test]
async fn test_list_items_unfiltered_and_filtered() {
    let app = setup_app().await;

    let (status, body) = send(&app, request("GET", "/api/items")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1, 2, 3]);
    assert_eq!(body[2]["categories"], "Alpha, Beta");
    assert_eq!(body[2]["category_slugs"], json!(["alpha", "beta"]));
    assert_eq!(body[0]["asset_url"], "https://cdn.example/one.jpg");

    let (status, body) = send(&app, request("GET", "/api/items?category=beta")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![2, 3]);

    let (status, body) = send(&app, request("GET", "/api/items?category=gamma")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(&app, request("GET", "/api/items?category=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_list_items_rejects_unknown_slug() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/api/items?category=nonexistent")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "INVALID_CATEGORY");
}

#[tokio::test]
async fn test_register_item_requires_category() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/items",
            json!({ "name": "four", "asset_url": "https://cdn.example/4.jpg" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/items",
            json!({
                "name": "four",
                "asset_url": "https://cdn.example/4.jpg",
                "kind": "product",
                "link": "https://shop.example/four",
                "category": "gamma"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 4);
    assert_eq!(body["kind"], "product");
    assert_eq!(body["categories"], "Gamma");
}

// =============================================================================
// Associations
// =============================================================================

#[tokio::test]
async fn test_associate_single_item_twice() {
    let app = setup_app().await;
    let body = json!({ "item_id": 1, "category": "gamma" });

    for _ in 0..2 {
        let (status, resp) = send(&app, json_request("POST", "/api/associations", body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp["success"], true);
        assert_eq!(resp["associated"], json!([1]));
    }

    let (_, items) = send(&app, request("GET", "/api/items?category=gamma")).await;
    assert_eq!(ids(&items), vec![1]);
    assert_eq!(items[0]["category_slugs"], json!(["alpha", "gamma"]));
}

#[tokio::test]
async fn test_associate_batch_partial_success() {
    let app = setup_app().await;
    let (status, resp) = send(
        &app,
        json_request(
            "POST",
            "/api/associations",
            json!({ "item_ids": [1, 77, 2, 1, 88], "category": "gamma" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["associated"], json!([1, 2]));
    assert_eq!(resp["failed"], json!([77, 88]));
    let messages = resp["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].as_str().unwrap().contains("77, 88"));

    let (_, items) = send(&app, request("GET", "/api/items?category=gamma")).await;
    assert_eq!(ids(&items), vec![1, 2]);
}

#[tokio::test]
async fn test_associate_validation_errors() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/associations", json!({ "item_ids": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        json_request("POST", "/api/associations", json!({ "category": "alpha" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/associations",
            json!({ "item_id": 1, "category": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "INVALID_CATEGORY");
}

// =============================================================================
// Filter sessions
// =============================================================================

#[tokio::test]
async fn test_session_toggle_sequence_is_inclusive_or() {
    let app = setup_app().await;
    let (session, frame) = open_session(&app).await;

    assert_eq!(ids(&frame["items"]), vec![1, 2, 3]);
    assert_eq!(frame["selection"], json!([]));

    let (status, frame) = toggle(&app, &session, "alpha").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&frame["items"]), vec![1, 3]);
    assert_eq!(frame["selection"], json!(["alpha"]));

    let (_, frame) = toggle(&app, &session, "beta").await;
    assert_eq!(ids(&frame["items"]), vec![1, 2, 3]);

    let (_, frame) = toggle(&app, &session, "alpha").await;
    assert_eq!(ids(&frame["items"]), vec![2, 3]);
    assert_eq!(frame["selection"], json!(["beta"]));
    let checked: Vec<bool> = frame["controls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["checked"].as_bool().unwrap())
        .collect();
    assert_eq!(checked, vec![false, true, false]);
    assert_eq!(frame["total"], 3);
    assert_eq!(frame["visible"], 2);

    let (status, current) = send(&app, request("GET", &format!("/api/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current, frame);
}

#[tokio::test]
async fn test_session_empty_category_and_unknown_slug() {
    let app = setup_app().await;
    let (session, _) = open_session(&app).await;

    let (status, frame) = toggle(&app, &session, "gamma").await;
    assert_eq!(status, StatusCode::OK);
    assert!(frame["items"].as_array().unwrap().is_empty());

    let (status, body) = toggle(&app, &session, "unknown").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_CATEGORY");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let app = setup_app().await;
    let (first, _) = open_session(&app).await;
    let (second, _) = open_session(&app).await;

    toggle(&app, &first, "alpha").await;

    let (_, frame) = send(&app, request("GET", &format!("/api/sessions/{}", second))).await;
    assert_eq!(ids(&frame["items"]), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_close_session() {
    let app = setup_app().await;
    let (session, _) = open_session(&app).await;

    let (status, _) = send(&app, request("DELETE", &format!("/api/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, request("GET", &format!("/api/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_idle_session_expires_on_access() {
    let state = AppState::with_catalog(seeded_store().await, Duration::from_millis(50));
    let app = build_router(state.clone());
    let (session, _) = open_session(&app).await;

    tokio::time::sleep(Duration::from_millis(150)).await;

    let (status, body) = toggle(&app, &session, "alpha").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");
    assert!(state.sessions.is_empty().await);

    let (status, _) = send(&app, request("GET", &format!("/api/sessions/{}", session))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_picks_up_new_associations() {
    let app = setup_app().await;
    let (session, _) = open_session(&app).await;
    toggle(&app, &session, "gamma").await;

    send(
        &app,
        json_request("POST", "/api/associations", json!({ "item_id": 2, "category": "gamma" })),
    )
    .await;

    let (status, frame) = send(
        &app,
        request("POST", &format!("/api/sessions/{}/refresh", session)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&frame["items"]), vec![2]);
    assert_eq!(frame["selection"], json!(["gamma"]));
}

// =============================================================================
// Upstream failures
// =============================================================================

#[tokio::test]
async fn test_unreachable_store_is_non_fatal_for_sessions() {
    let flaky = Arc::new(FlakyStore {
        inner: seeded_store().await,
        down: AtomicBool::new(true),
    });
    let app = build_router(AppState::read_only(flaky.clone(), IDLE));

    let (status, body) = send(&app, request("GET", "/api/categories")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");

    let (session, frame) = open_session(&app).await;
    assert!(frame["items"].as_array().unwrap().is_empty());
    assert!(frame["error"].as_str().unwrap().contains("connection refused"));

    flaky.down.store(false, Ordering::SeqCst);
    let (_, frame) = send(
        &app,
        request("POST", &format!("/api/sessions/{}/refresh", session)),
    )
    .await;
    assert_eq!(ids(&frame["items"]), vec![1, 2, 3]);
    assert!(frame.get("error").is_none());
}

#[tokio::test]
async fn test_refresh_failure_keeps_prior_view() {
    let flaky = Arc::new(FlakyStore {
        inner: seeded_store().await,
        down: AtomicBool::new(false),
    });
    let app = build_router(AppState::read_only(flaky.clone(), IDLE));

    let (session, _) = open_session(&app).await;
    let (_, before) = toggle(&app, &session, "beta").await;

    flaky.down.store(true, Ordering::SeqCst);
    let (status, frame) = send(
        &app,
        request("POST", &format!("/api/sessions/{}/refresh", session)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["items"], before["items"]);
    assert_eq!(frame["selection"], json!(["beta"]));
    assert!(frame["error"].is_string());

    // Toggling still works against the cached data while the store is down
    let (status, frame) = toggle(&app, &session, "beta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&frame["items"]), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_read_only_backend_rejects_catalog_writes() {
    let flaky = Arc::new(FlakyStore {
        inner: seeded_store().await,
        down: AtomicBool::new(false),
    });
    let app = build_router(AppState::read_only(flaky, IDLE));

    let (status, body) = send(
        &app,
        json_request("POST", "/api/categories", json!({ "name": "New" })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "READ_ONLY");

    // Associations go through the read/associate contract and still work
    let (status, resp) = send(
        &app,
        json_request("POST", "/api/associations", json!({ "item_id": 2, "category": "alpha" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], true);
}
