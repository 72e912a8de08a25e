//! gallery-api library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! without binding a socket.

pub mod api;
pub mod error;
pub mod sessions;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use gallery_common::store::SqliteStore;
use gallery_common::{AssociationStore, CatalogAdmin};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::sessions::SessionRegistry;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Association store queried by every read endpoint and session
    pub store: Arc<dyn AssociationStore>,
    /// Catalog administration, present only for writable backends
    pub admin: Option<Arc<dyn CatalogAdmin>>,
    /// Live filter sessions
    pub sessions: SessionRegistry,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State over the local catalog (read/write)
    pub fn with_catalog(store: SqliteStore, session_idle: Duration) -> Self {
        let store = Arc::new(store);
        Self {
            store: store.clone(),
            admin: Some(store),
            sessions: SessionRegistry::new(session_idle),
            startup_time: Utc::now(),
        }
    }

    /// State over a backend without catalog administration
    pub fn read_only(store: Arc<dyn AssociationStore>, session_idle: Duration) -> Self {
        Self {
            store,
            admin: None,
            sessions: SessionRegistry::new(session_idle),
            startup_time: Utc::now(),
        }
    }

    pub(crate) fn admin(&self) -> ApiResult<&Arc<dyn CatalogAdmin>> {
        self.admin
            .as_ref()
            .ok_or_else(|| ApiError::ReadOnly(self.store.backend_name().to_string()))
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, patch, post};

    let api = Router::new()
        .route(
            "/api/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route(
            "/api/categories/:slug",
            patch(api::rename_category).delete(api::delete_category),
        )
        .route("/api/items", get(api::list_items).post(api::register_item))
        .route("/api/associations", post(api::associate))
        .route("/api/sessions", post(api::create_session))
        .route(
            "/api/sessions/:id",
            get(api::get_session).delete(api::close_session),
        )
        .route("/api/sessions/:id/toggle", post(api::toggle_category))
        .route("/api/sessions/:id/refresh", post(api::refresh_session));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
