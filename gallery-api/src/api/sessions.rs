//! Filter session endpoints
//!
//! Every state change answers with the new `RenderFrame`, which is what the
//! client redraws: the visible items plus the checked state of every
//! category control.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gallery_common::{Error, RenderFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::sessions::load;
use crate::{ApiError, ApiResult, AppState};

/// Response for POST /api/sessions
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub frame: RenderFrame,
}

/// Body for POST /api/sessions/:id/toggle
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub category: String,
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionCreated>)> {
    let (session_id, handle) = state.sessions.create(state.store.as_ref()).await;
    let frame = handle.lock().await.filter.frame();
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id, frame })))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RenderFrame>> {
    let handle = state.sessions.get(id).await?;
    let mut entry = handle.lock().await;
    entry.touch();
    Ok(Json(entry.filter.frame()))
}

/// POST /api/sessions/:id/toggle
///
/// The slug must belong to the session's known categories. The session lock
/// is held from validation through the recomputed frame.
pub async fn toggle_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> ApiResult<Json<RenderFrame>> {
    let handle = state.sessions.get(id).await?;
    let mut entry = handle.lock().await;

    let category = entry.filter.vocabulary().resolve(&req.category).map_err(unknown_category)?;
    let selected = entry.filter.toggle(&category).map_err(unknown_category)?;
    entry.touch();
    debug!(session = %id, category = %category, selected, "Toggled category");

    Ok(Json(entry.filter.frame()))
}

fn unknown_category(e: Error) -> ApiError {
    match e {
        Error::InvalidCategory(slug) => ApiError::UnknownCategory(slug),
        other => other.into(),
    }
}

/// POST /api/sessions/:id/refresh
///
/// Refetches categories and items. If the store is unreachable the previous
/// view stays and the frame carries the error message.
pub async fn refresh_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RenderFrame>> {
    let handle = state.sessions.get(id).await?;
    let mut entry = handle.lock().await;

    load(&mut entry.filter, state.store.as_ref()).await;
    entry.touch();

    Ok(Json(entry.filter.frame()))
}

/// DELETE /api/sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
