//! Category endpoints
//!
//! Listing works on every backend; create/rename/delete need a writable catalog.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gallery_common::Category;
use serde::Deserialize;

use super::current_vocabulary;
use crate::{ApiResult, AppState};

/// Body for POST /api/categories
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Body for PATCH /api/categories/:slug
#[derive(Debug, Deserialize)]
pub struct RenameCategoryRequest {
    pub name: String,
}

/// GET /api/categories
///
/// All categories including empty ones, ordered by name.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.store.list_categories().await?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let admin = state.admin()?;
    let category = admin.create_category(&req.name, &req.description).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/:slug
///
/// Only the display name changes; the slug is stable.
pub async fn rename_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<RenameCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let admin = state.admin()?;
    let id = current_vocabulary(state.store.as_ref()).await?.resolve(&slug)?;
    Ok(Json(admin.rename_category(&id, &req.name).await?))
}

/// DELETE /api/categories/:slug
pub async fn delete_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    let admin = state.admin()?;
    let id = current_vocabulary(state.store.as_ref()).await?.resolve(&slug)?;
    admin.delete_category(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
