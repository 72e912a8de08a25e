//! Association write endpoint
//!
//! Accepts one item id, a batch, or both. Every item is attempted; the
//! envelope lists the ones that succeeded and a message per failure.

use axum::{extract::State, Json};
use gallery_common::store::associate_items;
use gallery_common::{Error, ItemId};
use serde::{Deserialize, Serialize};

use super::current_vocabulary;
use crate::{ApiResult, AppState};

/// Body for POST /api/associations
#[derive(Debug, Deserialize)]
pub struct AssociateRequest {
    #[serde(default)]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub item_ids: Vec<i64>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Success/failure envelope
#[derive(Debug, Serialize)]
pub struct AssociateResponse {
    pub success: bool,
    pub associated: Vec<ItemId>,
    pub failed: Vec<ItemId>,
    pub messages: Vec<String>,
}

/// POST /api/associations
pub async fn associate(
    State(state): State<AppState>,
    Json(req): Json<AssociateRequest>,
) -> ApiResult<Json<AssociateResponse>> {
    let slug = req
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("invalid or missing category".to_string()))?;

    let category = current_vocabulary(state.store.as_ref()).await?.resolve(slug)?;

    // Duplicate ids are attempted once, in first-seen order
    let mut ids: Vec<ItemId> = Vec::with_capacity(req.item_ids.len() + 1);
    for raw in req.item_id.into_iter().chain(req.item_ids) {
        let id = ItemId(raw);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let report = associate_items(state.store.as_ref(), &ids, &category).await?;

    let success = report.is_success();
    let mut messages = report.messages;
    if success {
        messages.push("Items successfully associated with the category.".to_string());
    }

    Ok(Json(AssociateResponse {
        success,
        associated: report.associated,
        failed: report.failed,
        messages,
    }))
}
