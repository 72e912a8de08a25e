//! Item query and registration endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use gallery_common::store::NewItem;
use gallery_common::{CategoryVocabulary, Item, ItemId, ItemKind};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::current_vocabulary;
use crate::{ApiResult, AppState};

/// Query parameters for GET /api/items
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    /// Category slug; absent or blank means "all categorized items"
    pub category: Option<String>,
}

/// One item as returned by the query endpoint
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    /// Category names, sorted and comma-joined
    pub categories: String,
    pub category_slugs: Vec<String>,
    pub asset_url: String,
    pub link: Option<String>,
}

impl ItemResponse {
    fn from_item(item: Item, vocabulary: &CategoryVocabulary) -> Self {
        Self {
            categories: vocabulary.label_for(&item),
            category_slugs: item.categories.iter().map(|c| c.to_string()).collect(),
            id: item.id,
            name: item.name,
            kind: item.kind,
            asset_url: item.asset_url,
            link: item.link,
        }
    }
}

/// Body for POST /api/items
#[derive(Debug, Deserialize)]
pub struct RegisterItemRequest {
    pub name: String,
    pub asset_url: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub kind: ItemKind,
    /// Required; the request is rejected without it
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/items?category=slug
///
/// Unknown slugs are rejected rather than silently matching nothing.
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> ApiResult<Json<Vec<ItemResponse>>> {
    let vocabulary = current_vocabulary(state.store.as_ref()).await?;

    let filter = match query.category.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => Some(vocabulary.resolve(slug)?),
        _ => None,
    };

    let items = state.store.list_items(filter.as_ref()).await?;
    debug!(filter = ?filter, count = items.len(), "Serving item query");

    Ok(Json(
        items
            .into_iter()
            .map(|item| ItemResponse::from_item(item, &vocabulary))
            .collect(),
    ))
}

/// POST /api/items
pub async fn register_item(
    State(state): State<AppState>,
    Json(req): Json<RegisterItemRequest>,
) -> ApiResult<(StatusCode, Json<ItemResponse>)> {
    let admin = state.admin()?;
    let vocabulary = current_vocabulary(state.store.as_ref()).await?;

    let category = match req.category.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => Some(vocabulary.resolve(slug)?),
        _ => None,
    };

    let item = admin
        .register_item(NewItem {
            name: req.name,
            kind: req.kind,
            asset_url: req.asset_url,
            link: req.link,
            category,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::from_item(item, &vocabulary)),
    ))
}
