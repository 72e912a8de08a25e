//! HTTP API handlers for gallery-api

pub mod associations;
pub mod categories;
pub mod health;
pub mod items;
pub mod sessions;

pub use associations::associate;
pub use categories::{create_category, delete_category, list_categories, rename_category};
pub use health::health_routes;
pub use items::{list_items, register_item};
pub use sessions::{close_session, create_session, get_session, refresh_session, toggle_category};

use gallery_common::{AssociationStore, CategoryVocabulary};

use crate::ApiResult;

/// Fetch the current category vocabulary for validating request slugs
pub(crate) async fn current_vocabulary(store: &dyn AssociationStore) -> ApiResult<CategoryVocabulary> {
    Ok(CategoryVocabulary::new(store.list_categories().await?))
}
