//! Association store contract
//!
//! The filter engine only ever talks to an [`AssociationStore`]. Two backends
//! exist: the local SQLite catalog and the WooCommerce product feed.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::{Category, CategoryId, Item, ItemId, ItemKind};
use crate::{Error, Result};

pub mod sqlite;
pub mod woocommerce;

pub use sqlite::SqliteStore;
pub use woocommerce::{WooCommerceConfig, WooCommerceStore};

/// Read/associate operations every backend provides
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// All categories, including empty ones, ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>>;

    /// Items with at least one category, or only those carrying `filter`.
    ///
    /// Ordered by item id ascending. An unknown category yields no items.
    async fn list_items(&self, filter: Option<&CategoryId>) -> Result<Vec<Item>>;

    /// Associate `item` with `category`; re-associating is a no-op success
    async fn associate_item(&self, item: ItemId, category: &CategoryId) -> Result<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// A new item to register in the catalog
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub kind: ItemKind,
    pub asset_url: String,
    pub link: Option<String>,
    /// Required: uploads without a category are rejected
    pub category: Option<CategoryId>,
}

/// Catalog administration (local backend only)
#[async_trait]
pub trait CatalogAdmin: AssociationStore {
    async fn create_category(&self, name: &str, description: &str) -> Result<Category>;

    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<Category>;

    /// Remove the category; item associations pointing at it are left orphaned
    async fn delete_category(&self, id: &CategoryId) -> Result<()>;

    async fn register_item(&self, item: NewItem) -> Result<Item>;
}

/// Outcome of a batch association
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AssociationReport {
    pub associated: Vec<ItemId>,
    pub failed: Vec<ItemId>,
    pub messages: Vec<String>,
}

impl AssociationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Associate every id in `items` with `category`.
///
/// Keeps going past failures: successful associations stay, and every failing
/// item gets a message in the report. Upstream outages abort the batch since
/// every remaining call would fail the same way.
pub async fn associate_items(
    store: &dyn AssociationStore,
    items: &[ItemId],
    category: &CategoryId,
) -> Result<AssociationReport> {
    if items.is_empty() {
        return Err(Error::Validation("no items selected".to_string()));
    }

    let mut report = AssociationReport::default();
    for &item in items {
        match store.associate_item(item, category).await {
            Ok(()) => report.associated.push(item),
            Err(e @ Error::UpstreamUnavailable(_)) => return Err(e),
            Err(e) => {
                warn!(item = %item, category = %category, error = %e, "Association failed");
                report.failed.push(item);
                report.messages.push(format!("item {}: {}", item, e));
            }
        }
    }

    if !report.failed.is_empty() {
        let ids: Vec<String> = report.failed.iter().map(|i| i.to_string()).collect();
        report.messages.insert(
            0,
            format!(
                "Some items were not associated with the category: {}",
                ids.join(", ")
            ),
        );
    }

    info!(
        category = %category,
        associated = report.associated.len(),
        failed = report.failed.len(),
        "Batch association finished"
    );
    Ok(report)
}
