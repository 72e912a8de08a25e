//! Local catalog backed by SQLite

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::{AssociationStore, CatalogAdmin, NewItem};
use crate::models::{slugify, Category, CategoryId, Item, ItemId, ItemKind};
use crate::{Error, Result};

/// SQLite-backed association store
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    async fn fetch_category(&self, slug: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT c.slug, c.name, c.description, COUNT(ic.item_id)
             FROM categories c
             LEFT JOIN item_categories ic ON ic.category_slug = c.slug
             WHERE c.slug = ?
             GROUP BY c.slug",
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| Category {
            id: CategoryId::from_store(row.get::<String, _>(0)),
            name: row.get(1),
            description: row.get(2),
            count: row.get(3),
        }))
    }

    async fn item_exists(&self, item: ItemId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE id = ?")
            .bind(item.0)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn category_exists(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl AssociationStore for SqliteStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT c.slug, c.name, c.description, COUNT(ic.item_id)
             FROM categories c
             LEFT JOIN item_categories ic ON ic.category_slug = c.slug
             GROUP BY c.slug
             ORDER BY c.name COLLATE NOCASE ASC, c.slug ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Category {
                id: CategoryId::from_store(row.get::<String, _>(0)),
                name: row.get(1),
                description: row.get(2),
                count: row.get(3),
            })
            .collect())
    }

    async fn list_items(&self, filter: Option<&CategoryId>) -> Result<Vec<Item>> {
        let slug = filter.map(|c| c.as_str());

        // One row per (item, category); inner join drops uncategorized items
        let rows = sqlx::query(
            "SELECT i.id, i.name, i.kind, i.asset_url, i.link, ic.category_slug
             FROM items i
             JOIN item_categories ic ON ic.item_id = i.id
             WHERE ? IS NULL
                OR i.id IN (SELECT item_id FROM item_categories WHERE category_slug = ?)
             ORDER BY i.id ASC, ic.category_slug ASC",
        )
        .bind(slug)
        .bind(slug)
        .fetch_all(&self.db)
        .await?;

        let mut items: Vec<Item> = Vec::new();
        for row in &rows {
            let id = ItemId(row.get::<i64, _>(0));
            let category = CategoryId::from_store(row.get::<String, _>(5));

            match items.last_mut() {
                Some(last) if last.id == id => {
                    last.categories.insert(category);
                }
                _ => {
                    let kind: String = row.get(2);
                    let kind = kind.parse::<ItemKind>().map_err(|_| {
                        Error::UpstreamUnavailable(format!("malformed kind for item {}: {}", id, kind))
                    })?;
                    items.push(Item {
                        id,
                        name: row.get(1),
                        kind,
                        categories: BTreeSet::from([category]),
                        asset_url: row.get(3),
                        link: row.get(4),
                    });
                }
            }
        }

        debug!(filter = ?slug, count = items.len(), "Listed items");
        Ok(items)
    }

    async fn associate_item(&self, item: ItemId, category: &CategoryId) -> Result<()> {
        if !self.item_exists(item).await? {
            return Err(Error::InvalidItem(item));
        }
        if !self.category_exists(category.as_str()).await? {
            return Err(Error::InvalidCategory(category.to_string()));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO item_categories (item_id, category_slug) VALUES (?, ?)",
        )
        .bind(item.0)
        .bind(category.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            debug!(item = %item, category = %category, "Association already present");
        } else {
            info!(item = %item, category = %category, "Associated item with category");
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl CatalogAdmin for SqliteStore {
    async fn create_category(&self, name: &str, description: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("category name cannot be empty".to_string()));
        }
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::Validation(format!(
                "category name has no usable characters: {}",
                name
            )));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO categories (slug, name, description, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&slug)
        .bind(name)
        .bind(description.trim())
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Validation(format!("category already exists: {}", slug)));
        }

        info!(slug = %slug, name = %name, "Created category");
        Ok(Category {
            id: CategoryId::from_store(slug),
            name: name.to_string(),
            description: description.trim().to_string(),
            count: 0,
        })
    }

    async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("category name cannot be empty".to_string()));
        }

        let result = sqlx::query("UPDATE categories SET name = ? WHERE slug = ?")
            .bind(name)
            .bind(id.as_str())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::InvalidCategory(id.to_string()));
        }

        info!(slug = %id, name = %name, "Renamed category");
        self.fetch_category(id.as_str())
            .await?
            .ok_or_else(|| Error::InvalidCategory(id.to_string()))
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE slug = ?")
            .bind(id.as_str())
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::InvalidCategory(id.to_string()));
        }
        info!(slug = %id, "Deleted category");
        Ok(())
    }

    async fn register_item(&self, item: NewItem) -> Result<Item> {
        let name = item.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("item name cannot be empty".to_string()));
        }
        let asset_url = item.asset_url.trim();
        if asset_url.is_empty() {
            return Err(Error::Validation("asset URL cannot be empty".to_string()));
        }
        let category = item
            .category
            .ok_or_else(|| Error::Validation("a category is required for new items".to_string()))?;
        if !self.category_exists(category.as_str()).await? {
            return Err(Error::InvalidCategory(category.to_string()));
        }
        let link = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());

        let mut tx = self.db.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO items (name, kind, asset_url, link, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(name)
        .bind(item.kind.as_str())
        .bind(asset_url)
        .bind(&link)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO item_categories (item_id, category_slug) VALUES (?, ?)")
            .bind(id)
            .bind(category.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(item = id, category = %category, "Registered item");
        Ok(Item {
            id: ItemId(id),
            name: name.to_string(),
            kind: item.kind,
            categories: BTreeSet::from([category]),
            asset_url: asset_url.to_string(),
            link,
        })
    }
}
