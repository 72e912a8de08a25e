//! WooCommerce product feed (REST API v3)
//!
//! Products are items, product categories are categories. The feed is
//! paged; every page is fetched and merged before filtering. A feed larger
//! than the page cap is an error, never a silently truncated listing.
//!
//! Category slug to id lookups are cached briefly so a batch association
//! crawls the category feed once rather than once per item.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::AssociationStore;
use crate::models::{Category, CategoryId, Item, ItemId, ItemKind};
use crate::{Error, Result};

const PER_PAGE: usize = 100;
const MAX_PAGES: u32 = 50;
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";
const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("gallery/", env!("CARGO_PKG_VERSION"));

/// Connection settings for a WooCommerce shop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WooCommerceConfig {
    /// API root, e.g. `https://shop.example/wp-json/wc/v3/`
    pub base_url: String,
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
}

#[derive(Debug, Deserialize)]
struct WcCategory {
    id: i64,
    name: String,
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    count: i64,
}

#[derive(Debug, Deserialize)]
struct WcCategoryRef {
    id: i64,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct WcImage {
    src: String,
}

#[derive(Debug, Deserialize)]
struct WcProduct {
    id: i64,
    name: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    categories: Vec<WcCategoryRef>,
    #[serde(default)]
    images: Vec<WcImage>,
}

#[derive(Debug)]
struct CategoryCache {
    fetched: Instant,
    ids: HashMap<String, i64>,
}

/// Association store reading a WooCommerce shop
pub struct WooCommerceStore {
    http_client: reqwest::Client,
    config: WooCommerceConfig,
    category_cache: Mutex<Option<CategoryCache>>,
}

impl WooCommerceStore {
    pub fn new(config: WooCommerceConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("woocommerce.base_url is required".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            category_cache: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self) -> [(&'static str, &str); 2] {
        [
            ("consumer_key", self.config.consumer_key.as_str()),
            ("consumer_secret", self.config.consumer_secret.as_str()),
        ]
    }

    /// Fetch every page of a list endpoint.
    ///
    /// Stops at the last page reported by `X-WP-TotalPages`, or at the first
    /// short page when the header is absent. Fails rather than truncate when
    /// the feed runs past `MAX_PAGES`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.url(path);
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!(url = %url, page, "Querying WooCommerce");
            let response = self
                .http_client
                .get(&url)
                .query(&self.auth())
                .query(params)
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::UpstreamUnavailable(format!(
                    "GET {} returned {}",
                    path, status
                )));
            }

            let total_pages = response
                .headers()
                .get(TOTAL_PAGES_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());
            if let Some(total) = total_pages.filter(|&t| t > MAX_PAGES) {
                warn!(path, total, max = MAX_PAGES, "WooCommerce feed too large");
                return Err(Error::UpstreamUnavailable(format!(
                    "GET {} has {} pages, more than the {} page limit",
                    path, total, MAX_PAGES
                )));
            }

            let batch: Vec<T> = response.json().await?;
            let done = match total_pages {
                Some(total) => page >= total,
                None => batch.len() < PER_PAGE,
            };
            all.extend(batch);
            if done {
                return Ok(all);
            }
            if page >= MAX_PAGES {
                warn!(path, max = MAX_PAGES, "WooCommerce feed still full at page limit");
                return Err(Error::UpstreamUnavailable(format!(
                    "GET {} still full after {} pages",
                    path, MAX_PAGES
                )));
            }
            page += 1;
        }
    }

    /// Fetch the category feed and refresh the slug cache
    async fn fetch_categories(&self) -> Result<Vec<WcCategory>> {
        let feed: Vec<WcCategory> = self.get_all("products/categories", &[]).await?;
        *self.category_cache.lock().await = Some(CategoryCache {
            fetched: Instant::now(),
            ids: feed.iter().map(|c| (c.slug.clone(), c.id)).collect(),
        });
        Ok(feed)
    }

    /// Shop id for a category slug; `None` if the shop has no such category.
    ///
    /// Served from the cache while it is fresh; a miss forces one refetch.
    async fn category_id(&self, category: &CategoryId) -> Result<Option<i64>> {
        if let Some(cache) = self.category_cache.lock().await.as_ref() {
            if cache.fetched.elapsed() < CATEGORY_CACHE_TTL {
                if let Some(&id) = cache.ids.get(category.as_str()) {
                    return Ok(Some(id));
                }
            }
        }

        Ok(self
            .fetch_categories()
            .await?
            .into_iter()
            .find(|c| c.slug == category.as_str())
            .map(|c| c.id))
    }

    async fn fetch_product(&self, item: ItemId) -> Result<WcProduct> {
        let response = self
            .http_client
            .get(self.url(&format!("products/{}", item.0)))
            .query(&self.auth())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::InvalidItem(item)),
            status if status.is_success() => Ok(response.json().await?),
            status => Err(Error::UpstreamUnavailable(format!(
                "GET products/{} returned {}",
                item, status
            ))),
        }
    }
}

fn categories_from_feed(feed: Vec<WcCategory>) -> Vec<Category> {
    let mut categories: Vec<Category> = feed
        .into_iter()
        .map(|c| Category {
            id: CategoryId::from_store(c.slug),
            name: c.name,
            description: c.description,
            count: c.count,
        })
        .collect();
    categories.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    categories
}

fn items_from_feed(feed: Vec<WcProduct>, filter: Option<&CategoryId>) -> Vec<Item> {
    let mut items: Vec<Item> = feed
        .into_iter()
        .filter(|p| !p.categories.is_empty())
        .map(|p| Item {
            id: ItemId(p.id),
            name: p.name,
            kind: ItemKind::Product,
            categories: p
                .categories
                .into_iter()
                .map(|c| CategoryId::from_store(c.slug))
                .collect::<BTreeSet<_>>(),
            asset_url: p.images.into_iter().next().map(|i| i.src).unwrap_or_default(),
            link: Some(p.permalink).filter(|l| !l.is_empty()),
        })
        .filter(|item| filter.map_or(true, |f| item.categories.contains(f)))
        .collect();
    items.sort_by_key(|i| i.id);
    items
}

#[async_trait]
impl AssociationStore for WooCommerceStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(categories_from_feed(self.fetch_categories().await?))
    }

    async fn list_items(&self, filter: Option<&CategoryId>) -> Result<Vec<Item>> {
        let params = match filter {
            None => Vec::new(),
            Some(category) => match self.category_id(category).await? {
                Some(id) => vec![("category", id.to_string())],
                None => {
                    debug!(filter = %category, "Unknown category, no products");
                    return Ok(Vec::new());
                }
            },
        };

        let products: Vec<WcProduct> = self.get_all("products", &params).await?;
        let items = items_from_feed(products, filter);
        debug!(filter = ?filter.map(|f| f.as_str()), count = items.len(), "Listed products");
        Ok(items)
    }

    async fn associate_item(&self, item: ItemId, category: &CategoryId) -> Result<()> {
        let target = self
            .category_id(category)
            .await?
            .ok_or_else(|| Error::InvalidCategory(category.to_string()))?;

        let product = self.fetch_product(item).await?;
        if product.categories.iter().any(|c| c.id == target) {
            debug!(item = %item, category = %category, "Product already in category");
            return Ok(());
        }

        // The API replaces the category list, so send the merged set
        let mut ids: Vec<i64> = product.categories.iter().map(|c| c.id).collect();
        ids.push(target);
        let body = json!({
            "categories": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
        });

        let response = self
            .http_client
            .put(self.url(&format!("products/{}", item.0)))
            .query(&self.auth())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "PUT products/{} returned {}",
                item, status
            )));
        }

        info!(item = %item, category = %category, "Associated product with category");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "woocommerce"
    }
}
