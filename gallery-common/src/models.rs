//! Category and item models
//!
//! `CategoryId` values are only minted by a store (reading its own rows) or by
//! resolving raw request text against a [`CategoryVocabulary`]. Handlers never
//! build one from an unchecked query-string slug.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Label used when an item carries no category at all
pub const UNCATEGORIZED_LABEL: &str = "No categories assigned";

/// Stable category identifier (the category slug)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Wrap a slug read back from a store.
    pub(crate) fn from_store(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item identifier (media attachment or product id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of asset an item is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Media,
    Product,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Media => "media",
            ItemKind::Product => "product",
        }
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "media" => Ok(ItemKind::Media),
            "product" => Ok(ItemKind::Product),
            other => Err(Error::Validation(format!("unknown item kind: {}", other))),
        }
    }
}

/// A taxonomy term used to group items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    #[serde(rename = "slug")]
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    /// Membership size at read time; not authoritative
    pub count: i64,
}

/// A media asset or product subject to filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    pub categories: BTreeSet<CategoryId>,
    pub asset_url: String,
    pub link: Option<String>,
}

impl Item {
    /// True when the item carries at least one of `selection`
    pub fn matches_any(&self, selection: &BTreeSet<CategoryId>) -> bool {
        // Iterate the smaller set
        if self.categories.len() <= selection.len() {
            self.categories.iter().any(|c| selection.contains(c))
        } else {
            selection.iter().any(|c| self.categories.contains(c))
        }
    }
}

/// The set of categories known at one point in time
#[derive(Debug, Clone, Default)]
pub struct CategoryVocabulary {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
}

impl CategoryVocabulary {
    pub fn new(categories: Vec<Category>) -> Self {
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.0.clone(), i))
            .collect();
        Self { categories, index }
    }

    /// Resolve raw client text into a known `CategoryId`
    pub fn resolve(&self, raw: &str) -> Result<CategoryId> {
        let slug = raw.trim();
        if slug.is_empty() {
            return Err(Error::Validation("category is required".to_string()));
        }
        self.index
            .get(slug)
            .map(|&i| self.categories[i].id.clone())
            .ok_or_else(|| Error::InvalidCategory(slug.to_string()))
    }

    pub fn get(&self, id: &CategoryId) -> Option<&Category> {
        self.index.get(id.as_str()).map(|&i| &self.categories[i])
    }

    pub fn contains(&self, id: &CategoryId) -> bool {
        self.index.contains_key(id.as_str())
    }

    /// Categories in store order (by name)
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Display label for an item: its category names sorted and comma-joined.
    ///
    /// Orphaned references (category deleted after association) show the slug.
    pub fn label_for(&self, item: &Item) -> String {
        if item.categories.is_empty() {
            return UNCATEGORIZED_LABEL.to_string();
        }
        let mut names: Vec<&str> = item
            .categories
            .iter()
            .map(|id| self.get(id).map(|c| c.name.as_str()).unwrap_or(id.as_str()))
            .collect();
        names.sort_unstable_by_key(|n| n.to_lowercase());
        names.join(", ")
    }
}

/// Derive a category slug from a display name.
///
/// ASCII alphanumerics are lowercased and kept; any other run becomes a single `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
