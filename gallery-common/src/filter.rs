//! Filter engine
//!
//! One `FilterSession` per browsing session. The session owns the selected
//! categories, the last fetched items and the category vocabulary; every
//! mutation goes through `toggle`, `set_items` or `set_vocabulary`, and the
//! caller asks for a fresh [`RenderFrame`] afterwards.
//!
//! The selection is always a subset of the vocabulary: `toggle` rejects ids
//! the session does not know, and `set_vocabulary` drops selected ids that
//! vanished. Toggles are applied against whatever items are cached at the
//! time, so a toggle before the items land produces an empty view until
//! `set_items` is called.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{CategoryId, CategoryVocabulary, Item, ItemId, ItemKind};
use crate::{Error, Result};

/// Per-session filter state
#[derive(Debug, Clone, Default)]
pub struct FilterSession {
    selection: BTreeSet<CategoryId>,
    items: Vec<Item>,
    vocabulary: CategoryVocabulary,
    last_error: Option<String>,
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id` in the selection.
    ///
    /// Returns `true` when the category is selected afterwards. Ids outside
    /// the session vocabulary are rejected and leave the selection untouched.
    pub fn toggle(&mut self, id: &CategoryId) -> Result<bool> {
        if self.selection.remove(id) {
            return Ok(false);
        }
        if !self.vocabulary.contains(id) {
            return Err(Error::InvalidCategory(id.to_string()));
        }
        self.selection.insert(id.clone());
        Ok(true)
    }

    /// Replace the cached items; the selection is left alone
    pub fn set_items(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    /// Replace the known categories, dropping selected ids that vanished
    pub fn set_vocabulary(&mut self, vocabulary: CategoryVocabulary) {
        self.selection.retain(|id| vocabulary.contains(id));
        self.vocabulary = vocabulary;
    }

    /// Record (or clear) a non-fatal error shown alongside the current view
    pub fn set_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }

    pub fn selection(&self) -> &BTreeSet<CategoryId> {
        &self.selection
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    /// Items matching the selection, in cached order.
    ///
    /// An empty selection means "no filter". Multiple selected categories
    /// combine with OR: an item carrying any one of them is included.
    pub fn filtered_view(&self) -> Vec<&Item> {
        if self.selection.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| item.matches_any(&self.selection))
            .collect()
    }

    /// Build the render instruction for the current state
    pub fn frame(&self) -> RenderFrame {
        let items: Vec<ItemView> = self
            .filtered_view()
            .into_iter()
            .map(|item| ItemView {
                id: item.id,
                name: item.name.clone(),
                kind: item.kind,
                categories: self.vocabulary.label_for(item),
                category_slugs: item.categories.iter().map(|c| c.to_string()).collect(),
                asset_url: item.asset_url.clone(),
                link: item.link.clone(),
            })
            .collect();

        let controls = self
            .vocabulary
            .categories()
            .iter()
            .map(|c| CategoryControl {
                slug: c.id.to_string(),
                name: c.name.clone(),
                count: c.count,
                checked: self.selection.contains(&c.id),
            })
            .collect();

        RenderFrame {
            total: self.items.len(),
            visible: items.len(),
            selection: self.selection.iter().map(|c| c.to_string()).collect(),
            controls,
            items,
            error: self.last_error.clone(),
        }
    }
}

/// One rendered item row
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemView {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    /// Display label of the item's categories
    pub categories: String,
    pub category_slugs: Vec<String>,
    pub asset_url: String,
    pub link: Option<String>,
}

/// Checkbox state of one category control
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryControl {
    pub slug: String,
    pub name: String,
    pub count: i64,
    pub checked: bool,
}

/// What the rendering surface must redraw after a state change
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderFrame {
    pub items: Vec<ItemView>,
    pub controls: Vec<CategoryControl>,
    pub selection: Vec<String>,
    pub total: usize,
    pub visible: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderFrame {
    pub fn item_ids(&self) -> Vec<i64> {
        self.items.iter().map(|i| i.id.0).collect()
    }
}
