//! # Gallery Common Library
//!
//! Shared code for the gallery service:
//! - Category and item models (validated `CategoryId`, `CategoryVocabulary`)
//! - Filter engine (per-session selection state and filtered views)
//! - Association store contract and its SQLite / WooCommerce backends
//! - Database initialization
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use filter::{FilterSession, RenderFrame};
pub use models::{Category, CategoryId, CategoryVocabulary, Item, ItemId, ItemKind};
pub use store::{AssociationStore, CatalogAdmin};
