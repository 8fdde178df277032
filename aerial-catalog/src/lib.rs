//! Read-only access to the `com.apple.idleassetsd` customer store: the
//! `entries.json` asset catalog and the localized display-name table that
//! sits next to it.

pub mod models;
pub mod store;

pub use models::{Asset, CatalogEntries, Category};
pub use store::{CatalogError, CatalogStore, ResolvedAsset, StorePaths};
