// src/catalog/mod.rs
//! Catalog rows and the repository port used by a sync run.

pub mod in_memory;
pub mod postgrest;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RepositoryError;
use crate::pricing::PriceQuote;

/// Opaque row identifier. Stores hand out integers or strings; both are kept
/// as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! item_id_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for ItemId {
            fn from(v: $t) -> Self {
                Self(v.to_string())
            }
        }
    )*};
}

item_id_from_int!(i32, i64, u32, u64);

impl From<&str> for ItemId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Uint(u64),
            Text(String),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::Int(v) => Self(v.to_string()),
            Raw::Uint(v) => Self(v.to_string()),
            Raw::Text(v) => Self(v),
        })
    }
}

/// A catalog row eligible for price sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub sku: String,
}

/// A SKU is syncable when present and not blank.
pub fn is_syncable(sku: Option<&str>) -> bool {
    sku.is_some_and(|s| !s.trim().is_empty())
}

/// Build a [`CatalogItem`] from a raw row, or `None` when the row has no usable SKU.
pub fn syncable_item(id: ItemId, sku: Option<&str>) -> Option<CatalogItem> {
    if !is_syncable(sku) {
        return None;
    }
    sku.map(|s| CatalogItem {
        id,
        sku: s.trim().to_string(),
    })
}

/// Read/write access to the catalog store.
///
/// `apply_quote` is atomic per row and stamps "last updated" at write time.
/// There is no cross-row transaction.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Every row with a non-blank SKU. Order is unspecified.
    async fn list_syncable_items(&self) -> Result<Vec<CatalogItem>, RepositoryError>;

    async fn apply_quote(&self, id: &ItemId, quote: &PriceQuote) -> Result<(), RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_missing_skus_are_not_syncable() {
        assert!(!is_syncable(None));
        assert!(!is_syncable(Some("")));
        assert!(!is_syncable(Some("  \t")));
        assert!(is_syncable(Some("A")));
    }

    #[test]
    fn syncable_item_trims_sku() {
        let it = syncable_item(ItemId::from(7), Some(" SKU-7 ")).unwrap();
        assert_eq!(it.sku, "SKU-7");
        assert_eq!(it.id.as_str(), "7");
        assert!(syncable_item(ItemId::from(8), Some(" ")).is_none());
    }

    #[test]
    fn item_id_accepts_numbers_and_strings() {
        let a: ItemId = serde_json::from_str("42").unwrap();
        let b: ItemId = serde_json::from_str(r#""0b4f-uuid""#).unwrap();
        assert_eq!(a, ItemId::from("42"));
        assert_eq!(b.as_str(), "0b4f-uuid");
        assert_eq!(serde_json::to_string(&a).unwrap(), r#""42""#);
    }
}
