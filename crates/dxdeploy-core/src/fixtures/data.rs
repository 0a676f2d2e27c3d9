//! Declarative fixture graph read from a tests manifest's data file.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SeedError;

/// Every entity a seeding run reconciles.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureData {
    pub table_objects: Vec<TableObjectFixture>,
    pub collections: Vec<CollectionFixture>,
    pub purchases: Vec<PurchaseFixture>,
}

impl FixtureData {
    /// Reads and parses a fixture data file.
    pub async fn load(path: &Path) -> Result<Self, SeedError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::DataIo {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| SeedError::DataParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns `true` if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_objects.is_empty() && self.collections.is_empty() && self.purchases.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableObjectFixture {
    pub uuid: Uuid,
    pub user_id: i64,
    pub table_id: i64,
    #[serde(default, alias = "isFile")]
    pub file: bool,
    /// Properties in declaration order; `null` counts as empty.
    #[serde(default)]
    pub properties: IndexMap<String, Option<PropertyValue>>,
    /// Only written when the table object is created.
    #[serde(default)]
    pub price: Option<PriceFixture>,
}

impl TableObjectFixture {
    /// Declared properties with their values rendered as text.
    #[must_use]
    pub fn declared_properties(&self) -> Vec<(String, String)> {
        self.properties
            .iter()
            .map(|(name, value)| {
                let text = value.as_ref().map(PropertyValue::to_text).unwrap_or_default();
                (name.clone(), text)
            })
            .collect()
    }
}

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    /// Text form stored in the properties table.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Unsigned(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceFixture {
    pub price: i32,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionFixture {
    pub table_id: i64,
    pub name: String,
    /// Members, replacing whatever the collection held before.
    #[serde(default)]
    pub table_objects: Vec<Uuid>,
}

impl CollectionFixture {
    #[must_use]
    pub fn label(&self) -> String {
        format!("collection {}/{}", self.table_id, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFixture {
    pub id: i64,
    pub user_id: i64,
    pub uuid: Uuid,
    pub price: i32,
    pub currency: String,
    #[serde(default)]
    pub completed: bool,
    /// Purchased items, replacing whatever the purchase held before.
    #[serde(default)]
    pub table_objects: Vec<Uuid>,
}

impl PurchaseFixture {
    #[must_use]
    pub fn label(&self) -> String {
        format!("purchase {}", self.id)
    }
}
