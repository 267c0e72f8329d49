//! Catalog access
//!
//! The catalog itself (CRUD, validation, pagination) lives in an external
//! service. This module adapts whatever that service returns into
//! [`InventoryRecord`]s and provides the synthetic fallback catalog used when
//! the service is unavailable.

mod http;
mod synthetic;

pub use http::{HttpCatalogAccessor, PRODUCTS_PATH};
pub use synthetic::{SyntheticCatalog, DEFAULT_SYNTHETIC_SIZE};

use crate::models::{InventoryRecord, RecordId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub use async_trait::async_trait;

/// Trait for catalog sources
#[async_trait]
pub trait CatalogAccessor: Send + Sync {
    /// Fetch the full catalog in source order
    async fn fetch(&self) -> Result<Vec<CatalogEntry>>;

    /// Human-readable source description for logs
    fn describe(&self) -> String;
}

/// One catalog record as delivered by the catalog service.
///
/// The service has used two naming schemes over time (`inventory` vs
/// `inventory_level`, ...). Both are accepted; the short name wins when both
/// are present. Every field is kept as raw JSON so a single odd value only
/// affects its own record: numeric fields may arrive as numbers or numeric
/// strings, and ids and names as numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_level: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_sales: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_sales: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_replenish: Option<Value>,
}

impl CatalogEntry {
    /// Decode one element of a catalog listing; only non-objects are rejected
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Convert to a pipeline record. `position` is the zero-based index in
    /// the source sequence and stands in for a missing or unusable id.
    pub fn into_record(self, position: usize) -> InventoryRecord {
        let id = self
            .id
            .as_ref()
            .and_then(record_id)
            .unwrap_or_else(|| RecordId::Int(position as i64 + 1));

        let name = self
            .name
            .as_ref()
            .and_then(text_value)
            .or_else(|| self.product_name.as_ref().and_then(text_value))
            .unwrap_or_else(|| format!("Product {}", id));

        InventoryRecord {
            id,
            name,
            inventory_level: numeric_field(self.inventory, self.inventory_level),
            average_sales: numeric_field(self.avg_sales, self.average_sales),
            lead_time_days: numeric_field(self.lead_time, self.days_to_replenish),
        }
    }
}

/// Decode a catalog listing element by element, skipping elements that are
/// not records
pub fn decode_entries(values: Vec<Value>) -> Vec<CatalogEntry> {
    let total = values.len();
    let entries: Vec<CatalogEntry> = values
        .into_iter()
        .filter_map(CatalogEntry::from_value)
        .collect();

    if entries.len() < total {
        warn!(
            skipped = total - entries.len(),
            kept = entries.len(),
            "Skipped catalog elements that are not records"
        );
    }
    entries
}

/// Map a whole catalog, preserving source order
pub fn into_records(entries: Vec<CatalogEntry>) -> Vec<InventoryRecord> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_record(i))
        .collect()
}

/// Integral numbers become numeric ids; other numbers and non-blank strings
/// become textual ids
fn record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(id), _) => Some(RecordId::Int(id)),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some(RecordId::Int(f as i64))
            }
            _ => Some(RecordId::Text(n.to_string())),
        },
        other => text_value(other).map(RecordId::Text),
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_field(primary: Option<Value>, alternate: Option<Value>) -> Option<f64> {
    primary.or(alternate).map(|v| numeric_value(&v))
}

/// Loose numeric parse: numbers and numeric strings convert, anything else is NaN
fn numeric_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// In-memory catalog source
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogAccessor {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalogAccessor {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Build from a JSON array in the catalog service's wire format
    pub fn from_json(json: &str) -> Result<Self> {
        let values: Vec<Value> =
            serde_json::from_str(json).context("Failed to parse catalog JSON")?;
        Ok(Self {
            entries: decode_entries(values),
        })
    }
}

#[async_trait]
impl CatalogAccessor for StaticCatalogAccessor {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }

    fn describe(&self) -> String {
        format!("static catalog ({} entries)", self.entries.len())
    }
}
