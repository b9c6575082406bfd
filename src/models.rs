//! Core data models used throughout the intake pipeline.
//!
//! These types represent the documents, line items, catalog entries, and
//! ledger records that flow through the extraction and reconciliation
//! pipeline. Everything persisted as JSON (header info, aggregated items,
//! the reconciliation summary) derives serde so the stored shape stays
//! stable across releases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted document.
///
/// `Pending` and `Processing` are the only states a polling client should
/// expect to change; `Completed` and `Failed` are terminal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Processing => "PROCESSING",
            DocumentStatus::Completed => "COMPLETED",
            DocumentStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<DocumentStatus> {
        match s {
            "PENDING" => Some(DocumentStatus::Pending),
            "PROCESSING" => Some(DocumentStatus::Processing),
            "COMPLETED" => Some(DocumentStatus::Completed),
            "FAILED" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

/// A submitted vendor document and the persisted output of its latest run.
///
/// Owned exclusively by the status tracker; everything outside the pipeline
/// reads these fields and never writes them.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub source_path: String,
    pub content_kind: String,
    pub vendor_tag: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub status: DocumentStatus,
    pub run_count: i64,
    pub header_json: Option<String>,
    pub line_items_json: Option<String>,
    pub summary_json: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: i64,
    pub processed_at: Option<i64>,
}

/// Header-level metadata pulled from a document (PO number, vendor name,
/// document date, ...). Keys are free-form; the router adds its own
/// (e.g. `truncated`) alongside whatever the strategy found.
pub type HeaderInfo = BTreeMap<String, String>;

/// One line item as a strategy extracted it, before aggregation.
///
/// `(identifier, display_name)` is the aggregation identity; `identifier`
/// alone is the catalog-matching identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLineItem {
    pub identifier: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A line item after duplicate collapsing.
///
/// `occurrence_count > 1` means the document listed the same
/// `(identifier, display_name)` more than once — some sources legitimately
/// split one item across rows, so this is informational, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedLineItem {
    #[serde(flatten)]
    pub item: RawLineItem,
    pub occurrence_count: u32,
}

/// Uniform output of every extraction strategy: header metadata plus the
/// raw line items found in the document.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub header_info: HeaderInfo,
    pub items: Vec<RawLineItem>,
}

/// A product in the catalog. Created or updated by reconciliation, never
/// deleted by this pipeline.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct CatalogEntry {
    pub id: String,
    pub identifier: String,
    pub display_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub sell_price: Option<f64>,
    pub cost_price: Option<f64>,
    pub min_threshold: i64,
}

/// Direction of a stock movement. The sign of
/// `new_quantity - previous_quantity` always agrees with the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementDirection {
    In,
    Out,
    Adjust,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "IN",
            MovementDirection::Out => "OUT",
            MovementDirection::Adjust => "ADJUST",
        }
    }

    /// Direction implied by a quantity delta.
    pub fn from_delta(delta: i64) -> MovementDirection {
        if delta > 0 {
            MovementDirection::In
        } else if delta < 0 {
            MovementDirection::Out
        } else {
            MovementDirection::Adjust
        }
    }
}

/// One append-only ledger record. Never mutated or deleted.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct StockMovement {
    pub id: String,
    pub catalog_entry_id: String,
    pub direction: String,
    pub magnitude: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reason: String,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
    pub recorded_at: i64,
}

/// One failed line item inside an otherwise-continuing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub identifier: String,
    pub display_name: String,
    pub message: String,
}

/// Durable record of what a processing run did to the catalog and ledger.
///
/// A run with entries in `unmatched` or `errors` still completes; these
/// fields are how partial failure is reported without failing the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub extracted: u64,
    pub matched: u64,
    pub created: u64,
    pub updated: u64,
    pub unmatched: Vec<String>,
    pub stock_updated: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<ItemError>,
}

/// Derived stock state for the `products` read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "IN_STOCK",
            StockStatus::LowStock => "LOW_STOCK",
            StockStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }

    pub fn parse(s: &str) -> Option<StockStatus> {
        match s {
            "IN_STOCK" => Some(StockStatus::InStock),
            "LOW_STOCK" => Some(StockStatus::LowStock),
            "OUT_OF_STOCK" => Some(StockStatus::OutOfStock),
            _ => None,
        }
    }

    /// Status from on-hand quantity vs the minimum threshold.
    pub fn derive(quantity: i64, min_threshold: i64) -> StockStatus {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= min_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}
