//! Extraction strategy trait, registry, and the generic fallback.
//!
//! Every vendor's extraction logic sits behind one shared interface so the
//! router never inspects concrete types. A strategy is either a
//! deterministic column mapper over normalized rows or an instruction set
//! handed to the delegated extraction capability over normalized text.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              StrategyRegistry                 │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────┐  │
//! │  │ Deterministic│ │  Delegated   │ │Generic│  │
//! │  │ amazon/zepto │ │ blinkit/dmart│ │fallbck│  │
//! │  │ /bigbasket   │ │ /zepto/swiggy│ │       │  │
//! │  └──────────────┘ └──────────────┘ └───────┘  │
//! └──────────────────────┬────────────────────────┘
//!                        ▼
//!            select(vendor_tag, shape) → extraction
//! ```
//!
//! Selection never fails: an unknown vendor tag, or a known vendor with no
//! strategy for the document's shape, resolves to the generic fallback.

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::extractor::LineItemExtractor;
use crate::models::{ExtractionResult, HeaderInfo, RawLineItem};
use crate::normalize::{ContentShape, NormalizedContent, RowRecord};
use crate::vendor_delegated::BASE_INSTRUCTIONS;

/// One vendor's extraction strategy.
///
/// Implementations must be pure with respect to the catalog: they read
/// normalized content (and may call the injected delegated capability) and
/// return header info plus raw line items, nothing else.
#[async_trait]
pub trait VendorStrategy: Send + Sync {
    /// Vendor tag this strategy answers to (e.g. `"amazon"`).
    fn vendor(&self) -> &str;

    /// One-line description shown by `intake vendors`.
    fn description(&self) -> &str;

    /// Whether this strategy handles tabular rows or free text.
    fn supports(&self, shape: ContentShape) -> bool;

    /// Extract header info and raw line items from normalized content.
    ///
    /// Deterministic strategies ignore `extractor`; delegated strategies
    /// hand it their instruction set. A failure here fails the run — the
    /// router never swaps strategies behind the caller's back.
    async fn extract(
        &self,
        content: &NormalizedContent,
        extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult>;
}

/// Registry of vendor strategies with a structurally guaranteed fallback.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn VendorStrategy>>,
    fallback: GenericStrategy,
}

impl StrategyRegistry {
    /// Create an empty registry (generic fallback only).
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            fallback: GenericStrategy,
        }
    }

    /// Create a registry pre-loaded with all built-in vendor strategies.
    pub fn with_builtins() -> Self {
        use crate::vendor_delegated;
        use crate::vendor_tabular;

        let mut registry = Self::new();
        registry.register(Box::new(vendor_tabular::AmazonStrategy));
        registry.register(Box::new(vendor_tabular::ZeptoSpreadsheetStrategy));
        registry.register(Box::new(vendor_tabular::BigBasketStrategy));
        registry.register(Box::new(vendor_delegated::blinkit()));
        registry.register(Box::new(vendor_delegated::dmart()));
        registry.register(Box::new(vendor_delegated::zepto()));
        registry.register(Box::new(vendor_delegated::swiggy()));
        registry
    }

    /// Register a strategy.
    pub fn register(&mut self, strategy: Box<dyn VendorStrategy>) {
        self.strategies.push(strategy);
    }

    /// Select the strategy for a vendor tag and content shape.
    ///
    /// Total: unknown tags (and known tags with no strategy for this
    /// shape) resolve to the generic fallback, never an error.
    pub fn select(&self, vendor_tag: &str, shape: ContentShape) -> &dyn VendorStrategy {
        self.strategies
            .iter()
            .find(|s| s.vendor().eq_ignore_ascii_case(vendor_tag) && s.supports(shape))
            .map(|s| s.as_ref())
            .unwrap_or(&self.fallback)
    }

    /// All registered strategies plus the fallback, for listings.
    pub fn strategies(&self) -> impl Iterator<Item = &dyn VendorStrategy> {
        self.strategies
            .iter()
            .map(|s| s.as_ref())
            .chain(std::iter::once(&self.fallback as &dyn VendorStrategy))
    }

    /// Count of vendor-specific strategies (fallback excluded).
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Header-role heuristics shared by the generic path and vendor strategies
// ═══════════════════════════════════════════════════════════════════════

pub(crate) const IDENTIFIER_HEADERS: &[&str] =
    &["sku", "code", "asin", "ean", "article", "material", "upc"];
pub(crate) const NAME_HEADERS: &[&str] = &["name", "title", "desc", "item"];
pub(crate) const QUANTITY_HEADERS: &[&str] = &["qty", "quantity", "stock", "closing", "units"];
pub(crate) const PRICE_HEADERS: &[&str] = &["price", "cost", "rate", "mrp", "amount"];
pub(crate) const BRAND_HEADERS: &[&str] = &["brand"];
pub(crate) const CATEGORY_HEADERS: &[&str] = &["group", "category", "catg"];

/// Parse a quantity cell; vendor sheets hold "4800", "40.00", "1,200".
pub(crate) fn parse_quantity(raw: &str) -> Option<i64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f as i64))
}

/// Parse a price cell, tolerating thousands separators.
pub(crate) fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Heuristic row mapping: guess column roles from header names.
///
/// Rows that don't yield both an identifier and a name are skipped, so a
/// sheet with no plausible identifier or name column maps to zero items
/// rather than guesses.
pub(crate) fn map_rows_generic(rows: &[RowRecord]) -> Vec<RawLineItem> {
    let mut items = Vec::new();
    for row in rows {
        let ident_idx = row.find_containing(IDENTIFIER_HEADERS);
        let name_idx = find_excluding(row, NAME_HEADERS, &[ident_idx]);
        let (identifier, display_name) = match (
            ident_idx.and_then(|i| row.value_at(i)),
            name_idx.and_then(|i| row.value_at(i)),
        ) {
            (Some(id), Some(name)) => (id.to_string(), name.to_string()),
            _ => continue,
        };

        let qty_idx = find_excluding(row, QUANTITY_HEADERS, &[ident_idx, name_idx]);
        let price_idx = find_excluding(row, PRICE_HEADERS, &[ident_idx, name_idx, qty_idx]);
        let brand_idx = find_excluding(row, BRAND_HEADERS, &[ident_idx, name_idx]);
        let category_idx = find_excluding(row, CATEGORY_HEADERS, &[ident_idx, name_idx, brand_idx]);

        items.push(RawLineItem {
            identifier,
            display_name,
            brand: brand_idx
                .and_then(|i| row.value_at(i))
                .map(|s| s.to_string()),
            category: category_idx
                .and_then(|i| row.value_at(i))
                .map(|s| s.to_string()),
            quantity: qty_idx.and_then(|i| row.value_at(i)).and_then(parse_quantity),
            unit_price: price_idx.and_then(|i| row.value_at(i)).and_then(parse_price),
            total_price: None,
            description: None,
        });
    }
    items
}

/// First cell whose header contains a needle, skipping indices already
/// claimed by another role (an "Item Code" header must not double as both
/// identifier and name).
fn find_excluding(row: &RowRecord, needles: &[&str], taken: &[Option<usize>]) -> Option<usize> {
    row.cells.iter().enumerate().position(|(i, (h, _))| {
        if taken.contains(&Some(i)) {
            return false;
        }
        let h = h.to_lowercase();
        needles.iter().any(|n| h.contains(n))
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Generic fallback
// ═══════════════════════════════════════════════════════════════════════

/// Fallback strategy for vendors with no registered handler.
///
/// Rows go through header-role guessing; text goes to the delegated
/// capability with the base instruction set.
pub struct GenericStrategy;

#[async_trait]
impl VendorStrategy for GenericStrategy {
    fn vendor(&self) -> &str {
        "generic"
    }

    fn description(&self) -> &str {
        "Header-role guessing for rows; base instruction set for text"
    }

    fn supports(&self, _shape: ContentShape) -> bool {
        true
    }

    async fn extract(
        &self,
        content: &NormalizedContent,
        extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult> {
        match content {
            NormalizedContent::Rows(rows) => {
                let items = map_rows_generic(rows);
                let mut header_info = HeaderInfo::new();
                header_info.insert("document_type".to_string(), "Stock Sheet".to_string());
                header_info.insert("extraction_method".to_string(), "deterministic".to_string());
                Ok(ExtractionResult { header_info, items })
            }
            NormalizedContent::Text(text) => {
                let mut result = extractor.extract(BASE_INSTRUCTIONS, text).await?;
                result
                    .header_info
                    .insert("extraction_method".to_string(), "delegated".to_string());
                result
                    .header_info
                    .insert("extractor".to_string(), extractor.name().to_string());
                Ok(result)
            }
        }
    }
}

/// Delegated extraction over rows makes no sense; guard for strategies
/// that only handle text.
pub(crate) fn expect_text(content: &NormalizedContent) -> Result<&str> {
    match content {
        NormalizedContent::Text(text) => Ok(text),
        NormalizedContent::Rows(_) => {
            bail!("strategy expects free text but received tabular rows")
        }
    }
}

/// Counterpart guard for strategies that only handle rows.
pub(crate) fn expect_rows(content: &NormalizedContent) -> Result<&[RowRecord]> {
    match content {
        NormalizedContent::Rows(rows) => Ok(rows),
        NormalizedContent::Text(_) => {
            bail!("strategy expects tabular rows but received free text")
        }
    }
}
