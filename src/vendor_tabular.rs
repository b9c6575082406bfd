//! Deterministic column mappers for vendors with known spreadsheet layouts.
//!
//! These strategies never call the delegated capability: the layouts are
//! stable enough to read by column name, which keeps extraction exact and
//! free for the formats that dominate intake volume.
//!
//! A row missing both its identifier and its name is skipped here (blank
//! and summary rows); a row with only one of the two flows through so the
//! aggregator can record the drop as a warning.

use anyhow::Result;
use async_trait::async_trait;

use crate::extractor::LineItemExtractor;
use crate::models::{ExtractionResult, HeaderInfo, RawLineItem};
use crate::normalize::{ContentShape, NormalizedContent, RowRecord};
use crate::strategy::{
    expect_rows, map_rows_generic, parse_price, parse_quantity, VendorStrategy,
};

/// Amazon purchase orders: one row per ASIN with a contractual column set
/// (PO, Vendor, Ship to location, ASIN, Title, Window end, Quantity
/// Outstanding, Unit Cost, Total cost).
pub struct AmazonStrategy;

#[async_trait]
impl VendorStrategy for AmazonStrategy {
    fn vendor(&self) -> &str {
        "amazon"
    }

    fn description(&self) -> &str {
        "Amazon PO spreadsheets (ASIN / Title / Quantity Outstanding / Unit Cost)"
    }

    fn supports(&self, shape: ContentShape) -> bool {
        shape == ContentShape::Rows
    }

    async fn extract(
        &self,
        content: &NormalizedContent,
        _extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult> {
        let rows = expect_rows(content)?;

        let mut header_info = HeaderInfo::new();
        header_info.insert("document_type".to_string(), "Purchase Order".to_string());
        header_info.insert("extraction_method".to_string(), "deterministic".to_string());
        if let Some(first) = rows.first() {
            copy_header(&mut header_info, "document_number", first.get_any(&["PO", "PO Number"]));
            copy_header(&mut header_info, "vendor_name", first.get("Vendor"));
            copy_header(&mut header_info, "shipping_address", first.get("Ship to location"));
            copy_header(&mut header_info, "delivery_date", first.get("Window end"));
        }

        let mut items = Vec::new();
        for row in rows {
            let asin = row.get("ASIN");
            let title = row.get("Title");
            if asin.is_none() && title.is_none() {
                continue;
            }

            let quantity = row
                .get_any(&["Quantity Outstanding", "Quantity"])
                .and_then(parse_quantity);
            let unit_price = row.get("Unit Cost").and_then(parse_price);
            let total_price = row
                .get("Total cost")
                .and_then(parse_price)
                .or_else(|| match (quantity, unit_price) {
                    (Some(q), Some(p)) => Some(q as f64 * p),
                    _ => None,
                });

            items.push(RawLineItem {
                identifier: asin.unwrap_or_default().to_string(),
                display_name: title.unwrap_or_default().to_string(),
                brand: title.and_then(brand_from_name),
                category: Some("Amazon PO".to_string()),
                quantity,
                unit_price,
                total_price,
                description: None,
            });
        }

        Ok(ExtractionResult { header_info, items })
    }
}

/// Zepto purchase orders exported as spreadsheets: PoNumber, Sku (a UUID),
/// MaterialCode, SkuDesc, Brand, Quantity, UnitBaseCost, TotalAmount.
pub struct ZeptoSpreadsheetStrategy;

#[async_trait]
impl VendorStrategy for ZeptoSpreadsheetStrategy {
    fn vendor(&self) -> &str {
        "zepto"
    }

    fn description(&self) -> &str {
        "Zepto PO spreadsheets (MaterialCode / SkuDesc / Quantity / UnitBaseCost)"
    }

    fn supports(&self, shape: ContentShape) -> bool {
        shape == ContentShape::Rows
    }

    async fn extract(
        &self,
        content: &NormalizedContent,
        _extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult> {
        let rows = expect_rows(content)?;

        let mut header_info = HeaderInfo::new();
        header_info.insert("document_type".to_string(), "Purchase Order".to_string());
        header_info.insert("extraction_method".to_string(), "deterministic".to_string());
        if let Some(first) = rows.first() {
            copy_header(&mut header_info, "document_number", first.get("PoNumber"));
            copy_header(&mut header_info, "document_date", first.get("PoDate"));
            copy_header(&mut header_info, "vendor_name", first.get("VendorName"));
            match (first.get("StoreName"), first.get("DeliveryLocation")) {
                (Some(store), Some(loc)) => {
                    header_info
                        .insert("shipping_address".to_string(), format!("{} - {}", store, loc));
                }
                (Some(one), None) | (None, Some(one)) => {
                    header_info.insert("shipping_address".to_string(), one.to_string());
                }
                (None, None) => {}
            }
        }

        let mut items = Vec::new();
        for row in rows {
            // MaterialCode is the readable product code; Sku is Zepto's
            // internal UUID, kept as a secondary reference.
            let material = row.get("MaterialCode");
            let sku = row.get("Sku");
            let name = row.get_any(&["SkuDesc", "Item Description"]);
            if material.is_none() && sku.is_none() && name.is_none() {
                continue;
            }

            let identifier = material.or(sku).unwrap_or_default().to_string();
            let description = match (material, sku) {
                (Some(_), Some(uuid)) => Some(format!("Vendor row id: {}", uuid)),
                _ => None,
            };

            items.push(RawLineItem {
                identifier,
                display_name: name.unwrap_or_default().to_string(),
                brand: row.get("Brand").map(|s| s.to_string()),
                category: Some("Zepto PO".to_string()),
                quantity: row.get("Quantity").and_then(parse_quantity),
                unit_price: row
                    .get_any(&["UnitBaseCost", "LandingCost"])
                    .and_then(parse_price),
                total_price: row.get("TotalAmount").and_then(parse_price),
                description,
            });
        }

        Ok(ExtractionResult { header_info, items })
    }
}

/// BigBasket purchase orders: a header block (PO number, vendor, addresses)
/// above the item table, so the real column row has to be located first.
pub struct BigBasketStrategy;

/// How deep to look for the item table's header row.
const BIGBASKET_HEADER_SCAN_ROWS: usize = 20;

#[async_trait]
impl VendorStrategy for BigBasketStrategy {
    fn vendor(&self) -> &str {
        "bigbasket"
    }

    fn description(&self) -> &str {
        "BigBasket PO spreadsheets (header block, then EAN / Description / PO Qty)"
    }

    fn supports(&self, shape: ContentShape) -> bool {
        shape == ContentShape::Rows
    }

    async fn extract(
        &self,
        content: &NormalizedContent,
        _extractor: &dyn LineItemExtractor,
    ) -> Result<ExtractionResult> {
        let rows = expect_rows(content)?;

        let mut header_info = HeaderInfo::new();
        header_info.insert("document_type".to_string(), "Purchase Order".to_string());
        header_info.insert("extraction_method".to_string(), "deterministic".to_string());

        let header_row = rows
            .iter()
            .take(BIGBASKET_HEADER_SCAN_ROWS)
            .position(is_item_table_header);

        let header_idx = match header_row {
            Some(idx) => idx,
            None => {
                // No recognizable item table; same sheet-level mapping the
                // generic fallback applies.
                let items = map_rows_generic(rows);
                return Ok(ExtractionResult { header_info, items });
            }
        };

        // Document fields live in the preamble rows above the table.
        for row in &rows[..header_idx] {
            let text = row.values().collect::<Vec<_>>().join(" ");
            if text.contains("PO No") {
                copy_header(&mut header_info, "document_number", label_value(&text, "PO No"));
            }
            if text.contains("Vendor") {
                copy_header(&mut header_info, "vendor_name", label_value(&text, "Vendor"));
            }
        }

        let columns = column_map(&rows[header_idx]);
        let col = |row: &RowRecord, needle: &str| -> Option<String> {
            columns
                .iter()
                .find(|(name, _)| name.contains(needle))
                .and_then(|(_, idx)| row.value_at(*idx))
                .map(|s| s.to_string())
        };

        let mut items = Vec::new();
        for row in &rows[header_idx + 1..] {
            let ean = col(row, "ean").or_else(|| col(row, "article"));
            let name = col(row, "description").or_else(|| col(row, "item"));
            if ean.is_none() && name.is_none() {
                continue;
            }
            let quantity = col(row, "qty").as_deref().and_then(parse_quantity);
            let unit_price = col(row, "rate")
                .or_else(|| col(row, "cost"))
                .or_else(|| col(row, "mrp"))
                .as_deref()
                .and_then(parse_price);

            items.push(RawLineItem {
                identifier: ean.unwrap_or_default(),
                display_name: name.unwrap_or_default(),
                brand: None,
                category: Some("BigBasket PO".to_string()),
                quantity,
                unit_price,
                total_price: None,
                description: None,
            });
        }

        Ok(ExtractionResult { header_info, items })
    }
}

/// The item table header row mentions an identifier column and a quantity
/// column together.
fn is_item_table_header(row: &RowRecord) -> bool {
    let text = row.values().collect::<Vec<_>>().join(" ").to_lowercase();
    (text.contains("ean") || text.contains("article")) && text.contains("qty")
}

/// Lowercased cell value -> position, for sheets whose real header row is
/// not the sheet's first row.
fn column_map(header_row: &RowRecord) -> Vec<(String, usize)> {
    header_row
        .cells
        .iter()
        .enumerate()
        .filter(|(_, (_, v))| !v.trim().is_empty())
        .map(|(i, (_, v))| (v.trim().to_lowercase(), i))
        .collect()
}

/// Pull the value following a label out of a preamble line
/// ("PO No: BB-1042, Date: ..." -> "BB-1042").
fn label_value<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let after = text.split(label).nth(1)?;
    let value = after
        .split([',', ';'])
        .next()?
        .trim_start_matches([':', ' '])
        .trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// First word of a product title, the usual brand position in Amazon rows.
fn brand_from_name(name: &str) -> Option<String> {
    name.split_whitespace().next().map(|w| w.to_string())
}

fn copy_header(header_info: &mut HeaderInfo, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        header_info.insert(key.to_string(), v.to_string());
    }
}
