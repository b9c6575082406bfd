//! Duplicate line-item aggregation.
//!
//! Collapses the raw items from one extraction into at most one item per
//! `(identifier, display_name)` identity. Two rows with the same code but
//! different names are deliberately NOT merged: that is an ambiguous
//! identity, and reconciliation is the place to resolve or flag it.
//!
//! Merge semantics: quantities add; every optional field back-fills
//! first-write-wins, so a later duplicate never overwrites a value an
//! earlier row already provided.

use std::collections::HashMap;

use crate::models::{AggregatedLineItem, RawLineItem};

/// Aggregate raw items, returning the collapsed list (first-occurrence
/// order) and warnings for rows dropped for missing identity.
pub fn aggregate(raw_items: Vec<RawLineItem>) -> (Vec<AggregatedLineItem>, Vec<String>) {
    let mut aggregated: Vec<AggregatedLineItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut warnings = Vec::new();

    for mut item in raw_items {
        item.identifier = item.identifier.trim().to_string();
        item.display_name = item.display_name.trim().to_string();

        if item.identifier.is_empty() || item.display_name.is_empty() {
            warnings.push(format!(
                "dropped line item with missing identity (identifier: '{}', name: '{}')",
                item.identifier, item.display_name
            ));
            continue;
        }

        let key = (item.identifier.clone(), item.display_name.clone());
        match index.get(&key) {
            Some(&pos) => merge_into(&mut aggregated[pos], item),
            None => {
                index.insert(key, aggregated.len());
                aggregated.push(AggregatedLineItem {
                    item,
                    occurrence_count: 1,
                });
            }
        }
    }

    (aggregated, warnings)
}

/// Fold a duplicate occurrence into an existing aggregate.
fn merge_into(existing: &mut AggregatedLineItem, incoming: RawLineItem) {
    existing.occurrence_count += 1;

    existing.item.quantity = match (existing.item.quantity, incoming.quantity) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, b) => b,
    };

    fill_first(&mut existing.item.brand, incoming.brand);
    fill_first(&mut existing.item.category, incoming.category);
    fill_first(&mut existing.item.description, incoming.description);
    fill_first(&mut existing.item.unit_price, incoming.unit_price);
    fill_first(&mut existing.item.total_price, incoming.total_price);
}

fn fill_first<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if slot.is_none() {
        *slot = incoming;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(identifier: &str, name: &str, quantity: Option<i64>) -> RawLineItem {
        RawLineItem {
            identifier: identifier.to_string(),
            display_name: name.to_string(),
            quantity,
            ..Default::default()
        }
    }

    #[test]
    fn identical_identities_merge_with_summed_quantity() {
        let (out, warnings) = aggregate(vec![
            item("A1", "Widget", Some(5)),
            item("A1", "Widget", Some(3)),
        ]);
        assert!(warnings.is_empty());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item.quantity, Some(8));
        assert_eq!(out[0].occurrence_count, 2);
    }

    #[test]
    fn n_identical_items_yield_one_with_count_n() {
        let n = 7;
        let raws: Vec<_> = (0..n).map(|_| item("Z9", "Gadget", Some(2))).collect();
        let (out, _) = aggregate(raws);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].occurrence_count, n);
        assert_eq!(out[0].item.quantity, Some(2 * n as i64));
    }

    #[test]
    fn same_identifier_different_name_stays_distinct() {
        let (out, _) = aggregate(vec![
            item("A1", "Widget", Some(5)),
            item("A1", "Widget Large", Some(3)),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].item.quantity, Some(5));
        assert_eq!(out[1].item.quantity, Some(3));
    }

    #[test]
    fn no_two_outputs_share_an_identity() {
        let raws = vec![
            item("A1", "Widget", Some(1)),
            item("B2", "Widget", Some(1)),
            item("A1", "Widget", Some(1)),
            item("A1", "Other", Some(1)),
            item("B2", "Widget", None),
        ];
        let (out, _) = aggregate(raws);
        let mut keys: Vec<_> = out
            .iter()
            .map(|a| (a.item.identifier.clone(), a.item.display_name.clone()))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), out.len());
    }

    #[test]
    fn optional_fields_backfill_first_write_wins() {
        let mut first = item("A1", "Widget", Some(5));
        first.unit_price = Some(10.0);
        let mut second = item("A1", "Widget", Some(3));
        second.unit_price = Some(99.0);
        second.brand = Some("Acme".to_string());

        let (out, _) = aggregate(vec![first, second]);
        assert_eq!(out.len(), 1);
        // Price came from the first occurrence; brand back-filled from the second.
        assert_eq!(out[0].item.unit_price, Some(10.0));
        assert_eq!(out[0].item.brand.as_deref(), Some("Acme"));
    }

    #[test]
    fn missing_quantity_does_not_poison_the_sum() {
        let (out, _) = aggregate(vec![
            item("A1", "Widget", None),
            item("A1", "Widget", Some(4)),
            item("A1", "Widget", None),
        ]);
        assert_eq!(out[0].item.quantity, Some(4));
        assert_eq!(out[0].occurrence_count, 3);
    }

    #[test]
    fn empty_identity_rows_drop_with_warning() {
        let (out, warnings) = aggregate(vec![
            item("  ", "  ", Some(5)),
            item("", "Widget", Some(1)),
            item("A1", "", Some(1)),
            item("A1", "Widget", Some(1)),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("missing identity"));
    }

    #[test]
    fn identity_comparison_uses_trimmed_values() {
        let (out, _) = aggregate(vec![
            item(" A1 ", " Widget ", Some(5)),
            item("A1", "Widget", Some(3)),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item.quantity, Some(8));
        assert_eq!(out[0].item.identifier, "A1");
    }
}
