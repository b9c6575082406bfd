//! Catalog and stock reconciliation.
//!
//! Applies aggregated line items to the catalog and ledger, one item at a
//! time. Items are independent units: one item's failure is recorded and
//! the batch continues. Each item's catalog update, stock write, and
//! ledger append commit together or not at all.
//!
//! The one concurrency hazard handled explicitly is the create race:
//! between the lookup that misses and the INSERT that follows, another
//! document processing the same new identifier can win the insert. The
//! unique-identifier violation is then converted into the update path and
//! logged as a recovered race, never surfaced as a fatal error.

use anyhow::{anyhow, Result};
use sqlx::SqlitePool;

use crate::catalog::{self, REASON_DOCUMENT_INTAKE};
use crate::models::{
    AggregatedLineItem, ItemError, MovementDirection, RawLineItem, ReconciliationSummary,
};

/// Per-run reconciliation behavior.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Report unknown identifiers as unmatched instead of creating entries.
    pub match_existing_only: bool,
    /// Add incoming quantities to on-hand stock (true) or replace it (false).
    pub add_to_stock: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            match_existing_only: false,
            add_to_stock: true,
        }
    }
}

enum ItemOutcome {
    Created { stocked: bool },
    Updated { stocked: bool },
    Unmatched,
}

enum CreateError {
    /// Another writer created the identifier between lookup and insert.
    Raced,
    Other(anyhow::Error),
}

/// Reconcile a document's aggregated items against the catalog and ledger.
///
/// Never fails as a whole: per-item errors land in `summary.errors` and
/// the remaining items still run.
pub async fn reconcile_items(
    pool: &SqlitePool,
    document_id: &str,
    items: &[AggregatedLineItem],
    opts: &ReconcileOptions,
) -> ReconciliationSummary {
    let mut summary = ReconciliationSummary {
        extracted: items.len() as u64,
        ..Default::default()
    };

    for agg in items {
        match reconcile_one(pool, document_id, &agg.item, opts).await {
            Ok(ItemOutcome::Created { stocked }) => {
                summary.created += 1;
                if stocked {
                    summary.stock_updated += 1;
                }
            }
            Ok(ItemOutcome::Updated { stocked }) => {
                summary.matched += 1;
                summary.updated += 1;
                if stocked {
                    summary.stock_updated += 1;
                }
            }
            Ok(ItemOutcome::Unmatched) => {
                summary.unmatched.push(agg.item.identifier.clone());
            }
            Err(e) => {
                summary.errors.push(ItemError {
                    identifier: agg.item.identifier.clone(),
                    display_name: agg.item.display_name.clone(),
                    message: format!("{:#}", e),
                });
            }
        }
    }

    summary
}

async fn reconcile_one(
    pool: &SqlitePool,
    document_id: &str,
    item: &RawLineItem,
    opts: &ReconcileOptions,
) -> Result<ItemOutcome> {
    let existing = {
        let mut conn = pool.acquire().await?;
        catalog::find_entry(&mut conn, &item.identifier).await?
    };

    match existing {
        Some(entry) => apply_update(pool, document_id, &entry, item, opts).await,
        None if opts.match_existing_only => Ok(ItemOutcome::Unmatched),
        None => create_or_recover(pool, document_id, item, opts).await,
    }
}

/// Create path with explicit race recovery: a unique-identifier violation
/// means a concurrent creation won, so this item's data is applied through
/// the update path instead.
async fn create_or_recover(
    pool: &SqlitePool,
    document_id: &str,
    item: &RawLineItem,
    opts: &ReconcileOptions,
) -> Result<ItemOutcome> {
    match try_create(pool, document_id, item).await {
        Ok(outcome) => Ok(outcome),
        Err(CreateError::Raced) => {
            eprintln!(
                "[reconcile] create race on identifier '{}' recovered via update",
                item.identifier
            );
            let entry = {
                let mut conn = pool.acquire().await?;
                catalog::find_entry(&mut conn, &item.identifier).await?
            }
            .ok_or_else(|| {
                anyhow!(
                    "identifier '{}' vanished after create race",
                    item.identifier
                )
            })?;
            apply_update(pool, document_id, &entry, item, opts).await
        }
        Err(CreateError::Other(e)) => Err(e),
    }
}

async fn try_create(
    pool: &SqlitePool,
    document_id: &str,
    item: &RawLineItem,
) -> Result<ItemOutcome, CreateError> {
    let mut tx = pool.begin().await.map_err(wrap_other)?;
    let now = chrono::Utc::now().timestamp();

    let entry_id = match catalog::create_entry(&mut tx, item, now).await {
        Ok(id) => id,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Err(CreateError::Raced);
        }
        Err(e) => return Err(CreateError::Other(e.into())),
    };

    let mut stocked = false;
    if let Some(quantity) = item.quantity.filter(|q| *q > 0) {
        catalog::set_stock(&mut tx, &entry_id, quantity)
            .await
            .map_err(CreateError::Other)?;
        catalog::append_movement(
            &mut tx,
            &entry_id,
            MovementDirection::In,
            quantity,
            0,
            quantity,
            REASON_DOCUMENT_INTAKE,
            Some(document_id),
            None,
        )
        .await
        .map_err(CreateError::Other)?;
        stocked = true;
    }

    tx.commit().await.map_err(wrap_other)?;
    Ok(ItemOutcome::Created { stocked })
}

fn wrap_other(e: sqlx::Error) -> CreateError {
    CreateError::Other(e.into())
}

async fn apply_update(
    pool: &SqlitePool,
    document_id: &str,
    entry: &crate::models::CatalogEntry,
    item: &RawLineItem,
    opts: &ReconcileOptions,
) -> Result<ItemOutcome> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    catalog::update_entry(&mut tx, entry, item, now).await?;

    let mut stocked = false;
    // Absent or non-positive quantities skip the stock and ledger step
    // entirely, in both add and replace mode.
    if let Some(quantity) = item.quantity.filter(|q| *q > 0) {
        let previous = catalog::stock_quantity(&mut tx, &entry.id).await?.unwrap_or(0);
        let new_quantity = if opts.add_to_stock {
            previous
                .checked_add(quantity)
                .ok_or_else(|| anyhow!("stock quantity overflow for '{}'", item.identifier))?
        } else {
            quantity
        };

        let delta = new_quantity - previous;
        if delta != 0 {
            catalog::set_stock(&mut tx, &entry.id, new_quantity).await?;
            catalog::append_movement(
                &mut tx,
                &entry.id,
                MovementDirection::from_delta(delta),
                delta.abs(),
                previous,
                new_quantity,
                REASON_DOCUMENT_INTAKE,
                Some(document_id),
                None,
            )
            .await?;
            stocked = true;
        }
    }

    tx.commit().await?;
    Ok(ItemOutcome::Updated { stocked })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AdjustTarget;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn agg(identifier: &str, name: &str, quantity: Option<i64>) -> AggregatedLineItem {
        AggregatedLineItem {
            item: RawLineItem {
                identifier: identifier.to_string(),
                display_name: name.to_string(),
                quantity,
                ..Default::default()
            },
            occurrence_count: 1,
        }
    }

    async fn stock_of(pool: &SqlitePool, identifier: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        let entry = catalog::find_entry(&mut conn, identifier)
            .await
            .unwrap()
            .unwrap();
        catalog::stock_quantity(&mut conn, &entry.id)
            .await
            .unwrap()
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn new_identifier_creates_entry_and_in_movement() {
        let pool = test_pool().await;
        let summary = reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", Some(8))],
            &ReconcileOptions::default(),
        )
        .await;

        assert_eq!(summary.created, 1);
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.stock_updated, 1);
        assert!(summary.errors.is_empty());

        assert_eq!(stock_of(&pool, "A1").await, 8);
        let movements = catalog::list_movements(&pool, "A1").await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].direction, "IN");
        assert_eq!(movements[0].previous_quantity, 0);
        assert_eq!(movements[0].magnitude, 8);
        assert_eq!(movements[0].document_ref.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn zero_or_missing_quantity_skips_stock_and_ledger() {
        let pool = test_pool().await;
        let summary = reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", None), agg("B2", "Gadget", Some(0))],
            &ReconcileOptions::default(),
        )
        .await;
        assert_eq!(summary.created, 2);
        assert_eq!(summary.stock_updated, 0);
        assert!(catalog::list_movements(&pool, "A1").await.unwrap().is_empty());
        assert!(catalog::list_movements(&pool, "B2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sequential_add_mode_accumulates() {
        let pool = test_pool().await;
        let opts = ReconcileOptions::default();
        reconcile_items(&pool, "doc-1", &[agg("A1", "Widget", Some(5))], &opts).await;
        let summary = reconcile_items(&pool, "doc-2", &[agg("A1", "Widget", Some(3))], &opts).await;

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(stock_of(&pool, "A1").await, 8);

        let movements = catalog::list_movements(&pool, "A1").await.unwrap();
        assert_eq!(movements.len(), 2);
        let delta_sum: i64 = movements
            .iter()
            .map(|m| m.new_quantity - m.previous_quantity)
            .sum();
        assert_eq!(delta_sum, 8);
    }

    #[tokio::test]
    async fn replace_mode_sets_exact_quantity() {
        let pool = test_pool().await;
        reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", Some(10))],
            &ReconcileOptions::default(),
        )
        .await;

        let replace = ReconcileOptions {
            add_to_stock: false,
            ..Default::default()
        };
        reconcile_items(&pool, "doc-2", &[agg("A1", "Widget", Some(4))], &replace).await;

        assert_eq!(stock_of(&pool, "A1").await, 4);
        let movements = catalog::list_movements(&pool, "A1").await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements.iter().any(|m| m.direction == "OUT" && m.magnitude == 6));
    }

    #[tokio::test]
    async fn replace_mode_with_unchanged_quantity_appends_nothing() {
        let pool = test_pool().await;
        reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", Some(10))],
            &ReconcileOptions::default(),
        )
        .await;
        let replace = ReconcileOptions {
            add_to_stock: false,
            ..Default::default()
        };
        let summary =
            reconcile_items(&pool, "doc-2", &[agg("A1", "Widget", Some(10))], &replace).await;
        assert_eq!(summary.stock_updated, 0);
        assert_eq!(catalog::list_movements(&pool, "A1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn match_existing_only_reports_unmatched_without_mutation() {
        let pool = test_pool().await;
        let opts = ReconcileOptions {
            match_existing_only: true,
            ..Default::default()
        };
        let summary = reconcile_items(&pool, "doc-1", &[agg("A1", "Widget", Some(5))], &opts).await;

        assert_eq!(summary.unmatched, vec!["A1".to_string()]);
        assert_eq!(summary.created, 0);
        let mut conn = pool.acquire().await.unwrap();
        assert!(catalog::find_entry(&mut conn, "A1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_race_recovers_via_update_path() {
        let pool = test_pool().await;
        // The other writer won between our lookup and our insert.
        {
            let mut conn = pool.acquire().await.unwrap();
            catalog::create_entry(
                &mut conn,
                &RawLineItem {
                    identifier: "A1".to_string(),
                    display_name: "Widget".to_string(),
                    ..Default::default()
                },
                0,
            )
            .await
            .unwrap();
        }

        let outcome = create_or_recover(
            &pool,
            "doc-2",
            &RawLineItem {
                identifier: "A1".to_string(),
                display_name: "Widget Deluxe Edition".to_string(),
                quantity: Some(6),
                ..Default::default()
            },
            &ReconcileOptions::default(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ItemOutcome::Updated { stocked: true }));
        assert_eq!(stock_of(&pool, "A1").await, 6);

        // Exactly one entry exists and the loser's data went through update.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries WHERE identifier = 'A1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
        let mut conn = pool.acquire().await.unwrap();
        let entry = catalog::find_entry(&mut conn, "A1").await.unwrap().unwrap();
        assert_eq!(entry.display_name, "Widget Deluxe Edition");
    }

    #[tokio::test]
    async fn trivial_name_does_not_clobber_stored_name() {
        let pool = test_pool().await;
        reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Known Good Name", Some(1))],
            &ReconcileOptions::default(),
        )
        .await;
        reconcile_items(
            &pool,
            "doc-2",
            &[agg("A1", "NG", Some(1))],
            &ReconcileOptions::default(),
        )
        .await;

        let mut conn = pool.acquire().await.unwrap();
        let entry = catalog::find_entry(&mut conn, "A1").await.unwrap().unwrap();
        assert_eq!(entry.display_name, "Known Good Name");
    }

    #[tokio::test]
    async fn one_item_failure_does_not_abort_the_batch() {
        let pool = test_pool().await;
        // Seed A1 with stock so adding i64::MAX overflows.
        reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", Some(1))],
            &ReconcileOptions::default(),
        )
        .await;

        let summary = reconcile_items(
            &pool,
            "doc-2",
            &[
                agg("A1", "Widget", Some(i64::MAX)),
                agg("B2", "Gadget", Some(3)),
            ],
            &ReconcileOptions::default(),
        )
        .await;

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].identifier, "A1");
        assert!(summary.errors[0].message.contains("overflow"));
        assert_eq!(summary.created, 1);
        assert_eq!(stock_of(&pool, "B2").await, 3);
    }

    #[tokio::test]
    async fn reconciliation_and_manual_adjust_share_the_ledger() {
        let pool = test_pool().await;
        reconcile_items(
            &pool,
            "doc-1",
            &[agg("A1", "Widget", Some(8))],
            &ReconcileOptions::default(),
        )
        .await;
        catalog::adjust_stock(&pool, "A1", AdjustTarget::Delta(-3), Some("DAMAGE"), None)
            .await
            .unwrap();

        let movements = catalog::list_movements(&pool, "A1").await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(stock_of(&pool, "A1").await, 5);
    }
}
