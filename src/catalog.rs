//! Catalog and stock-ledger store surface.
//!
//! The mutation primitives (create entry, update entry, read/write stock,
//! append movement) take `&mut SqliteConnection` so reconciliation can run
//! an entry update, its stock write, and its ledger append inside ONE
//! transaction; a stock record must never exist without its audit entry.
//!
//! The read models (`products`, `movements`) and the manual adjustment
//! command operate on the pool directly.

use anyhow::{bail, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::models::{CatalogEntry, MovementDirection, RawLineItem, StockMovement, StockStatus};

/// Reason recorded on movements written by document reconciliation.
pub const REASON_DOCUMENT_INTAKE: &str = "DOCUMENT_INTAKE";
/// Reason recorded on manual adjustments when none is given.
pub const REASON_ADJUSTMENT: &str = "ADJUSTMENT";

pub async fn find_entry(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> Result<Option<CatalogEntry>> {
    let row = sqlx::query(
        r#"
        SELECT id, identifier, display_name, brand, category, description,
               sell_price, cost_price, min_threshold
        FROM catalog_entries WHERE identifier = ?
        "#,
    )
    .bind(identifier)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| CatalogEntry {
        id: row.get("id"),
        identifier: row.get("identifier"),
        display_name: row.get("display_name"),
        brand: row.get("brand"),
        category: row.get("category"),
        description: row.get("description"),
        sell_price: row.get("sell_price"),
        cost_price: row.get("cost_price"),
        min_threshold: row.get("min_threshold"),
    }))
}

/// Insert a new catalog entry from an extracted line item.
///
/// Returns the raw sqlx error so the caller can distinguish a
/// unique-identifier violation (the create race) from real failures.
pub async fn create_entry(
    conn: &mut SqliteConnection,
    item: &RawLineItem,
    now: i64,
) -> std::result::Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO catalog_entries
            (id, identifier, display_name, brand, category, description,
             cost_price, min_threshold, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&item.identifier)
    .bind(&item.display_name)
    .bind(&item.brand)
    .bind(&item.category)
    .bind(&item.description)
    .bind(item.unit_price)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(id)
}

/// True when an incoming name should replace the stored one: non-trivial
/// and actually different. Keeps a noisy free-text extraction from
/// clobbering a known-good name with a fragment.
pub fn should_replace_name(stored: &str, incoming: &str) -> bool {
    let incoming = incoming.trim();
    incoming.len() > 2 && incoming != stored
}

/// Update an existing entry's mutable fields from an extracted line item.
/// Optional fields only overwrite when the item provides them.
pub async fn update_entry(
    conn: &mut SqliteConnection,
    entry: &CatalogEntry,
    item: &RawLineItem,
    now: i64,
) -> Result<()> {
    let display_name = if should_replace_name(&entry.display_name, &item.display_name) {
        item.display_name.clone()
    } else {
        entry.display_name.clone()
    };

    sqlx::query(
        r#"
        UPDATE catalog_entries
        SET display_name = ?,
            brand = COALESCE(?, brand),
            category = COALESCE(?, category),
            description = COALESCE(?, description),
            cost_price = COALESCE(?, cost_price),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&display_name)
    .bind(&item.brand)
    .bind(&item.category)
    .bind(&item.description)
    .bind(item.unit_price)
    .bind(now)
    .bind(&entry.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn stock_quantity(
    conn: &mut SqliteConnection,
    catalog_entry_id: &str,
) -> Result<Option<i64>> {
    let quantity: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM stock_levels WHERE catalog_entry_id = ?")
            .bind(catalog_entry_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(quantity)
}

pub async fn set_stock(
    conn: &mut SqliteConnection,
    catalog_entry_id: &str,
    quantity: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_levels (catalog_entry_id, quantity) VALUES (?, ?)
        ON CONFLICT(catalog_entry_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(catalog_entry_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn append_movement(
    conn: &mut SqliteConnection,
    catalog_entry_id: &str,
    direction: MovementDirection,
    magnitude: i64,
    previous_quantity: i64,
    new_quantity: i64,
    reason: &str,
    document_ref: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements
            (id, catalog_entry_id, direction, magnitude, previous_quantity,
             new_quantity, reason, document_ref, notes, recorded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(catalog_entry_id)
    .bind(direction.as_str())
    .bind(magnitude)
    .bind(previous_quantity)
    .bind(new_quantity)
    .bind(reason)
    .bind(document_ref)
    .bind(notes)
    .bind(chrono::Utc::now().timestamp())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Read models
// ═══════════════════════════════════════════════════════════════════════

/// One line of the `products` listing.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub identifier: String,
    pub display_name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub min_threshold: i64,
    pub status: StockStatus,
}

/// Catalog entries with on-hand quantity and derived stock status,
/// optionally filtered by a substring query and/or a status.
pub async fn list_products(
    pool: &SqlitePool,
    query: Option<&str>,
    status_filter: Option<StockStatus>,
) -> Result<Vec<ProductRow>> {
    let pattern = query.map(|q| format!("%{}%", q));
    let rows = match &pattern {
        Some(p) => {
            sqlx::query(
                r#"
                SELECT c.identifier, c.display_name, c.brand, c.category, c.min_threshold,
                       COALESCE(s.quantity, 0) AS quantity
                FROM catalog_entries c
                LEFT JOIN stock_levels s ON s.catalog_entry_id = c.id
                WHERE c.identifier LIKE ? OR c.display_name LIKE ?
                   OR c.brand LIKE ? OR c.category LIKE ?
                ORDER BY c.display_name ASC
                "#,
            )
            .bind(p)
            .bind(p)
            .bind(p)
            .bind(p)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT c.identifier, c.display_name, c.brand, c.category, c.min_threshold,
                       COALESCE(s.quantity, 0) AS quantity
                FROM catalog_entries c
                LEFT JOIN stock_levels s ON s.catalog_entry_id = c.id
                ORDER BY c.display_name ASC
                "#,
            )
            .fetch_all(pool)
            .await?
        }
    };

    let mut products: Vec<ProductRow> = rows
        .into_iter()
        .map(|row| {
            let quantity: i64 = row.get("quantity");
            let min_threshold: i64 = row.get("min_threshold");
            ProductRow {
                identifier: row.get("identifier"),
                display_name: row.get("display_name"),
                brand: row.get("brand"),
                category: row.get("category"),
                quantity,
                min_threshold,
                status: StockStatus::derive(quantity, min_threshold),
            }
        })
        .collect();

    if let Some(filter) = status_filter {
        products.retain(|p| p.status == filter);
    }

    Ok(products)
}

/// Ledger trail for one product, newest first.
pub async fn list_movements(pool: &SqlitePool, identifier: &str) -> Result<Vec<StockMovement>> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.catalog_entry_id, m.direction, m.magnitude,
               m.previous_quantity, m.new_quantity, m.reason,
               m.document_ref, m.notes, m.recorded_at
        FROM stock_movements m
        JOIN catalog_entries c ON c.id = m.catalog_entry_id
        WHERE c.identifier = ?
        ORDER BY m.recorded_at DESC, m.id
        "#,
    )
    .bind(identifier)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| StockMovement {
            id: row.get("id"),
            catalog_entry_id: row.get("catalog_entry_id"),
            direction: row.get("direction"),
            magnitude: row.get("magnitude"),
            previous_quantity: row.get("previous_quantity"),
            new_quantity: row.get("new_quantity"),
            reason: row.get("reason"),
            document_ref: row.get("document_ref"),
            notes: row.get("notes"),
            recorded_at: row.get("recorded_at"),
        })
        .collect())
}

/// Target of a manual stock adjustment.
#[derive(Debug, Clone, Copy)]
pub enum AdjustTarget {
    /// Set the on-hand quantity to this value.
    Set(i64),
    /// Add this (possibly negative) delta to the on-hand quantity.
    Delta(i64),
}

/// Manually adjust one product's stock, writing through the same
/// movement-appending surface reconciliation uses. The result is clamped
/// at zero; a no-change adjustment still records an ADJUST movement.
pub async fn adjust_stock(
    pool: &SqlitePool,
    identifier: &str,
    target: AdjustTarget,
    reason: Option<&str>,
    notes: Option<&str>,
) -> Result<(i64, i64)> {
    let mut tx = pool.begin().await?;

    let entry = match find_entry(&mut tx, identifier).await? {
        Some(entry) => entry,
        None => bail!("no catalog entry with identifier '{}'", identifier),
    };

    let previous = stock_quantity(&mut tx, &entry.id).await?.unwrap_or(0);
    let new_quantity = match target {
        AdjustTarget::Set(q) => q.max(0),
        AdjustTarget::Delta(d) => (previous + d).max(0),
    };

    set_stock(&mut tx, &entry.id, new_quantity).await?;

    let delta = new_quantity - previous;
    append_movement(
        &mut tx,
        &entry.id,
        MovementDirection::from_delta(delta),
        delta.abs(),
        previous,
        new_quantity,
        reason.unwrap_or(REASON_ADJUSTMENT),
        None,
        notes,
    )
    .await?;

    tx.commit().await?;
    Ok((previous, new_quantity))
}

// ═══════════════════════════════════════════════════════════════════════
// CLI commands
// ═══════════════════════════════════════════════════════════════════════

/// `intake products`: catalog listing with stock and derived status.
pub async fn run_products(
    config: &crate::config::Config,
    query: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let status_filter = match status.as_deref() {
        Some(s) => Some(
            StockStatus::parse(s)
                .ok_or_else(|| anyhow::anyhow!("unknown stock status: '{}'", s))?,
        ),
        None => None,
    };

    let pool = crate::db::connect(config).await?;
    let products = list_products(&pool, query.as_deref(), status_filter).await?;

    println!(
        "{:<16} {:<40} {:<14} {:>8} {:>6}  STATUS",
        "IDENTIFIER", "NAME", "BRAND", "QTY", "MIN"
    );
    for p in &products {
        println!(
            "{:<16} {:<40} {:<14} {:>8} {:>6}  {}",
            p.identifier,
            truncate_display(&p.display_name, 40),
            p.brand.as_deref().unwrap_or("-"),
            p.quantity,
            p.min_threshold,
            p.status.as_str()
        );
    }
    println!("{} products", products.len());

    pool.close().await;
    Ok(())
}

/// `intake movements <identifier>`: ledger trail for one product.
pub async fn run_movements(config: &crate::config::Config, identifier: &str) -> Result<()> {
    let pool = crate::db::connect(config).await?;
    let movements = list_movements(&pool, identifier).await?;

    println!(
        "{:<8} {:>8} {:>8} {:>8}  {:<18} {:<10} REF",
        "DIR", "MAG", "PREV", "NEW", "REASON", "AT"
    );
    for m in &movements {
        println!(
            "{:<8} {:>8} {:>8} {:>8}  {:<18} {:<10} {}",
            m.direction,
            m.magnitude,
            m.previous_quantity,
            m.new_quantity,
            m.reason,
            m.recorded_at,
            m.document_ref.as_deref().unwrap_or("-")
        );
    }
    println!("{} movements", movements.len());

    pool.close().await;
    Ok(())
}

/// `intake adjust <identifier>`: manual stock correction.
pub async fn run_adjust(
    config: &crate::config::Config,
    identifier: &str,
    set: Option<i64>,
    delta: Option<i64>,
    reason: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let target = match (set, delta) {
        (Some(q), None) => AdjustTarget::Set(q),
        (None, Some(d)) => AdjustTarget::Delta(d),
        _ => bail!("exactly one of --set or --delta is required"),
    };

    let pool = crate::db::connect(config).await?;
    let (previous, new_quantity) =
        adjust_stock(&pool, identifier, target, reason.as_deref(), notes.as_deref()).await?;

    println!("adjust {}", identifier);
    println!("  previous: {}", previous);
    println!("  new: {}", new_quantity);
    println!("  change: {}", new_quantity - previous);
    println!("ok");

    pool.close().await;
    Ok(())
}

fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
