use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create documents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            source_path TEXT NOT NULL,
            content_kind TEXT NOT NULL,
            vendor_tag TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            run_count INTEGER NOT NULL DEFAULT 0,
            header_json TEXT,
            line_items_json TEXT,
            summary_json TEXT,
            error_message TEXT,
            submitted_at INTEGER NOT NULL,
            processed_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create catalog table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_entries (
            id TEXT PRIMARY KEY,
            identifier TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            brand TEXT,
            category TEXT,
            description TEXT,
            sell_price REAL,
            cost_price REAL,
            min_threshold INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One current-quantity row per catalog entry (single aggregate location)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_levels (
            catalog_entry_id TEXT PRIMARY KEY,
            quantity INTEGER NOT NULL,
            FOREIGN KEY (catalog_entry_id) REFERENCES catalog_entries(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only movement ledger
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_movements (
            id TEXT PRIMARY KEY,
            catalog_entry_id TEXT NOT NULL,
            direction TEXT NOT NULL,
            magnitude INTEGER NOT NULL,
            previous_quantity INTEGER NOT NULL,
            new_quantity INTEGER NOT NULL,
            reason TEXT NOT NULL,
            document_ref TEXT,
            notes TEXT,
            recorded_at INTEGER NOT NULL,
            FOREIGN KEY (catalog_entry_id) REFERENCES catalog_entries(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_submitted_at ON documents(submitted_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_movements_entry ON stock_movements(catalog_entry_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_movements_recorded_at ON stock_movements(recorded_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
