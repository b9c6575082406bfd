//! Document lifecycle tracking.
//!
//! Owns every write to the `documents` table. The state machine is
//! `PENDING → PROCESSING → COMPLETED | FAILED`; both terminal states are
//! final for a run, and a new run starts only through an explicit reset
//! that increments `run_count`.
//!
//! The claim is a guarded UPDATE checked by rows-affected, so two workers
//! can never both claim the same document.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use crate::models::{
    AggregatedLineItem, Document, DocumentStatus, HeaderInfo, ReconciliationSummary,
};
use crate::normalize::ContentKind;

/// Register a file as a PENDING document. The bytes stay on disk and are
/// re-read at processing time; the stored hash pins what was submitted.
pub async fn submit_document(
    pool: &SqlitePool,
    path: &Path,
    vendor_tag: &str,
    kind: ContentKind,
) -> Result<Document> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document file: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    let id = Uuid::new_v4().to_string();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    sqlx::query(
        r#"
        INSERT INTO documents
            (id, file_name, source_path, content_kind, vendor_tag, size_bytes,
             content_hash, status, run_count, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING', 0, ?)
        "#,
    )
    .bind(&id)
    .bind(&file_name)
    .bind(path.display().to_string())
    .bind(kind.as_str())
    .bind(vendor_tag)
    .bind(bytes.len() as i64)
    .bind(&content_hash)
    .bind(chrono::Utc::now().timestamp())
    .execute(pool)
    .await?;

    get_document(pool, &id).await
}

/// Claim a PENDING document for processing. Single-shot: the guarded
/// UPDATE means exactly one caller wins; everyone else gets an error
/// naming the document's actual state.
pub async fn claim_for_processing(pool: &SqlitePool, id: &str) -> Result<Document> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = 'PROCESSING', run_count = run_count + 1, error_message = NULL
        WHERE id = ? AND status = 'PENDING'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        match fetch_document(pool, id).await? {
            None => bail!("document not found: {}", id),
            Some(doc) => bail!(
                "document {} is {}; use --again to start a new run",
                id,
                doc.status.as_str()
            ),
        }
    }

    get_document(pool, id).await
}

/// Reset a terminal document back to PENDING for a fresh run, clearing
/// the previous run's outputs. A document still PROCESSING cannot be
/// reset.
pub async fn reset_for_rerun(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = 'PENDING', header_json = NULL, line_items_json = NULL,
            summary_json = NULL, error_message = NULL, processed_at = NULL
        WHERE id = ? AND status IN ('COMPLETED', 'FAILED')
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        match fetch_document(pool, id).await? {
            None => bail!("document not found: {}", id),
            Some(doc) if doc.status == DocumentStatus::Pending => {}
            Some(doc) => bail!("document {} is {}", id, doc.status.as_str()),
        }
    }
    Ok(())
}

/// Persist a successful run: header info, the aggregated item list, and
/// the reconciliation summary.
pub async fn mark_completed(
    pool: &SqlitePool,
    id: &str,
    header_info: &HeaderInfo,
    items: &[AggregatedLineItem],
    summary: &ReconciliationSummary,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = 'COMPLETED', header_json = ?, line_items_json = ?,
            summary_json = ?, error_message = NULL, processed_at = ?
        WHERE id = ? AND status = 'PROCESSING'
        "#,
    )
    .bind(serde_json::to_string(header_info)?)
    .bind(serde_json::to_string(items)?)
    .bind(serde_json::to_string(summary)?)
    .bind(chrono::Utc::now().timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("document {} is not PROCESSING; refusing to complete", id);
    }
    Ok(())
}

/// Persist a failed run. Only the cause is stored; catalog mutations made
/// by already-committed items stay committed.
pub async fn mark_failed(pool: &SqlitePool, id: &str, cause: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = 'FAILED', error_message = ?, processed_at = ?
        WHERE id = ? AND status = 'PROCESSING'
        "#,
    )
    .bind(cause)
    .bind(chrono::Utc::now().timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        bail!("document {} is not PROCESSING; refusing to fail", id);
    }
    Ok(())
}

/// The polling read model: the document row with whatever the latest run
/// persisted.
pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Document> {
    fetch_document(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("document not found: {}", id))
}

async fn fetch_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
    let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_document).transpose()
}

/// All PENDING documents in submission order.
pub async fn pending_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar(
        "SELECT id FROM documents WHERE status = 'PENDING' ORDER BY submitted_at, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// `intake status <id>`: print the polling read model for one document.
pub async fn run_status(config: &crate::config::Config, id: &str) -> Result<()> {
    let pool = crate::db::connect(config).await?;
    let doc = get_document(&pool, id).await?;

    println!("document {}", doc.id);
    println!("  file: {} ({}, {} bytes)", doc.file_name, doc.content_kind, doc.size_bytes);
    println!("  sha256: {}", doc.content_hash);
    println!("  vendor: {}", doc.vendor_tag);
    println!("  status: {}", doc.status.as_str());
    println!("  runs: {}", doc.run_count);
    println!("  submitted_at: {}", doc.submitted_at);
    if let Some(ts) = doc.processed_at {
        println!("  processed_at: {}", ts);
    }
    if !doc.status.is_terminal() {
        println!("  (run in progress; poll again for a terminal state)");
    }

    if let Some(header_json) = &doc.header_json {
        if let Ok(header) = serde_json::from_str::<HeaderInfo>(header_json) {
            for (key, value) in &header {
                println!("  header.{}: {}", key, value);
            }
        }
    }

    if let Some(items_json) = &doc.line_items_json {
        if let Ok(items) = serde_json::from_str::<Vec<AggregatedLineItem>>(items_json) {
            println!("  items: {}", items.len());
            for agg in &items {
                let qty = agg
                    .item
                    .quantity
                    .map(|q| q.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let occurrences = if agg.occurrence_count > 1 {
                    format!("  (x{})", agg.occurrence_count)
                } else {
                    String::new()
                };
                println!(
                    "    {}  {}  qty {}{}",
                    agg.item.identifier, agg.item.display_name, qty, occurrences
                );
            }
        }
    }

    if let Some(summary_json) = &doc.summary_json {
        if let Ok(summary) = serde_json::from_str::<ReconciliationSummary>(summary_json) {
            println!(
                "  summary: extracted {}  created {}  updated {}  unmatched {}  stock updated {}",
                summary.extracted,
                summary.created,
                summary.updated,
                summary.unmatched.len(),
                summary.stock_updated
            );
            for identifier in &summary.unmatched {
                println!("    unmatched: {}", identifier);
            }
            for warning in &summary.warnings {
                println!("    warning: {}", warning);
            }
            for err in &summary.errors {
                println!("    error: {} ({}): {}", err.identifier, err.display_name, err.message);
            }
        }
    }

    if let Some(cause) = &doc.error_message {
        println!("  error: {}", cause);
    }

    pool.close().await;
    Ok(())
}

fn row_to_document(row: sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status_str: String = row.get("status");
    let status = DocumentStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown document status in store: {}", status_str))?;
    Ok(Document {
        id: row.get("id"),
        file_name: row.get("file_name"),
        source_path: row.get("source_path"),
        content_kind: row.get("content_kind"),
        vendor_tag: row.get("vendor_tag"),
        size_bytes: row.get("size_bytes"),
        content_hash: row.get("content_hash"),
        status,
        run_count: row.get("run_count"),
        header_json: row.get("header_json"),
        line_items_json: row.get("line_items_json"),
        summary_json: row.get("summary_json"),
        error_message: row.get("error_message"),
        submitted_at: row.get("submitted_at"),
        processed_at: row.get("processed_at"),
    })
}
