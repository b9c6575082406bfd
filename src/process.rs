//! Processing orchestration.
//!
//! Coordinates the full pipeline for one document: claim → normalize +
//! extract (router) → aggregate → reconcile → persist terminal state.
//! Any pipeline failure marks the document FAILED with the cause recorded
//! verbatim; per-item reconciliation errors do not fail the run.
//!
//! `process --pending` works through every PENDING document in submission
//! order, continuing past documents that fail.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::aggregate;
use crate::config::Config;
use crate::db;
use crate::extractor::{create_extractor, LineItemExtractor};
use crate::models::{AggregatedLineItem, HeaderInfo, ReconciliationSummary};
use crate::normalize::ContentKind;
use crate::progress::{ProcessProgressEvent, ProgressMode};
use crate::reconcile::{self, ReconcileOptions};
use crate::router;
use crate::status;
use crate::strategy::StrategyRegistry;

/// Per-run reconciliation options: config defaults with CLI overrides
/// applied on top.
pub fn reconcile_options(
    config: &Config,
    match_existing_only: bool,
    replace_stock: bool,
) -> ReconcileOptions {
    ReconcileOptions {
        match_existing_only: config.processing.match_existing_only || match_existing_only,
        add_to_stock: config.processing.add_to_stock && !replace_stock,
    }
}

/// Process one document by id.
pub async fn run_process(
    config: &Config,
    id: &str,
    again: bool,
    match_existing_only: bool,
    replace_stock: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let registry = StrategyRegistry::with_builtins();
    let extractor = create_extractor(&config.extractor)?;
    let opts = reconcile_options(config, match_existing_only, replace_stock);

    if again {
        status::reset_for_rerun(&pool, id).await?;
    }

    let outcome =
        process_document(&pool, config, &registry, extractor.as_ref(), id, &opts).await;

    pool.close().await;
    outcome.map(|_| ())
}

/// Process every PENDING document, continuing past per-document failures.
pub async fn run_process_pending(
    config: &Config,
    match_existing_only: bool,
    replace_stock: bool,
    progress: ProgressMode,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let registry = StrategyRegistry::with_builtins();
    let extractor = create_extractor(&config.extractor)?;
    let opts = reconcile_options(config, match_existing_only, replace_stock);
    let reporter = progress.reporter();

    let ids = status::pending_ids(&pool).await?;
    let total = ids.len() as u64;
    let mut completed = 0u64;
    let mut failed = 0u64;

    for (i, id) in ids.iter().enumerate() {
        reporter.report(ProcessProgressEvent::Started {
            document: id.clone(),
            n: i as u64 + 1,
            total,
        });
        let outcome =
            process_document(&pool, config, &registry, extractor.as_ref(), id, &opts).await;
        let outcome_str = match outcome {
            Ok(_) => {
                completed += 1;
                "completed"
            }
            Err(_) => {
                failed += 1;
                "failed"
            }
        };
        reporter.report(ProcessProgressEvent::Finished {
            document: id.clone(),
            outcome: outcome_str.to_string(),
        });
    }

    println!("process --pending");
    println!("  pending: {}", total);
    println!("  completed: {}", completed);
    println!("  failed: {}", failed);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Claim, run the pipeline, and persist the terminal state for one
/// document. Returns the summary on success; on failure the document is
/// marked FAILED and the error is returned.
pub async fn process_document(
    pool: &SqlitePool,
    config: &Config,
    registry: &StrategyRegistry,
    extractor: &dyn LineItemExtractor,
    id: &str,
    opts: &ReconcileOptions,
) -> Result<ReconciliationSummary> {
    let doc = status::claim_for_processing(pool, id).await?;

    match run_pipeline(pool, config, registry, extractor, &doc, opts).await {
        Ok((header_info, items, summary)) => {
            status::mark_completed(pool, id, &header_info, &items, &summary).await?;
            print_summary(&doc.id, &doc.file_name, &doc.vendor_tag, &summary);
            Ok(summary)
        }
        Err(e) => {
            let cause = format!("{:#}", e);
            status::mark_failed(pool, id, &cause).await?;
            Err(e)
        }
    }
}

async fn run_pipeline(
    pool: &SqlitePool,
    config: &Config,
    registry: &StrategyRegistry,
    extractor: &dyn LineItemExtractor,
    doc: &crate::models::Document,
    opts: &ReconcileOptions,
) -> Result<(HeaderInfo, Vec<AggregatedLineItem>, ReconciliationSummary)> {
    let kind = ContentKind::parse(&doc.content_kind).ok_or_else(|| {
        anyhow::anyhow!("document has unknown content kind: {}", doc.content_kind)
    })?;

    let bytes = std::fs::read(&doc.source_path)
        .with_context(|| format!("Failed to read document file: {}", doc.source_path))?;

    let extraction = router::extract_document(
        &bytes,
        kind,
        &doc.vendor_tag,
        config.intake.max_document_chars,
        registry,
        extractor,
    )
    .await?;

    let raw_count = extraction.items.len() as u64;
    let (aggregated, warnings) = aggregate::aggregate(extraction.items);

    let mut summary = reconcile::reconcile_items(pool, &doc.id, &aggregated, opts).await;
    summary.extracted = raw_count;
    summary.warnings = warnings;

    Ok((extraction.header_info, aggregated, summary))
}

fn print_summary(id: &str, file_name: &str, vendor_tag: &str, summary: &ReconciliationSummary) {
    println!("process {}", id);
    println!("  file: {} (vendor: {})", file_name, vendor_tag);
    println!("  extracted: {} raw items", summary.extracted);
    println!(
        "  created: {}  updated: {}  unmatched: {}",
        summary.created,
        summary.updated,
        summary.unmatched.len()
    );
    println!("  stock updated: {}", summary.stock_updated);
    if !summary.warnings.is_empty() {
        println!("  warnings: {}", summary.warnings.len());
    }
    if !summary.errors.is_empty() {
        println!("  item errors: {}", summary.errors.len());
        for err in &summary.errors {
            println!("    {} ({}): {}", err.identifier, err.display_name, err.message);
        }
    }
    println!("ok");
}
