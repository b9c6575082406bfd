//! Document registration.
//!
//! Accepts individual files or whole directories (vendors drop a batch of
//! POs in a folder); directories are walked and filtered through the
//! configured include globs. Collection is sorted so batch submission
//! order is deterministic.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;
use crate::db;
use crate::normalize::ContentKind;
use crate::status;

pub async fn run_submit(
    config: &Config,
    paths: &[PathBuf],
    vendor: Option<String>,
    kind: Option<String>,
) -> Result<()> {
    let vendor_tag = vendor.unwrap_or_else(|| config.intake.default_vendor.clone());
    let declared_kind = match kind.as_deref() {
        Some(k) => Some(
            ContentKind::parse(k)
                .ok_or_else(|| anyhow::anyhow!("unknown content kind: '{}'", k))?,
        ),
        None => None,
    };

    let files = collect_files(paths, &config.intake.include_globs)?;
    if files.is_empty() {
        bail!("no files to submit");
    }

    let pool = db::connect(config).await?;
    for file in &files {
        let file_kind = declared_kind.unwrap_or_else(|| ContentKind::infer_from_path(file));
        let doc = status::submit_document(&pool, file, &vendor_tag, file_kind).await?;
        println!(
            "submitted {}  {}  kind={} vendor={}",
            doc.id,
            doc.file_name,
            file_kind.as_str(),
            vendor_tag
        );
    }
    println!("ok ({} documents)", files.len());

    pool.close().await;
    Ok(())
}

/// Expand the given paths: files pass through as-is, directories are
/// walked with the include globs applied to paths relative to the
/// directory root.
fn collect_files(paths: &[PathBuf], include_globs: &[String]) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(include_globs)?;
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("no such file or directory: {}", path.display());
        }

        for entry in WalkDir::new(path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            if include_set.is_match(relative.to_string_lossy().as_ref()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    // Sort for deterministic ordering
    files.sort();
    files.dedup();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
