//! Extraction routing: normalize, pick a strategy, invoke it.
//!
//! The router owns two cross-cutting rules: free text is truncated to the
//! configured maximum before it reaches the delegated capability (with the
//! truncation flagged in the header info so downstream readers know the
//! extraction may be incomplete), and a failing strategy fails the run:
//! there is no silent fallback from a delegated strategy to a
//! deterministic one or back.

use anyhow::{Context, Result};

use crate::extractor::LineItemExtractor;
use crate::models::ExtractionResult;
use crate::normalize::{normalize, ContentKind, NormalizedContent};
use crate::strategy::StrategyRegistry;

/// Run extraction for one document's bytes.
pub async fn extract_document(
    bytes: &[u8],
    kind: ContentKind,
    vendor_tag: &str,
    max_document_chars: usize,
    registry: &StrategyRegistry,
    extractor: &dyn LineItemExtractor,
) -> Result<ExtractionResult> {
    let mut content = normalize(bytes, kind).context("normalization failed")?;

    let mut truncated = false;
    if let NormalizedContent::Text(text) = &content {
        if let Some(cut) = truncate_chars(text, max_document_chars) {
            content = NormalizedContent::Text(cut);
            truncated = true;
        }
    }

    let strategy = registry.select(vendor_tag, content.shape());
    let mut result = strategy
        .extract(&content, extractor)
        .await
        .with_context(|| format!("extraction failed (strategy '{}')", strategy.vendor()))?;

    result
        .header_info
        .insert("vendor_strategy".to_string(), strategy.vendor().to_string());
    if truncated {
        result
            .header_info
            .insert("truncated".to_string(), "true".to_string());
    }

    Ok(result)
}

/// The first `max_chars` characters when the text is longer, `None` when
/// it already fits. Cuts on a char boundary; the tail is discarded.
fn truncate_chars(text: &str, max_chars: usize) -> Option<String> {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Some(text[..byte_idx].to_string()),
        None => None,
    }
}
