//! Delegated line-item extraction capability.
//!
//! Defines the [`LineItemExtractor`] trait and concrete implementations:
//! - **[`DisabledExtractor`]** — returns errors; used when no provider is configured.
//! - **[`OpenAiExtractor`]** — calls the OpenAI chat completions API in JSON
//!   mode with retry and backoff.
//!
//! The capability is a black box with one contract: given an instruction
//! set and document text, return header info plus structured line items
//! conforming to [`RawLineItem`], or fail. An empty item list is a valid
//! answer; an error is not "found nothing".
//!
//! The extractor instance is owned by whoever wires the pipeline together
//! and injected into the router — never held as process-global state.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ExtractorConfig;
use crate::models::{ExtractionResult, HeaderInfo, RawLineItem};

/// Trait for the delegated extraction capability.
#[async_trait]
pub trait LineItemExtractor: Send + Sync {
    /// Returns the provider identifier (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Extract header info and line items from document text, following
    /// the given instruction set.
    async fn extract(&self, instructions: &str, document_text: &str) -> Result<ExtractionResult>;
}

// ============ Disabled Extractor ============

/// A no-op extractor that always returns errors.
///
/// Used when `extractor.provider = "disabled"`. Deterministic tabular
/// strategies never touch the extractor, so spreadsheets still process.
pub struct DisabledExtractor;

#[async_trait]
impl LineItemExtractor for DisabledExtractor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn extract(&self, _instructions: &str, _document_text: &str) -> Result<ExtractionResult> {
        bail!("Delegated extraction provider is disabled")
    }
}

// ============ OpenAI Extractor ============

const SYSTEM_PROMPT: &str = "You are a data extraction assistant specialized in reading \
procurement and stock documents. Extract every product line item you can find. The product \
code is the primary identifier: extract it exactly as written, along with the exact product \
name and the quantity for that specific row. Check every table, row, and section. If the \
same code appears with different names, or the same product appears multiple times, return \
every occurrence as a separate entry. Always return valid JSON only, with no explanations \
and no markdown.";

/// Extractor using the OpenAI chat completions API in JSON mode.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiExtractor {
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiExtractor {
    /// Create a new OpenAI extractor from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config or if
    /// `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("extractor.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self {
            model,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LineItemExtractor for OpenAiExtractor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn extract(&self, instructions: &str, document_text: &str) -> Result<ExtractionResult> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(instructions, document_text) },
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        let content = json
                            .get("choices")
                            .and_then(|c| c.get(0))
                            .and_then(|c| c.get("message"))
                            .and_then(|m| m.get("content"))
                            .and_then(|c| c.as_str())
                            .ok_or_else(|| {
                                anyhow::anyhow!("Invalid completion response: missing content")
                            })?;
                        let parsed: serde_json::Value = serde_json::from_str(content)
                            .map_err(|e| anyhow::anyhow!("Extractor returned invalid JSON: {}", e))?;
                        return Ok(parse_extraction_json(&parsed));
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Extraction failed after retries")))
    }
}

/// User prompt: the vendor instruction set, the response schema, and the
/// document text.
fn build_prompt(instructions: &str, document_text: &str) -> String {
    format!(
        r#"{instructions}

Return a JSON object with this structure:
{{
  "header_info": {{
    "document_type": "string (Invoice / Purchase Order / Stock Report / ...)",
    "document_number": "string",
    "document_date": "string (as shown)",
    "vendor_name": "string",
    "buyer_name": "string",
    "shipping_address": "string",
    "payment_terms": "string",
    "total_amount": "string",
    "currency": "string"
  }},
  "items": [
    {{
      "identifier": "string (required - product code exactly as written)",
      "name": "string (required - product name exactly as written)",
      "brand": "string (optional)",
      "category": "string (optional)",
      "quantity": number (optional),
      "unit_price": number (optional),
      "total_price": number (optional),
      "description": "string (optional)"
    }}
  ]
}}

Omit header fields that are not present in the document. Return ONLY valid JSON.

Document content:
{document_text}"#
    )
}

/// Parse the capability's JSON answer into an [`ExtractionResult`],
/// dropping items without both an identifier and a name and coercing
/// loosely-typed values the way vendor documents require (quantities may
/// come back fractional, codes may come back numeric).
pub fn parse_extraction_json(json: &serde_json::Value) -> ExtractionResult {
    let mut header_info = HeaderInfo::new();
    if let Some(obj) = json.get("header_info").and_then(|h| h.as_object()) {
        for (key, value) in obj {
            if let Some(s) = scalar_to_string(value) {
                if !s.is_empty() {
                    header_info.insert(key.clone(), s);
                }
            }
        }
    }

    let mut items = Vec::new();
    if let Some(arr) = json.get("items").and_then(|i| i.as_array()) {
        for entry in arr {
            let identifier = entry
                .get("identifier")
                .and_then(scalar_to_string_ref)
                .unwrap_or_default();
            let name = entry
                .get("name")
                .and_then(scalar_to_string_ref)
                .unwrap_or_default();
            if identifier.is_empty() || name.is_empty() {
                continue;
            }
            items.push(RawLineItem {
                identifier,
                display_name: name,
                brand: entry.get("brand").and_then(scalar_to_string_ref),
                category: entry.get("category").and_then(scalar_to_string_ref),
                quantity: entry.get("quantity").and_then(value_to_quantity),
                unit_price: entry.get("unit_price").and_then(|v| v.as_f64()),
                total_price: entry.get("total_price").and_then(|v| v.as_f64()),
                description: entry.get("description").and_then(scalar_to_string_ref),
            });
        }
    }

    ExtractionResult { header_info, items }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_to_string_ref(value: &serde_json::Value) -> Option<String> {
    scalar_to_string(value).filter(|s| !s.is_empty())
}

/// Quantities may come back as "40.00" or 40.0; truncate toward zero.
fn value_to_quantity(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| {
            value
                .as_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|f| f as i64)
        })
}

/// Create the appropriate [`LineItemExtractor`] based on configuration.
pub fn create_extractor(config: &ExtractorConfig) -> Result<Box<dyn LineItemExtractor>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledExtractor)),
        "openai" => Ok(Box::new(OpenAiExtractor::new(config)?)),
        other => bail!("Unknown extractor provider: {}", other),
    }
}
