use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    /// Vendor tag used when `submit` is not given an explicit `--vendor`.
    #[serde(default = "default_vendor")]
    pub default_vendor: String,
    /// Maximum characters of free text handed to the delegated extractor;
    /// anything beyond is discarded and the truncation flagged.
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
    /// Globs applied when a whole directory is submitted.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            default_vendor: default_vendor(),
            max_document_chars: default_max_document_chars(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_vendor() -> String {
    "generic".to_string()
}

fn default_max_document_chars() -> usize {
    50_000
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.xlsx".to_string(),
        "**/*.pdf".to_string(),
        "**/*.docx".to_string(),
        "**/*.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    /// When set, unknown identifiers are reported as unmatched instead of
    /// creating new catalog entries.
    #[serde(default)]
    pub match_existing_only: bool,
    /// When set (the default), incoming quantities add to on-hand stock;
    /// otherwise they replace it.
    #[serde(default = "default_add_to_stock")]
    pub add_to_stock: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            match_existing_only: false,
            add_to_stock: default_add_to_stock(),
        }
    }
}

fn default_add_to_stock() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: 60,
            max_retries: 5,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    5
}

impl ExtractorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.intake.max_document_chars == 0 {
        anyhow::bail!("intake.max_document_chars must be > 0");
    }

    if config.intake.default_vendor.trim().is_empty() {
        anyhow::bail!("intake.default_vendor must not be empty");
    }

    if config.extractor.is_enabled() && config.extractor.model.is_none() {
        anyhow::bail!(
            "extractor.model must be specified when provider is '{}'",
            config.extractor.provider
        );
    }

    match config.extractor.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown extractor provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("intake.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "[db]\npath = \"./data/intake.sqlite\"\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.intake.default_vendor, "generic");
        assert_eq!(cfg.intake.max_document_chars, 50_000);
        assert!(!cfg.processing.match_existing_only);
        assert!(cfg.processing.add_to_stock);
        assert_eq!(cfg.extractor.provider, "disabled");
        assert!(!cfg.extractor.is_enabled());
    }

    #[test]
    fn openai_provider_requires_model() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "[db]\npath = \"./x.sqlite\"\n\n[extractor]\nprovider = \"openai\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "[db]\npath = \"./x.sqlite\"\n\n[extractor]\nprovider = \"azure\"\nmodel = \"m\"\n",
        );
        assert!(load_config(&path).is_err());
    }
}
