use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::index::Metric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    pub embedding_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.1
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    pub documents: PathBuf,
    pub index: PathBuf,
    pub metadata: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub metric: Metric,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
            top_k: 4,
            metric: Metric::default(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    150
}
fn default_top_k() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    /// Parsed and kept for forward compatibility; no behavior is attached yet.
    #[serde(default = "default_conservative_mode")]
    #[allow(dead_code)]
    pub conservative_mode: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            conservative_mode: true,
        }
    }
}

fn default_conservative_mode() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found at {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse TOML")?;

    // Validate chunking
    if config.rag.chunk_size == 0 {
        anyhow::bail!("rag.chunk_size must be > 0");
    }

    if config.rag.chunk_overlap >= config.rag.chunk_size {
        anyhow::bail!(
            "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
            config.rag.chunk_overlap,
            config.rag.chunk_size
        );
    }

    // Validate retrieval
    if config.rag.top_k < 1 {
        anyhow::bail!("rag.top_k must be >= 1");
    }

    // Validate API client settings
    if config.openai.model.trim().is_empty() {
        anyhow::bail!("openai.model must not be empty");
    }

    if config.openai.embedding_model.trim().is_empty() {
        anyhow::bail!("openai.embedding_model must not be empty");
    }

    if config.openai.batch_size < 1 {
        anyhow::bail!("openai.batch_size must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        anyhow::bail!("openai.temperature must be in [0.0, 2.0]");
    }

    Ok(config)
}
