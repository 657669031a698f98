use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crop_advisor_core::forest::ForestParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub model: ModelConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Directory holding `model.json` and `label_encoder.json`.
    pub artifact_dir: PathBuf,
    /// Labelled CSV used when the artifacts are missing or `crop train` runs.
    pub corpus_path: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
}

fn default_seed() -> u64 {
    42
}
fn default_n_trees() -> usize {
    100
}
fn default_max_depth() -> usize {
    10
}
fn default_min_samples_split() -> usize {
    5
}
fn default_min_samples_leaf() -> usize {
    2
}
fn default_test_fraction() -> f64 {
    0.2
}

impl ModelConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let model = &config.model;
    if model.n_trees == 0 {
        anyhow::bail!("model.n_trees must be > 0");
    }
    if model.max_depth == 0 {
        anyhow::bail!("model.max_depth must be > 0");
    }
    if model.min_samples_split < 2 {
        anyhow::bail!("model.min_samples_split must be >= 2");
    }
    if model.min_samples_leaf == 0 {
        anyhow::bail!("model.min_samples_leaf must be >= 1");
    }
    if !(model.test_fraction > 0.0 && model.test_fraction < 1.0) {
        anyhow::bail!("model.test_fraction must be in (0.0, 1.0)");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    match config.logging.level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
        other => anyhow::bail!(
            "Unknown logging level: '{}'. Must be trace, debug, info, warn, error, or off.",
            other
        ),
    }

    Ok(())
}
