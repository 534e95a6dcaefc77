// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "vgm-tagger";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub max_workers: usize,
    pub backup_tags: bool,
    pub database_path: Option<String>,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
    pub musicbrainz_concurrency: usize,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            max_workers: num_cpus::get(),
            backup_tags: true,
            database_path: None,
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
            cache_ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            musicbrainz_concurrency: 4,
            user_agent: format!(
                "vgm-tagger/{} ( https://github.com/vgm-tagger/vgm-tagger )",
                env!("CARGO_PKG_VERSION")
            ),
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load the config file (defaults when it does not exist) and apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        Ok(())
    }

    /// `OPENAI_API_KEY` wins over the stored key
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.openai_api_key = Some(key.trim().to_string());
            }
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => {
                let data_dir = dirs::data_dir().context("Could not find data directory")?;
                Ok(data_dir.join(APP_DIR).join("db"))
            }
        }
    }

    /// The API key, if one is configured and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
