// src/context.rs
use crate::ai::{LlmProvider, OpenAiProvider};
use crate::config::Config;
use crate::discography::DiscographyStore;
use crate::replacements::ReplacementStore;
use crate::sources::CatalogClients;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Long-lived services shared by every command
pub struct AppContext {
    pub config: Config,
    pub db: sled::Db,
    pub discographies: DiscographyStore,
    pub replacements: ReplacementStore,
    pub catalogs: CatalogClients,
    /// Present only when an API key is configured
    pub llm: Option<Arc<dyn LlmProvider>>,
}

impl AppContext {
    pub fn init(config: Config) -> Result<Self> {
        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        log::debug!("Opened database at {}", db_path.display());

        Self::with_db(config, db)
    }

    pub fn with_db(config: Config, db: sled::Db) -> Result<Self> {
        let llm: Option<Arc<dyn LlmProvider>> = match config.api_key() {
            Some(key) => Some(Arc::new(OpenAiProvider::new(
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                key,
                Duration::from_secs(config.http_timeout_secs.max(120)),
            )?)),
            None => None,
        };

        Ok(Self {
            discographies: DiscographyStore::new(&db)?,
            replacements: ReplacementStore::new(&db)?,
            catalogs: CatalogClients::new(&config)?,
            llm,
            config,
            db,
        })
    }

    pub fn llm(&self) -> Result<&dyn LlmProvider> {
        self.llm
            .as_deref()
            .context("No OpenAI API key configured (run `vgm-tagger config set-key` or set OPENAI_API_KEY)")
    }

    /// Flush pending writes to disk
    pub fn close(self) -> Result<()> {
        let bytes = self.db.flush()?;
        log::debug!("Flushed {} bytes", bytes);
        Ok(())
    }
}
