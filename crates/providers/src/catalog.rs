//! Model catalog cache with a 24 hour time-to-live.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::catalog::{name_key, ModelCatalogEntry};
use shared::error::ChatError;
use tracing::{info, warn};

use crate::openrouter::OpenRouterClient;

pub const CATALOG_TTL_MS: i64 = 86_400_000;

/// Where fresh catalog data comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_models(&self) -> Result<Vec<ModelCatalogEntry>, ChatError>;
}

#[async_trait]
impl CatalogSource for OpenRouterClient {
    async fn fetch_models(&self) -> Result<Vec<ModelCatalogEntry>, ChatError> {
        self.list_models().await
    }
}

#[derive(Debug, Clone)]
struct Cached {
    models: Vec<ModelCatalogEntry>,
    fetched_at_ms: i64,
}

pub struct ModelCatalog {
    cache: Mutex<Option<Cached>>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(None),
        }
    }

    /// Cached models if younger than the TTL, otherwise a fresh fetch.
    /// Never fails: a failed fetch falls back to the last list, or nothing.
    pub async fn models(&self, source: &dyn CatalogSource) -> Vec<ModelCatalogEntry> {
        self.models_at(source, Utc::now().timestamp_millis()).await
    }

    pub async fn models_at(&self, source: &dyn CatalogSource, now_ms: i64) -> Vec<ModelCatalogEntry> {
        if let Some(fresh) = self.fresh(now_ms) {
            return fresh;
        }

        match source.fetch_models().await {
            Ok(mut models) => {
                models.sort_by_cached_key(name_key);
                info!("model catalog refreshed: {} models", models.len());
                *self.cache.lock() = Some(Cached {
                    models: models.clone(),
                    fetched_at_ms: now_ms,
                });
                models
            }
            Err(e) => {
                warn!("model catalog fetch failed: {}", e);
                self.cached().unwrap_or_default()
            }
        }
    }

    /// Whatever is cached, regardless of age.
    pub fn cached(&self) -> Option<Vec<ModelCatalogEntry>> {
        self.cache.lock().as_ref().map(|c| c.models.clone())
    }

    /// Forget the timestamp so the next call refetches.
    pub fn invalidate(&self) {
        if let Some(cached) = self.cache.lock().as_mut() {
            cached.fetched_at_ms = i64::MIN;
        }
    }

    fn fresh(&self, now_ms: i64) -> Option<Vec<ModelCatalogEntry>> {
        let guard = self.cache.lock();
        let cached = guard.as_ref()?;
        let age = now_ms.saturating_sub(cached.fetched_at_ms);
        (age < CATALOG_TTL_MS).then(|| cached.models.clone())
    }
}
