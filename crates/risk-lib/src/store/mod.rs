//! Model store: loads, decodes and caches classifier artifacts
//!
//! Absence is a normal answer (`Ok(None)`) and is never cached, so an
//! artifact that appears later is picked up by the next request. A blob
//! that exists but cannot be read or decoded is a `LoadError`.

mod backend;
mod watch;

pub use backend::{ArtifactBackend, FsBackend, MemoryBackend};
pub use watch::ArtifactWatcher;

use crate::error::LoadError;
use crate::observability::{RiskMetrics, StructuredLogger};
use crate::predictor::{self, Classifier};
use crate::resolver::ModelKey;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Shared, immutable handle to a loaded classifier
pub type PredictorHandle = Arc<dyn Classifier>;

/// Source of classifiers for the dispatcher
pub trait ModelStore: Send + Sync {
    /// Load the classifier stored under `key`, `Ok(None)` when absent
    fn try_load(&self, key: &ModelKey) -> Result<Option<PredictorHandle>, LoadError>;
}

struct CachedModel {
    handle: PredictorHandle,
    checksum: String,
    loaded_at: i64,
}

/// Information about a cached artifact
#[derive(Debug, Clone, serde::Serialize)]
pub struct CachedModelInfo {
    pub name: String,
    pub backend: &'static str,
    pub checksum: String,
    pub loaded_at: i64,
}

/// Caching model store over an artifact backend
pub struct ArtifactStore {
    backend: Arc<dyn ArtifactBackend>,
    cache: DashMap<String, CachedModel>,
    metrics: RiskMetrics,
    logger: StructuredLogger,
}

impl ArtifactStore {
    pub fn new(backend: Arc<dyn ArtifactBackend>) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            metrics: RiskMetrics::new(),
            logger: StructuredLogger::new("local"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn backend(&self) -> &Arc<dyn ArtifactBackend> {
        &self.backend
    }

    /// Number of decoded artifacts held in memory
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Snapshot of the cache, sorted by artifact name
    pub fn cached(&self) -> Vec<CachedModelInfo> {
        let mut models: Vec<_> = self
            .cache
            .iter()
            .map(|entry| CachedModelInfo {
                name: entry.key().clone(),
                backend: entry.handle.backend(),
                checksum: entry.checksum.clone(),
                loaded_at: entry.loaded_at,
            })
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    /// Drop one cached artifact; returns whether it was cached
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self.cache.remove(name).is_some();
        if removed {
            debug!(artifact = %name, "Invalidated cached model");
            self.metrics.set_cached_models(self.cache.len() as i64);
        }
        removed
    }

    /// Drop every cached artifact
    pub fn clear(&self) {
        self.cache.clear();
        self.metrics.set_cached_models(0);
    }

    /// Re-read every cached artifact and drop those whose bytes changed or
    /// disappeared. Returns the number of entries dropped.
    pub fn refresh(&self) -> usize {
        let snapshot: Vec<(String, String)> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.checksum.clone()))
            .collect();

        let mut invalidated = 0;
        for (name, checksum) in snapshot {
            let stale = match self.backend.read(&name) {
                Ok(Some(bytes)) => compute_checksum(&bytes) != checksum,
                Ok(None) => true,
                Err(e) => {
                    warn!(artifact = %name, error = %e, "Failed to re-read cached artifact");
                    true
                }
            };
            if stale && self.cache.remove(&name).is_some() {
                invalidated += 1;
            }
        }

        self.metrics.set_cached_models(self.cache.len() as i64);
        self.logger.log_cache_refresh(invalidated, self.cache.len());
        invalidated
    }
}

impl ModelStore for ArtifactStore {
    fn try_load(&self, key: &ModelKey) -> Result<Option<PredictorHandle>, LoadError> {
        if let Some(entry) = self.cache.get(key.name()) {
            return Ok(Some(entry.handle.clone()));
        }

        let start = Instant::now();
        let bytes = match self.backend.read(key.name()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(source) => {
                self.metrics.inc_model_load_failures();
                return Err(LoadError::Backend {
                    key: key.name().to_string(),
                    source,
                });
            }
        };

        let checksum = compute_checksum(&bytes);
        let handle = predictor::decode(key.family(), key.format(), &bytes).map_err(|reason| {
            self.metrics.inc_model_load_failures();
            LoadError::Decode {
                key: key.name().to_string(),
                reason,
            }
        })?;

        // A concurrent load of the same key may have won; everyone shares its handle.
        let handle = self
            .cache
            .entry(key.name().to_string())
            .or_insert_with(|| CachedModel {
                handle,
                checksum: checksum.clone(),
                loaded_at: chrono::Utc::now().timestamp(),
            })
            .handle
            .clone();

        let elapsed = start.elapsed();
        self.metrics.observe_model_load_latency(elapsed.as_secs_f64());
        self.metrics.set_cached_models(self.cache.len() as i64);
        self.logger
            .log_model_loaded(key.name(), handle.backend(), &checksum, elapsed.as_millis());

        Ok(Some(handle))
    }
}

/// Compute SHA256 checksum of artifact bytes
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
