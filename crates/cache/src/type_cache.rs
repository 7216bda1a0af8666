use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier the persistence layer assigns to a model type
///
/// Identifiers are allocated per schema, so the same model may carry a
/// different id in the public schema than in a tenant schema.
pub type ModelTypeId = i64;

/// Process-wide cache that must not survive a schema switch
pub trait TypeCache: Send + Sync {
    /// Drop every cached entry
    fn clear(&self);
}

#[derive(Debug, Clone)]
pub struct ModelTypeCacheConfig {
    pub max_capacity: u64,
}

impl Default for ModelTypeCacheConfig {
    fn default() -> Self {
        Self { max_capacity: 10_000 }
    }
}

/// Model identity -> type id cache shared by every request in the process
///
/// Entries are keyed by schema as well as model, so concurrent requests bound
/// to different schemas never read each other's ids even between clears.
pub struct ModelTypeCache {
    entries: Cache<(String, String), ModelTypeId>,
    clears: AtomicU64,
}

impl ModelTypeCache {
    pub fn new(config: ModelTypeCacheConfig) -> Self {
        Self {
            entries: Cache::builder().max_capacity(config.max_capacity).build(),
            clears: AtomicU64::new(0),
        }
    }

    pub fn get(&self, schema_name: &str, model: &str) -> Option<ModelTypeId> {
        self.entries.get(&(schema_name.to_string(), model.to_string()))
    }

    pub fn insert(&self, schema_name: &str, model: impl Into<String>, id: ModelTypeId) {
        self.entries.insert((schema_name.to_string(), model.into()), id);
    }

    /// Return the cached id for `model` in `schema_name`, computing and caching it on a miss
    pub fn get_or_insert_with(
        &self,
        schema_name: &str,
        model: impl Into<String>,
        init: impl FnOnce() -> ModelTypeId,
    ) -> ModelTypeId {
        self.entries.get_with((schema_name.to_string(), model.into()), init)
    }

    /// Number of times the cache has been cleared since start-up
    pub fn clear_count(&self) -> u64 {
        self.clears.load(Ordering::Relaxed)
    }
}

impl Default for ModelTypeCache {
    fn default() -> Self {
        Self::new(ModelTypeCacheConfig::default())
    }
}

impl TypeCache for ModelTypeCache {
    fn clear(&self) {
        self.entries.invalidate_all();
        self.clears.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Model type cache cleared");
    }
}
