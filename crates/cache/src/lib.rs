pub mod type_cache;

pub use type_cache::{ModelTypeCache, ModelTypeCacheConfig, ModelTypeId, TypeCache};
