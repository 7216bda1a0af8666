use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Flat configuration mapping
///
/// Values are immutable once built. A tenant configuration is produced with
/// [`Settings::overlay`], which yields a new mapping and leaves the base untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Raw value for `key`
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Deserialize the value stored under `key`
    ///
    /// Returns `None` when the key is missing or has a different shape than `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a new mapping where every top-level key of `overrides` replaces the
    /// base entry. Nested tables are replaced wholesale, not merged.
    pub fn overlay(&self, overrides: Map<String, Value>) -> Self {
        let mut values = self.values.clone();
        for (key, value) in overrides {
            values.insert(key, value);
        }
        Self { values }
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// Tenant configuration as last loaded from its source
#[derive(Debug, Clone)]
pub struct TenantSettingsSnapshot {
    pub schema_name: String,
    pub settings: Arc<Settings>,
    /// Modification time of the source the settings were loaded from.
    /// `None` until the first successful load.
    pub last_loaded_at: Option<DateTime<Utc>>,
    /// When the source was read, used to tell whether an edit carrying the
    /// same modification time could have been missed
    pub read_at: Option<DateTime<Utc>>,
}

impl TenantSettingsSnapshot {
    /// Fresh snapshot that exposes the base configuration unchanged
    pub fn from_base(schema_name: impl Into<String>, base: Arc<Settings>) -> Self {
        Self {
            schema_name: schema_name.into(),
            settings: base,
            last_loaded_at: None,
            read_at: None,
        }
    }

    pub fn loaded(
        schema_name: impl Into<String>,
        settings: Settings,
        last_loaded_at: DateTime<Utc>,
        read_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            settings: Arc::new(settings),
            last_loaded_at: Some(last_loaded_at),
            read_at: Some(read_at),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.last_loaded_at.is_some()
    }
}
