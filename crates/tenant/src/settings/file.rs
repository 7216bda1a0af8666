use super::loader::{LoadOutcome, SettingsLoader};
use crate::error::SettingsError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tenancy_models::{Settings, Tenant, TenantSettingsSnapshot};

/// Placeholder substituted with the tenant's schema name in a path template
pub const SCHEMA_NAME_PLACEHOLDER: &str = "{schema_name}";

/// Coarsest modification-time resolution tolerated (FAT records 2s steps)
const MTIME_GRANULARITY_SECS: i64 = 2;

/// Loads per-tenant overrides from a settings file
///
/// The file at `path_template` (with `{schema_name}` substituted) is parsed
/// according to its extension (`toml`, `yaml`/`yml`, `json`) and its top-level
/// keys are overlaid on the base configuration.
///
/// Snapshots are keyed by the file's modification time. A file whose time is
/// newer than the recorded one is read again. A file with the same time is read
/// again only while the previous read happened within one timestamp tick of
/// it, since an edit in that tick would carry the same time.
pub struct FileSettingsLoader {
    path_template: String,
    base: Arc<Settings>,
}

impl FileSettingsLoader {
    pub fn new(path_template: impl Into<String>, base: Arc<Settings>) -> Self {
        Self {
            path_template: path_template.into(),
            base,
        }
    }

    pub fn path_for(&self, schema_name: &str) -> PathBuf {
        PathBuf::from(self.path_template.replace(SCHEMA_NAME_PLACEHOLDER, schema_name))
    }
}

/// Whether a source modified at `modified` must be read again
fn is_stale(
    snapshot: &TenantSettingsSnapshot,
    modified: DateTime<Utc>,
    last_loaded_at: Option<DateTime<Utc>>,
) -> bool {
    let Some(last) = last_loaded_at else {
        return true;
    };
    if modified != last {
        return modified > last;
    }
    match snapshot.read_at {
        Some(read_at) => read_at < last + Duration::seconds(MTIME_GRANULARITY_SECS),
        None => true,
    }
}

#[async_trait]
impl SettingsLoader for FileSettingsLoader {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(
        &self,
        tenant: &Tenant,
        snapshot: Arc<TenantSettingsSnapshot>,
        last_loaded_at: Option<DateTime<Utc>>,
    ) -> Result<LoadOutcome, SettingsError> {
        let path = self.path_for(&tenant.schema_name);
        let read_at = Utc::now();

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| SettingsError::Unreadable {
                path: path.clone(),
                source,
            })?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|source| SettingsError::Unreadable {
                path: path.clone(),
                source,
            })?
            .into();

        if !is_stale(&snapshot, modified, last_loaded_at) {
            return Ok((snapshot, last_loaded_at));
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SettingsError::Unreadable {
                path: path.clone(),
                source,
            })?;
        let settings = self.base.overlay(parse_settings(&path, &contents)?);

        tracing::debug!(
            "Loaded {} settings for tenant {} from {}",
            settings.len(),
            tenant.schema_name,
            path.display()
        );

        let snapshot =
            TenantSettingsSnapshot::loaded(&tenant.schema_name, settings, modified, read_at);
        Ok((Arc::new(snapshot), Some(modified)))
    }
}

/// Parse a settings document into a flat mapping, keeping keys exactly as written
///
/// The format is chosen by the extension of `path`. An empty document yields an
/// empty mapping.
pub fn parse_settings(path: &Path, contents: &str) -> Result<Map<String, Value>, SettingsError> {
    let malformed = |message: String| SettingsError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let extension = path.extension().and_then(|ext| ext.to_str());
    if !matches!(extension, Some("toml" | "yaml" | "yml" | "json")) {
        return Err(malformed(format!("unsupported settings format: {:?}", extension)));
    }
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }

    match extension {
        Some("toml") => toml::from_str(contents).map_err(|e| malformed(e.to_string())),
        Some("json") => serde_json::from_str(contents).map_err(|e| malformed(e.to_string())),
        _ => serde_yaml::from_str(contents).map_err(|e| malformed(e.to_string())),
    }
}
