use super::active::ActiveSettings;
use super::loader::SettingsLoader;
use crate::error::SettingsError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tenancy_models::{Settings, Tenant, TenantSettingsSnapshot};

/// What to do when a tenant's settings source cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsFailurePolicy {
    /// Fail the request
    #[default]
    Fail,
    /// Serve the last successfully loaded snapshot, failing only if there is none
    LastGood,
}

struct SnapshotEntry {
    snapshot: Arc<TenantSettingsSnapshot>,
    last_loaded_at: Option<DateTime<Utc>>,
}

/// Per-tenant settings cache with staleness-checked reloading
pub struct TenantSettingsOverlay {
    base: Arc<Settings>,
    loader: Arc<dyn SettingsLoader>,
    snapshots: Mutex<HashMap<String, SnapshotEntry>>,
    active: ActiveSettings,
    failure_policy: SettingsFailurePolicy,
}

impl TenantSettingsOverlay {
    pub fn new(
        base: Arc<Settings>,
        loader: Arc<dyn SettingsLoader>,
        failure_policy: SettingsFailurePolicy,
    ) -> Self {
        Self {
            active: ActiveSettings::new(base.clone()),
            base,
            loader,
            snapshots: Mutex::new(HashMap::new()),
            failure_policy,
        }
    }

    pub fn base(&self) -> &Arc<Settings> {
        &self.base
    }

    pub fn active(&self) -> &ActiveSettings {
        &self.active
    }

    /// Current settings for `tenant`, reloaded first if the source changed
    pub async fn get_tenant_settings(
        &self,
        tenant: &Tenant,
    ) -> Result<Arc<TenantSettingsSnapshot>, SettingsError> {
        let (snapshot, last_loaded_at) = self.cached(&tenant.schema_name);

        match self.loader.load(tenant, snapshot.clone(), last_loaded_at).await {
            Ok((snapshot, last_loaded_at)) => {
                Ok(self.store(&tenant.schema_name, snapshot, last_loaded_at))
            }
            Err(err @ SettingsError::UnimplementedStrategy(_)) => {
                tracing::error!("Settings loader '{}' cannot load: {}", self.loader.name(), err);
                Err(err)
            }
            Err(err) => match (self.failure_policy, last_loaded_at) {
                (SettingsFailurePolicy::LastGood, Some(_)) => {
                    tracing::warn!(
                        "Using last good settings for tenant {}: {}",
                        tenant.schema_name,
                        err
                    );
                    Ok(snapshot)
                }
                _ => {
                    tracing::error!(
                        "Failed to load settings for tenant {}: {}",
                        tenant.schema_name,
                        err
                    );
                    Err(err)
                }
            },
        }
    }

    /// Make `tenant`'s settings active until the returned scope is dropped
    pub async fn on_request_start(&self, tenant: &Tenant) -> Result<SettingsScope, SettingsError> {
        let snapshot = self.get_tenant_settings(tenant).await?;
        self.active.set(snapshot.settings.clone());

        Ok(SettingsScope {
            active: self.active.clone(),
            base: self.base.clone(),
            snapshot,
        })
    }

    /// Restore the base configuration. Equivalent to dropping the scope.
    pub fn on_request_end(&self, scope: SettingsScope) {
        drop(scope);
    }

    fn cached(&self, schema_name: &str) -> (Arc<TenantSettingsSnapshot>, Option<DateTime<Utc>>) {
        let snapshots = self.snapshots.lock();
        match snapshots.get(schema_name) {
            Some(entry) => (entry.snapshot.clone(), entry.last_loaded_at),
            None => (
                Arc::new(TenantSettingsSnapshot::from_base(schema_name, self.base.clone())),
                None,
            ),
        }
    }

    /// Store a loaded snapshot unless a concurrent load already stored a newer one
    fn store(
        &self,
        schema_name: &str,
        snapshot: Arc<TenantSettingsSnapshot>,
        last_loaded_at: Option<DateTime<Utc>>,
    ) -> Arc<TenantSettingsSnapshot> {
        let mut snapshots = self.snapshots.lock();
        if let Some(existing) = snapshots.get(schema_name) {
            if existing.last_loaded_at > last_loaded_at {
                return existing.snapshot.clone();
            }
        }
        snapshots.insert(
            schema_name.to_string(),
            SnapshotEntry {
                snapshot: snapshot.clone(),
                last_loaded_at,
            },
        );
        snapshot
    }
}

/// Tenant settings in effect for one request
///
/// Dropping the scope puts the base configuration back, whether the request
/// succeeded, failed or unwound.
pub struct SettingsScope {
    active: ActiveSettings,
    base: Arc<Settings>,
    snapshot: Arc<TenantSettingsSnapshot>,
}

impl SettingsScope {
    pub fn snapshot(&self) -> &Arc<TenantSettingsSnapshot> {
        &self.snapshot
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.snapshot.settings
    }
}

impl Drop for SettingsScope {
    fn drop(&mut self) {
        self.active.set(self.base.clone());
        tracing::trace!("Restored base settings after tenant {}", self.snapshot.schema_name);
    }
}
