use crate::error::SettingsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tenancy_models::{Tenant, TenantSettingsSnapshot};

/// Snapshot and source timestamp handed back by a [`SettingsLoader`]
pub type LoadOutcome = (Arc<TenantSettingsSnapshot>, Option<DateTime<Utc>>);

/// Pluggable reload policy for tenant settings
///
/// `load` receives the tenant's current snapshot and the modification time of
/// the source it was built from (`None` if never loaded). It returns either the
/// same snapshot, when the source has not changed, or a newly built one with
/// the source's current timestamp.
#[async_trait]
pub trait SettingsLoader: Send + Sync {
    /// Strategy name used in logs and errors
    fn name(&self) -> &str;

    async fn load(
        &self,
        _tenant: &Tenant,
        _snapshot: Arc<TenantSettingsSnapshot>,
        _last_loaded_at: Option<DateTime<Utc>>,
    ) -> Result<LoadOutcome, SettingsError> {
        Err(SettingsError::UnimplementedStrategy(self.name().to_string()))
    }
}
