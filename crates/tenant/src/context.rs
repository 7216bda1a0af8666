// Tenant context for request handling

use std::sync::Arc;
use tenancy_models::Tenant;

/// Tenant resolved for the current request
///
/// Attached to the request once resolution succeeds and read-only afterwards.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: Arc<Tenant>,
    /// Name of the route table that replaces the default one for this request
    pub routing_override: Option<String>,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        Self {
            tenant: Arc::new(tenant),
            routing_override: None,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.tenant.schema_name
    }

    pub fn domain_url(&self) -> &str {
        &self.tenant.domain_url
    }
}
