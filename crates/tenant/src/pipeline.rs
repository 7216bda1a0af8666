use crate::context::TenantContext;
use crate::error::{Result, TenantError};
use crate::hostname::HostnameResolver;
use std::sync::Arc;
use tenancy_cache::TypeCache;
use tenancy_database::{Persistence, SchemaContext, TenantStore};
use tenancy_models::DEFAULT_PUBLIC_SCHEMA;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Schema owned by the public sentinel tenant
    pub public_schema: String,
    /// Route table used instead of the default one when the public tenant is resolved
    pub public_routing_override: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            public_schema: DEFAULT_PUBLIC_SCHEMA.to_string(),
            public_routing_override: None,
        }
    }
}

/// Per-request tenant resolution
///
/// Must run before any tenant-aware logic of the request.
pub struct TenantRequestPipeline {
    store: Arc<dyn TenantStore>,
    resolver: HostnameResolver,
    config: PipelineConfig,
}

impl TenantRequestPipeline {
    pub fn new(
        store: Arc<dyn TenantStore>,
        resolver: HostnameResolver,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            config,
        }
    }

    /// Resolve the tenant for `host_header` and bind its schema on `schema`
    ///
    /// On `TenantNotFound` the context is left bound to the public schema.
    pub async fn process_request<P: Persistence>(
        &self,
        host_header: &str,
        schema: &mut SchemaContext<P>,
        type_cache: &dyn TypeCache,
    ) -> Result<TenantContext> {
        // the tenant directory only exists in the public schema
        schema.set_public().await?;

        let hostname = self.resolver.resolve(host_header);

        let tenant = self
            .store
            .find_by_domain(&hostname)
            .await?
            .ok_or_else(|| {
                tracing::warn!("No tenant registered for hostname: {}", hostname);
                TenantError::TenantNotFound(hostname.clone())
            })?;

        let mut context = TenantContext::new(tenant);

        schema.set_tenant(context.schema_name()).await?;

        // Type ids are allocated per schema: the same model can be id 14 in public
        // and id 15 in a tenant. Caches that do not key by schema must drop them.
        type_cache.clear();

        if context.tenant.is_public(&self.config.public_schema) {
            context.routing_override = self.config.public_routing_override.clone();
        }

        tracing::debug!(
            "Resolved hostname {} to tenant schema {}",
            hostname,
            context.schema_name()
        );

        Ok(context)
    }
}
