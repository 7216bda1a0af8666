use crate::error::{DatabaseError, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tenancy_models::{validate_schema_name, Tenant};

/// Tenant directory lookup
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find the tenant registered for a canonical hostname
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>>;
}

/// Tenant directory stored in a Postgres table of the public schema
pub struct PgTenantStore {
    pool: PgPool,
    query: String,
}

impl PgTenantStore {
    pub fn new(pool: PgPool, public_schema: &str, table: &str) -> Result<Self> {
        validate_schema_name(public_schema)?;
        validate_schema_name(table)?;

        let query = format!(
            "SELECT schema_name, domain_url FROM \"{}\".\"{}\" WHERE domain_url = $1",
            public_schema, table
        );

        Ok(Self { pool, query })
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(&self.query)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tenant)
    }
}

/// Tenant directory held in memory, for statically configured deployments
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantStore {
    by_domain: HashMap<String, Tenant>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Result<Self> {
        let mut store = Self::new();
        for tenant in tenants {
            store.insert(tenant)?;
        }
        Ok(store)
    }

    /// Register a tenant; a domain may only map to one tenant
    pub fn insert(&mut self, tenant: Tenant) -> Result<()> {
        validate_schema_name(&tenant.schema_name)?;
        if self.by_domain.contains_key(&tenant.domain_url) {
            return Err(DatabaseError::duplicate(
                "Tenant",
                &format!("domain_url {}", tenant.domain_url),
            ));
        }
        self.by_domain.insert(tenant.domain_url.clone(), tenant);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>> {
        Ok(self.by_domain.get(domain).cloned())
    }
}
