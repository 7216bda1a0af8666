//! Request-scoped schema binding
//!
//! Every request owns its own [`SchemaContext`]. Nothing here is a process
//! global, so concurrent requests on a multi-threaded runtime cannot observe
//! each other's schema.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, Postgres};
use std::fmt;
use tenancy_models::validate_schema_name;

/// Schema a persistence binding points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaTarget {
    Public,
    Tenant(String),
}

impl fmt::Display for SchemaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "<public>"),
            Self::Tenant(name) => write!(f, "{}", name),
        }
    }
}

/// Persistence-layer hook used to repoint subsequent statements
#[async_trait]
pub trait Persistence: Send {
    /// Name of the shared schema
    fn public_schema(&self) -> &str;

    async fn set_schema(&mut self, target: &SchemaTarget) -> Result<()>;

    /// Connection carrying the binding, `None` for bindings without a database
    fn connection(&mut self) -> Option<&mut PgConnection> {
        None
    }
}

#[async_trait]
impl<P: Persistence + ?Sized> Persistence for Box<P> {
    fn public_schema(&self) -> &str {
        (**self).public_schema()
    }

    fn connection(&mut self) -> Option<&mut PgConnection> {
        (**self).connection()
    }

    async fn set_schema(&mut self, target: &SchemaTarget) -> Result<()> {
        (**self).set_schema(target).await
    }
}

/// Source of per-request persistence bindings
#[async_trait]
pub trait PersistenceFactory: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Persistence>>;
}

/// Postgres binding over a single pooled connection
///
/// The connection is held for the lifetime of the request so that the
/// `search_path` it carries applies to every statement the request issues.
pub struct PgPersistence {
    conn: PoolConnection<Postgres>,
    public_schema: String,
}

impl PgPersistence {
    pub fn new(conn: PoolConnection<Postgres>, public_schema: String) -> Self {
        Self {
            conn,
            public_schema,
        }
    }
}

/// `SET search_path` statement for `target`
///
/// Tenant schemas keep the public schema on the path so shared tables stay visible.
pub fn search_path_statement(target: &SchemaTarget, public_schema: &str) -> Result<String> {
    validate_schema_name(public_schema)?;
    match target {
        SchemaTarget::Public => Ok(format!("SET search_path TO \"{}\"", public_schema)),
        SchemaTarget::Tenant(name) => {
            validate_schema_name(name)?;
            Ok(format!(
                "SET search_path TO \"{}\", \"{}\"",
                name, public_schema
            ))
        }
    }
}

#[async_trait]
impl Persistence for PgPersistence {
    fn public_schema(&self) -> &str {
        &self.public_schema
    }

    async fn set_schema(&mut self, target: &SchemaTarget) -> Result<()> {
        let statement = search_path_statement(target, &self.public_schema)?;
        sqlx::query(&statement).execute(&mut *self.conn).await?;
        Ok(())
    }

    fn connection(&mut self) -> Option<&mut PgConnection> {
        Some(&mut *self.conn)
    }
}

/// Schema selection for one request
pub struct SchemaContext<P> {
    persistence: P,
    current: Option<SchemaTarget>,
}

impl<P: Persistence> SchemaContext<P> {
    /// New context with no schema bound yet
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            current: None,
        }
    }

    pub async fn set_public(&mut self) -> Result<()> {
        self.switch(SchemaTarget::Public).await
    }

    /// Bind `schema_name`. Naming the public schema is the same as [`Self::set_public`].
    pub async fn set_tenant(&mut self, schema_name: &str) -> Result<()> {
        if schema_name == self.persistence.public_schema() {
            return self.set_public().await;
        }
        self.switch(SchemaTarget::Tenant(schema_name.to_string()))
            .await
    }

    async fn switch(&mut self, target: SchemaTarget) -> Result<()> {
        if self.current.as_ref() == Some(&target) {
            return Ok(());
        }
        self.persistence.set_schema(&target).await?;
        tracing::debug!("Schema switched to {}", target);
        self.current = Some(target);
        Ok(())
    }

    /// Currently bound schema, `None` before the first switch
    pub fn current(&self) -> Option<&SchemaTarget> {
        self.current.as_ref()
    }

    /// Name of the bound schema as the database knows it
    pub fn schema_name(&self) -> Option<&str> {
        match self.current.as_ref()? {
            SchemaTarget::Public => Some(self.persistence.public_schema()),
            SchemaTarget::Tenant(name) => Some(name),
        }
    }

    pub fn is_public(&self) -> bool {
        self.current == Some(SchemaTarget::Public)
    }

    /// Connection whose `search_path` follows this context
    pub fn connection(&mut self) -> Option<&mut PgConnection> {
        self.persistence.connection()
    }

    /// Schema the database itself reports as current, `None` without a connection
    pub async fn database_schema(&mut self) -> Result<Option<String>> {
        let Some(conn) = self.persistence.connection() else {
            return Ok(None);
        };
        let schema = sqlx::query_scalar::<_, Option<String>>("SELECT current_schema()")
            .fetch_one(conn)
            .await?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPersistence;

    #[test]
    fn test_search_path_statements() {
        assert_eq!(
            search_path_statement(&SchemaTarget::Public, "public").unwrap(),
            "SET search_path TO \"public\""
        );
        assert_eq!(
            search_path_statement(&SchemaTarget::Tenant("acme".into()), "public").unwrap(),
            "SET search_path TO \"acme\", \"public\""
        );
    }

    #[test]
    fn test_search_path_rejects_unsafe_names() {
        let target = SchemaTarget::Tenant("acme\"; DROP TABLE tenants; --".into());
        assert!(search_path_statement(&target, "public").is_err());
        assert!(search_path_statement(&SchemaTarget::Public, "pg_catalog").is_err());
    }

    #[tokio::test]
    async fn test_first_set_public_always_switches() {
        let persistence = RecordingPersistence::new();
        let log = persistence.log();
        let mut ctx = SchemaContext::new(persistence);
        assert_eq!(ctx.current(), None);

        ctx.set_public().await.unwrap();

        assert!(ctx.is_public());
        assert_eq!(log.entries(), vec!["set_schema:public"]);
    }

    #[tokio::test]
    async fn test_redundant_switches_are_noops() {
        let persistence = RecordingPersistence::new();
        let log = persistence.log();
        let mut ctx = SchemaContext::new(persistence);

        ctx.set_public().await.unwrap();
        ctx.set_public().await.unwrap();
        ctx.set_tenant("acme").await.unwrap();
        ctx.set_tenant("acme").await.unwrap();

        assert_eq!(ctx.schema_name(), Some("acme"));
        assert_eq!(
            log.entries(),
            vec!["set_schema:public", "set_schema:acme"]
        );
    }

    #[tokio::test]
    async fn test_set_tenant_with_public_name_binds_public() {
        let persistence = RecordingPersistence::new();
        let log = persistence.log();
        let mut ctx = SchemaContext::new(persistence);

        ctx.set_public().await.unwrap();
        ctx.set_tenant("public").await.unwrap();

        assert!(ctx.is_public());
        assert_eq!(ctx.schema_name(), Some("public"));
        assert_eq!(log.entries(), vec!["set_schema:public"]);
    }

    #[tokio::test]
    async fn test_recording_binding_has_no_connection() {
        let mut ctx = SchemaContext::new(RecordingPersistence::new());
        ctx.set_tenant("acme").await.unwrap();

        assert!(ctx.connection().is_none());
        assert_eq!(ctx.database_schema().await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_search_path_applies_to_bound_connection() {
        let config = crate::DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| crate::DatabaseConfig::default().url),
            ..Default::default()
        };
        let db = crate::Database::new(config).await.expect("Failed to connect to database");
        sqlx::query("CREATE SCHEMA IF NOT EXISTS acme")
            .execute(db.pool())
            .await
            .unwrap();

        let mut ctx = SchemaContext::new(db.acquire_persistence().await.unwrap());
        ctx.set_public().await.unwrap();
        assert_eq!(ctx.database_schema().await.unwrap().as_deref(), Some("public"));

        ctx.set_tenant("acme").await.unwrap();
        assert_eq!(ctx.database_schema().await.unwrap().as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_previous_binding() {
        let persistence = RecordingPersistence::new().failing_on("broken");
        let mut ctx = SchemaContext::new(persistence);

        ctx.set_public().await.unwrap();
        assert!(ctx.set_tenant("broken").await.is_err());

        assert!(ctx.is_public());
    }
}
