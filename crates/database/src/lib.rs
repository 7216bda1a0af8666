pub mod connection;
pub mod error;
pub mod repositories;
pub mod schema;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::{Database, DatabaseConfig};
pub use error::{DatabaseError, Result};
pub use repositories::tenants::{InMemoryTenantStore, PgTenantStore, TenantStore};
pub use schema::{PersistenceFactory, PgPersistence, Persistence, SchemaContext, SchemaTarget};
