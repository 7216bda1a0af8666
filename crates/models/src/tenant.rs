use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Tenant directory record
///
/// Lives in the public schema. `domain_url` is the canonical hostname a request
/// must resolve to in order to be routed to `schema_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub schema_name: String,
    pub domain_url: String,
}

impl Tenant {
    pub fn new(schema_name: impl Into<String>, domain_url: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            domain_url: domain_url.into(),
        }
    }

    /// Whether this is the sentinel tenant owning the public schema
    pub fn is_public(&self, public_schema_name: &str) -> bool {
        self.schema_name == public_schema_name
    }
}
