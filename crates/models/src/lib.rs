// Core modules
pub mod schema;
pub mod settings;
pub mod tenant;

// Re-export commonly used types
pub use schema::{validate_schema_name, SchemaNameError, DEFAULT_PUBLIC_SCHEMA};
pub use settings::{Settings, TenantSettingsSnapshot};
pub use tenant::Tenant;
