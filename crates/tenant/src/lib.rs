// Tenant resolution and request-scoped tenant state
//
// A request's host is resolved to a tenant, its schema is bound on the
// request's own connection, and tenant settings are swapped in for the
// duration of the request.

pub mod context;
pub mod error;
pub mod hostname;
pub mod pipeline;
pub mod settings;

pub use context::TenantContext;
pub use error::{Result, SettingsError, TenantError};
pub use hostname::HostnameResolver;
pub use pipeline::{PipelineConfig, TenantRequestPipeline};
pub use settings::{
    parse_settings, ActiveSettings, FileSettingsLoader, SettingsFailurePolicy, SettingsLoader,
    SettingsScope, TenantSettingsOverlay,
};
