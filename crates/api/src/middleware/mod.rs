pub mod routing;
pub mod settings;
pub mod tenant;

pub use routing::route_override;
pub use settings::{tenant_settings, RequestSettings};
pub use tenant::{resolve_tenant, tenant_error_response, TenantConnection};
