use crate::handlers::error::ApiError;
use crate::middleware::tenant::tenant_error_response;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::ops::Deref;
use std::sync::Arc;
use tenancy_models::Settings;
use tenancy_tenant::{TenantContext, TenantError};

/// Settings in effect for the current request
#[derive(Debug, Clone)]
pub struct RequestSettings(pub Arc<Settings>);

impl Deref for RequestSettings {
    type Target = Settings;

    fn deref(&self) -> &Settings {
        &self.0
    }
}

/// Middleware swapping the tenant's settings in for the request
///
/// Runs after [`super::resolve_tenant`]. Without a configured overlay every
/// request sees the base settings.
pub async fn tenant_settings(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(overlay) = state.settings_overlay.as_ref() else {
        request
            .extensions_mut()
            .insert(RequestSettings(state.base_settings.clone()));
        return Ok(next.run(request).await);
    };

    let tenant = request
        .extensions()
        .get::<TenantContext>()
        .map(|context| context.tenant.clone());
    let Some(tenant) = tenant else {
        tracing::warn!("Tenant settings requested before tenant resolution");
        request
            .extensions_mut()
            .insert(RequestSettings(overlay.base().clone()));
        return Ok(next.run(request).await);
    };

    let scope = overlay
        .on_request_start(&tenant)
        .await
        .map_err(|e| tenant_error_response(&TenantError::from(e)))?;
    request
        .extensions_mut()
        .insert(RequestSettings(scope.settings().clone()));

    let response = next.run(request).await;
    overlay.on_request_end(scope);
    Ok(response)
}
