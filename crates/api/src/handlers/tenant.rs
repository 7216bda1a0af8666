use crate::handlers::error::ApiError;
use crate::middleware::{tenant_error_response, TenantConnection};
use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tenancy_tenant::{TenantContext, TenantError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantResponse {
    pub schema_name: String,
    pub domain_url: String,
    /// Schema the request's connection is bound to
    pub active_schema: Option<String>,
    /// `current_schema()` as reported by the database over that connection
    pub database_schema: Option<String>,
}

/// Tenant resolved for this request
pub async fn current_tenant(
    Extension(context): Extension<TenantContext>,
    Extension(connection): Extension<TenantConnection>,
) -> Result<Json<TenantResponse>, ApiError> {
    let mut schema = connection.lock().await;
    let active_schema = schema.schema_name().map(str::to_string);
    let database_schema = schema
        .database_schema()
        .await
        .map_err(|e| tenant_error_response(&TenantError::Database(e)))?;

    Ok(Json(TenantResponse {
        schema_name: context.schema_name().to_string(),
        domain_url: context.domain_url().to_string(),
        active_schema,
        database_schema,
    }))
}
