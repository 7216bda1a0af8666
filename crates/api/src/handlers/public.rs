use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};
use tenancy_tenant::TenantContext;

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicIndexResponse {
    pub site: String,
    pub message: String,
}

/// Landing page of the public (non-tenant) site
pub async fn index(Extension(context): Extension<TenantContext>) -> Json<PublicIndexResponse> {
    Json(PublicIndexResponse {
        site: context.domain_url().to_string(),
        message: "Public site".to_string(),
    })
}
