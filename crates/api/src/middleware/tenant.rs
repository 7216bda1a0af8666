use crate::handlers::error::{api_error, ApiError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tenancy_database::{Persistence, SchemaContext};
use tenancy_tenant::TenantError;
use tokio::sync::{Mutex, MutexGuard};

type BoundSchema = SchemaContext<Box<dyn Persistence>>;

/// The request's connection, bound to the resolved tenant's schema
#[derive(Clone)]
pub struct TenantConnection {
    inner: Arc<Mutex<BoundSchema>>,
}

impl TenantConnection {
    pub fn new(schema: BoundSchema) -> Self {
        Self {
            inner: Arc::new(Mutex::new(schema)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, BoundSchema> {
        self.inner.lock().await
    }

    pub async fn schema_name(&self) -> Option<String> {
        self.lock().await.schema_name().map(str::to_string)
    }
}

/// Host the request was addressed to
///
/// `X-Forwarded-Host` is only honoured when the deployment sits behind a
/// proxy that sets it. HTTP/2 requests carry the host in the URI authority.
fn extract_host(headers: &HeaderMap, uri: &Uri, use_x_forwarded_host: bool) -> Option<String> {
    let forwarded = use_x_forwarded_host
        .then(|| headers.get("x-forwarded-host"))
        .flatten()
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next());

    forwarded
        .or_else(|| headers.get("host").and_then(|h| h.to_str().ok()))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// Map a tenant resolution failure to the client-facing response
///
/// Unknown hosts are an expected occurrence and get a plain 404. Anything else
/// is logged and reported without internal details.
pub fn tenant_error_response(err: &TenantError) -> ApiError {
    match err {
        TenantError::TenantNotFound(hostname) => api_error(
            StatusCode::NOT_FOUND,
            "tenant_not_found",
            &format!("No tenant is registered for '{}'", hostname),
        ),
        TenantError::Database(e) => {
            tracing::error!("Tenant resolution failed: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Tenant resolution failed",
            )
        }
        TenantError::SettingsLoadFailure(e) => {
            tracing::error!("Tenant settings unavailable: {}", e);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Tenant settings unavailable",
            )
        }
    }
}

/// Middleware resolving the request's tenant and binding its schema
pub async fn resolve_tenant(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let host = extract_host(request.headers(), request.uri(), state.use_x_forwarded_host)
        .ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "missing_host",
                "Request does not name a host",
            )
        })?;

    let persistence = state
        .persistence
        .acquire()
        .await
        .map_err(|e| tenant_error_response(&TenantError::Database(e)))?;
    let mut schema = SchemaContext::new(persistence);

    let context = state
        .pipeline
        .process_request(&host, &mut schema, state.type_cache.as_ref())
        .await
        .map_err(|e| {
            if e.is_not_found() {
                tracing::debug!("No tenant for host {}", host);
            }
            tenant_error_response(&e)
        })?;

    request.extensions_mut().insert(context);
    request.extensions_mut().insert(TenantConnection::new(schema));

    Ok(next.run(request).await)
}
