use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tenancy_tenant::TenantContext;
use tower::ServiceExt;

/// Middleware dispatching to the route table named by the tenant context
///
/// Requests without an override continue to the default tenant routes.
pub async fn route_override(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let table = request
        .extensions()
        .get::<TenantContext>()
        .and_then(|context| context.routing_override.clone());

    let Some(table) = table else {
        return next.run(request).await;
    };

    match state.route_tables.get(&table) {
        Some(router) => router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {}),
        None => {
            tracing::warn!("Route table '{}' is not registered, using default routes", table);
            next.run(request).await
        }
    }
}
