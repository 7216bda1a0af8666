use crate::handlers;
use crate::handlers::error::{api_error, ApiError};
use crate::middleware;
use crate::AppState;
use axum::{http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;

/// Name under which [`public_routes`] is registered
pub const PUBLIC_ROUTE_TABLE: &str = "public";

async fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", "No route for this path")
}

/// Route table of the public (non-tenant) site
pub fn public_routes() -> Router {
    Router::new()
        .route("/", get(handlers::public::index))
        .route("/api/tenant", get(handlers::tenant::current_tenant))
        .fallback(not_found)
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Layers run bottom-up: tenant resolution first, route override last
    let tenant_routes = Router::new()
        .route("/api/tenant", get(handlers::tenant::current_tenant))
        .route("/api/settings/:key", get(handlers::settings::get_setting))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), middleware::route_override))
        .layer(from_fn_with_state(state.clone(), middleware::tenant_settings))
        .layer(from_fn_with_state(state.clone(), middleware::resolve_tenant));

    Router::new()
        // Health check, served without tenant resolution
        .route("/health", get(handlers::health::health_check))
        .merge(tenant_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tempfile::TempDir;
    use tenancy_cache::ModelTypeCache;
    use tenancy_database::testing::{CallLog, RecordingPersistenceFactory};
    use tenancy_database::{Database, DatabaseConfig, InMemoryTenantStore, PersistenceFactory};
    use tenancy_models::{Settings, Tenant};
    use tenancy_tenant::{
        FileSettingsLoader, HostnameResolver, PipelineConfig, SettingsFailurePolicy,
        TenantRequestPipeline, TenantSettingsOverlay,
    };
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        log: CallLog,
        type_cache: Arc<ModelTypeCache>,
    }

    fn base_settings() -> Arc<Settings> {
        let Value::Object(map) = json!({ "site_name": "Example", "max_upload_mb": 10 }) else {
            unreachable!()
        };
        Arc::new(Settings::new(map))
    }

    fn build_router(
        persistence: Arc<dyn PersistenceFactory>,
        type_cache: Arc<ModelTypeCache>,
        public_override: Option<&str>,
        settings_dir: Option<&TempDir>,
    ) -> Router {
        let store = InMemoryTenantStore::from_tenants([
            Tenant::new("public", "example.com"),
            Tenant::new("acme", "acme.example.com"),
            Tenant::new("globex", "globex.example.com"),
        ])
        .unwrap();
        let pipeline = TenantRequestPipeline::new(
            Arc::new(store),
            HostnameResolver::new(["www.", "dev."]),
            PipelineConfig {
                public_routing_override: public_override.map(str::to_string),
                ..Default::default()
            },
        );

        let base = base_settings();
        let settings_overlay = settings_dir.map(|dir| {
            let template = dir.path().join("{schema_name}").join("settings.toml");
            let loader = FileSettingsLoader::new(template.to_string_lossy(), base.clone());
            Arc::new(TenantSettingsOverlay::new(
                base.clone(),
                Arc::new(loader),
                SettingsFailurePolicy::Fail,
            ))
        });

        create_router(Arc::new(AppState {
            pipeline,
            persistence,
            type_cache,
            settings_overlay,
            base_settings: base,
            route_tables: HashMap::from([(PUBLIC_ROUTE_TABLE.to_string(), public_routes())]),
            use_x_forwarded_host: false,
        }))
    }

    fn build_app(public_override: Option<&str>, settings_dir: Option<&TempDir>) -> TestApp {
        let log = CallLog::new();
        let type_cache = Arc::new(ModelTypeCache::default());
        let router = build_router(
            Arc::new(RecordingPersistenceFactory::new(log.clone())),
            type_cache.clone(),
            public_override,
            settings_dir,
        );

        TestApp {
            router,
            log,
            type_cache,
        }
    }

    fn write_settings(dir: &TempDir, schema_name: &str, contents: &str) {
        let tenant_dir = dir.path().join(schema_name);
        std::fs::create_dir_all(&tenant_dir).unwrap();
        std::fs::write(tenant_dir.join("settings.toml"), contents).unwrap();
    }

    async fn get_json(router: &Router, host: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header("host", host)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_resolves_tenant_from_prefixed_host_with_port() {
        let app = build_app(None, None);

        let (status, body) =
            get_json(&app.router, "www.acme.example.com:8443", "/api/tenant").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schema_name"], "acme");
        assert_eq!(body["domain_url"], "acme.example.com");
        assert_eq!(body["active_schema"], "acme");
        // the recording binding has no live connection to ask
        assert_eq!(body["database_schema"], Value::Null);
        assert_eq!(app.log.entries(), vec!["set_schema:public", "set_schema:acme"]);
        assert_eq!(app.type_cache.clear_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_host_is_not_found() {
        let app = build_app(None, None);

        let (status, body) = get_json(&app.router, "ghost.example.com", "/api/tenant").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "tenant_not_found");
        assert_eq!(app.log.entries(), vec!["set_schema:public"]);
        assert_eq!(app.type_cache.clear_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_host_is_bad_request() {
        let app = build_app(None, None);
        let request = Request::builder().uri("/api/tenant").body(Body::empty()).unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(app.log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_public_tenant_uses_override_routes() {
        let app = build_app(Some(PUBLIC_ROUTE_TABLE), None);

        let (status, body) = get_json(&app.router, "www.example.com", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["site"], "example.com");
        assert_eq!(body["message"], "Public site");

        let (status, _) = get_json(&app.router, "acme.example.com", "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_tenant_without_override_uses_default_routes() {
        let app = build_app(None, None);

        let (status, _) = get_json(&app.router, "example.com", "/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(&app.router, "example.com", "/api/tenant").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_schema"], "public");
        // one binding per request, never a tenant schema
        assert_eq!(app.log.entries(), vec!["set_schema:public", "set_schema:public"]);
    }

    #[tokio::test]
    async fn test_base_settings_without_overlay() {
        let app = build_app(None, None);

        let (status, body) =
            get_json(&app.router, "acme.example.com", "/api/settings/site_name").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Example"));

        let (status, body) =
            get_json(&app.router, "acme.example.com", "/api/settings/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "setting_not_found");
    }

    #[tokio::test]
    async fn test_tenant_settings_overlay_base() {
        let dir = TempDir::new().unwrap();
        write_settings(&dir, "acme", "site_name = \"Acme\"\n");
        write_settings(&dir, "public", "debug = false\n");
        let app = build_app(None, Some(&dir));

        let (_, body) = get_json(&app.router, "acme.example.com", "/api/settings/site_name").await;
        assert_eq!(body, json!("Acme"));

        let (_, body) =
            get_json(&app.router, "acme.example.com", "/api/settings/max_upload_mb").await;
        assert_eq!(body, json!(10));

        let (_, body) = get_json(&app.router, "example.com", "/api/settings/site_name").await;
        assert_eq!(body, json!("Example"));
    }

    #[tokio::test]
    async fn test_mixed_case_setting_names() {
        let dir = TempDir::new().unwrap();
        write_settings(&dir, "acme", "SITE_NAME = \"Acme\"\n");
        let app = build_app(None, Some(&dir));

        let (status, body) =
            get_json(&app.router, "acme.example.com", "/api/settings/SITE_NAME").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("Acme"));

        // lookups are case-sensitive
        let (_, body) = get_json(&app.router, "acme.example.com", "/api/settings/site_name").await;
        assert_eq!(body, json!("Example"));
    }

    #[tokio::test]
    async fn test_unreadable_tenant_settings_fail_the_request() {
        let dir = TempDir::new().unwrap();
        write_settings(&dir, "acme", "site_name = \"Acme\"\n");
        let app = build_app(None, Some(&dir));

        let (status, body) =
            get_json(&app.router, "globex.example.com", "/api/settings/site_name").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
    }

    #[tokio::test]
    async fn test_health_skips_tenant_resolution() {
        let dir = TempDir::new().unwrap();
        let app = build_app(None, Some(&dir));

        let (status, body) = get_json(&app.router, "ghost.example.com", "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tenant_settings"], true);
        assert!(app.log.entries().is_empty());
    }

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_tenant_endpoint_reports_database_schema() {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| DatabaseConfig::default().url),
            ..Default::default()
        };
        let database = Database::new(config).await.expect("Failed to connect to database");
        sqlx::query("CREATE SCHEMA IF NOT EXISTS acme")
            .execute(database.pool())
            .await
            .unwrap();
        let router = build_router(
            Arc::new(database),
            Arc::new(ModelTypeCache::default()),
            None,
            None,
        );

        let (status, body) = get_json(&router, "acme.example.com", "/api/tenant").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active_schema"], "acme");
        assert_eq!(body["database_schema"], "acme");

        let (_, body) = get_json(&router, "example.com", "/api/tenant").await;
        assert_eq!(body["database_schema"], "public");
    }
}
