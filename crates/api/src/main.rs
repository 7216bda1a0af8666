// Tenancy API Server
// Resolves the tenant of every request from its host name

mod config;
mod handlers;
mod middleware;
mod routes;

use anyhow::Context;
use crate::config::Config;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::sync::Arc;
use tenancy_cache::ModelTypeCache;
use tenancy_database::{
    Database, InMemoryTenantStore, PersistenceFactory, PgTenantStore, TenantStore,
};
use tenancy_models::Settings;
use tenancy_tenant::{
    FileSettingsLoader, HostnameResolver, PipelineConfig, TenantRequestPipeline,
    TenantSettingsOverlay,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub pipeline: TenantRequestPipeline,
    pub persistence: Arc<dyn PersistenceFactory>,
    pub type_cache: Arc<ModelTypeCache>,
    /// Present when per-tenant settings files are configured
    pub settings_overlay: Option<Arc<TenantSettingsOverlay>>,
    pub base_settings: Arc<Settings>,
    /// Alternate route tables a tenant context may name
    pub route_tables: HashMap<String, axum::Router>,
    pub use_x_forwarded_host: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tenancy_api=debug,tower_http=debug")),
        )
        .init();

    tracing::info!("🚀 Starting Tenancy API Server");
    tracing::info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("🔌 Server: {}:{}", config.server.host, config.server.port);

    // Initialize database
    tracing::info!("🗄️  Connecting to database...");
    let database = Database::new(config.database.clone())
        .await
        .context("Failed to connect to database")?;
    database.ping().await.context("Database ping failed")?;
    tracing::info!("✅ Database connected");

    // Tenant directory
    let store: Arc<dyn TenantStore> = if config.tenants.is_empty() {
        tracing::info!(
            "🏢 Tenant directory: {}.{}",
            config.database.public_schema,
            config.database.tenant_table
        );
        Arc::new(PgTenantStore::new(
            database.pool().clone(),
            &config.database.public_schema,
            &config.database.tenant_table,
        )?)
    } else {
        tracing::info!("🏢 Tenant directory: {} configured tenants", config.tenants.len());
        Arc::new(InMemoryTenantStore::from_tenants(config.tenants.clone())?)
    };

    // Route tables
    let route_tables = HashMap::from([(
        routes::PUBLIC_ROUTE_TABLE.to_string(),
        routes::public_routes(),
    )]);
    if let Some(table) = &config.routing.public_schema_routes {
        anyhow::ensure!(
            route_tables.contains_key(table),
            "Unknown route table '{}' for the public schema",
            table
        );
        tracing::info!("🧭 Public schema routes: {}", table);
    }

    let pipeline = TenantRequestPipeline::new(
        store,
        HostnameResolver::new(config.hostname.prefixes.clone()),
        PipelineConfig {
            public_schema: config.database.public_schema.clone(),
            public_routing_override: config.routing.public_schema_routes.clone(),
        },
    );

    // Tenant settings
    let base_settings = Arc::new(Settings::new(config.settings.base.clone()));
    let settings_overlay = config.settings.path_template.as_ref().map(|template| {
        tracing::info!(
            "⚙️  Tenant settings: {} ({:?} on failure)",
            template,
            config.settings.failure_policy
        );
        let loader = FileSettingsLoader::new(template.clone(), base_settings.clone());
        Arc::new(TenantSettingsOverlay::new(
            base_settings.clone(),
            Arc::new(loader),
            config.settings.failure_policy,
        ))
    });

    // Create app state
    let state = Arc::new(AppState {
        pipeline,
        persistence: Arc::new(database),
        type_cache: Arc::new(ModelTypeCache::default()),
        settings_overlay,
        base_settings,
        route_tables,
        use_x_forwarded_host: config.server.use_x_forwarded_host,
    });

    // Create router
    let app = routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("✅ Server ready at http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
