use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use tenancy_database::DatabaseConfig;
use tenancy_models::Tenant;
use tenancy_tenant::{parse_settings, SettingsFailurePolicy};

/// Config file read when `TENANCY_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/tenancy.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub hostname: HostnameConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Static tenant directory. When empty, tenants are looked up in the database.
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Resolve tenants from `X-Forwarded-Host` when a trusted proxy sets it
    pub use_x_forwarded_host: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            use_x_forwarded_host: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostnameConfig {
    pub prefixes: Vec<String>,
}

impl Default for HostnameConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["www.".to_string(), "dev.".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Route table served instead of the tenant routes for the public tenant
    pub public_schema_routes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Per-tenant settings file, e.g. `/etc/tenancy/{schema_name}/settings.toml`.
    /// Tenant settings are disabled when unset.
    pub path_template: Option<String>,
    pub failure_policy: SettingsFailurePolicy,
    /// Base configuration every tenant starts from. Read from the config file
    /// only, with keys kept exactly as written.
    #[serde(skip)]
    pub base: Map<String, Value>,
}

impl Config {
    /// Load from the file named by `TENANCY_CONFIG` (if present) overlaid with
    /// `TENANCY__SECTION__KEY` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var("TENANCY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = ConfigLoader::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("TENANCY")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("hostname.prefixes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.settings.base = read_base_settings(path)?;
        Ok(config)
    }
}

/// `[settings.base]` parsed straight from the file
///
/// The layered loader folds keys to lower case, which would make mixed-case
/// setting names unreachable.
fn read_base_settings(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(ConfigError::Foreign(Box::new(e))),
    };
    let document =
        parse_settings(path, &contents).map_err(|e| ConfigError::Message(e.to_string()))?;

    match document.get("settings").and_then(|settings| settings.get("base")) {
        Some(Value::Object(base)) => Ok(base.clone()),
        Some(_) => Err(ConfigError::Message("settings.base must be a table".to_string())),
        None => Ok(Map::new()),
    }
}
