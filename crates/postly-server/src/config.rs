use postly_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token signing and Google sign-in configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if self.storage.backend == StorageBackend::Mongo {
            let uri = self.storage.mongo.uri.as_deref().unwrap_or("");
            if uri.is_empty() {
                return Err(
                    "storage.backend=mongo requires storage.mongo.uri (or DB_CONNECT)".into(),
                );
            }
            if self.storage.mongo.database.is_empty() {
                return Err("storage.mongo.database must not be empty".into());
            }
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which [`UserStore`](postly_auth::UserStore) implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store. Users vanish on restart.
    #[default]
    Memory,
    /// MongoDB `users` collection.
    Mongo,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub mongo: MongoStorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStorageConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default = "default_mongo_database")]
    pub database: String,
}

fn default_mongo_database() -> String {
    "postly".into()
}

impl Default for MongoStorageConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: default_mongo_database(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "postly.toml";

    /// Loads configuration from the file at `path` (or `postly.toml`) and the
    /// process environment, then validates it.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_config_with_env(path, |name| std::env::var(name).ok())
    }

    /// Like [`load_config`], but resolves the legacy variables (`TOKEN_SECRET`,
    /// `DB_CONNECT`, ...) through `lookup`.
    ///
    /// Layer order, lowest first: file, `POSTLY__*` variables, legacy variables.
    pub fn load_config_with_env<F>(path: Option<&str>, lookup: F) -> Result<AppConfig, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., POSTLY__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("POSTLY")
                .try_parsing(true)
                .separator("__"),
        );
        builder = apply_legacy_env(builder, lookup)?;

        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    /// Maps the variable names of earlier deployments onto config keys.
    fn apply_legacy_env<F>(
        mut builder: ConfigBuilder<DefaultState>,
        lookup: F,
    ) -> Result<ConfigBuilder<DefaultState>, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let err = |e: config::ConfigError| format!("config override error: {e}");

        if let Some(secret) = get("TOKEN_SECRET") {
            builder = builder
                .set_override("auth.token.secret", secret)
                .map_err(err)?;
        }
        if let Some(value) = get("TOKEN_EXPIRES") {
            builder = builder
                .set_override("auth.token.access_token_lifetime", legacy_duration(&value))
                .map_err(err)?;
        }
        if let Some(value) = get("REFRESH_TOKEN_EXPIRES") {
            builder = builder
                .set_override("auth.token.refresh_token_lifetime", legacy_duration(&value))
                .map_err(err)?;
        }
        if let Some(client_id) = get("GOOGLE_CLIENT_ID") {
            builder = builder
                .set_override("auth.google.client_id", client_id)
                .map_err(err)?;
        }
        if let Some(uri) = get("DB_CONNECT") {
            builder = builder
                .set_override("storage.backend", "mongo")
                .map_err(err)?
                .set_override("storage.mongo.uri", uri)
                .map_err(err)?;
        }
        if let Some(port) = get("PORT") {
            let port: i64 = port
                .trim()
                .parse()
                .map_err(|_| format!("PORT must be a number, got {port:?}"))?;
            builder = builder.set_override("server.port", port).map_err(err)?;
        }
        Ok(builder)
    }

    /// Bare integers are seconds; anything else is passed through as a
    /// humantime string.
    fn legacy_duration(value: &str) -> String {
        let value = value.trim();
        if value.parse::<u64>().is_ok() {
            format!("{value}s")
        } else {
            value.to_string()
        }
    }

}
