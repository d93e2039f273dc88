use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

use crate::error::DirectoryError;

/// Image size ceiling enforced on both sides of the form.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_SQLITE_URL: &str = "sqlite://schools.db?mode=rwc";

/// Process-wide configuration, resolved on first access.
///
/// Falls back to defaults on extraction failure; `main` runs `Config::load`
/// first to report it.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| Config::load().unwrap_or_default());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub schools: SchoolsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

/// Connection settings. `url` wins over the individual MySQL components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub port: u16,
    pub ssl: bool,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            user: None,
            password: None,
            name: None,
            port: 3306,
            ssl: true,
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the URL handed to the `sqlx` any-driver.
    pub fn connection_url(&self) -> Result<String, DirectoryError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().to_string());
        }
        let Some(host) = self.host.as_deref().filter(|h| !h.trim().is_empty()) else {
            return Ok(DEFAULT_SQLITE_URL.to_string());
        };

        let mut url = Url::parse(&format!("mysql://{}:{}", host.trim(), self.port))
            .map_err(|e| DirectoryError::InvalidConfig(format!("database host: {e}")))?;
        if let Some(user) = self.user.as_deref() {
            url.set_username(user)
                .map_err(|_| DirectoryError::InvalidConfig("database user".to_string()))?;
        }
        if let Some(password) = self.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| DirectoryError::InvalidConfig("database password".to_string()))?;
        }
        if let Some(name) = self.name.as_deref() {
            url.set_path(name);
        }
        let ssl_mode = if self.ssl { "REQUIRED" } else { "DISABLED" };
        url.query_pairs_mut()
            .append_pair("ssl-mode", ssl_mode)
            .append_pair("charset", "utf8mb4");
        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub max_image_bytes: usize,
    pub local: LocalStorageConfig,
    pub remote: RemoteStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            local: LocalStorageConfig::default(),
            remote: RemoteStorageConfig::default(),
        }
    }
}

/// Directory written by the local backend and the prefix it is served under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalStorageConfig {
    pub dir: PathBuf,
    pub url_prefix: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/uploads"),
            url_prefix: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStorageConfig {
    pub endpoint: Option<Url>,
    pub token: Option<String>,
    pub public_base_url: Option<Url>,
    pub key_prefix: String,
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            public_base_url: None,
            key_prefix: "schools".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolsConfig {
    /// Require `city` and `state` in addition to `name`.
    pub require_location: bool,
}

impl Default for SchoolsConfig {
    fn default() -> Self {
        Self {
            require_location: true,
        }
    }
}

impl Config {
    /// Merge defaults, the flat variables the deployment already exports,
    /// and `SCHOOLS_`-prefixed nested overrides.
    pub fn load() -> Result<Self, DirectoryError> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(legacy_env())
            .merge(Env::prefixed("SCHOOLS_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, DirectoryError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.storage.max_image_bytes == 0 {
            return Err(DirectoryError::InvalidConfig(
                "storage.max_image_bytes must be positive".to_string(),
            ));
        }
        if !self.storage.local.url_prefix.starts_with('/') {
            return Err(DirectoryError::InvalidConfig(
                "storage.local.url_prefix must start with '/'".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Remote {
            if self.storage.remote.endpoint.is_none() {
                return Err(DirectoryError::InvalidConfig(
                    "storage.remote.endpoint is required for the remote backend".to_string(),
                ));
            }
            if self.storage.remote.token.as_deref().is_none_or(str::is_empty) {
                return Err(DirectoryError::InvalidConfig(
                    "storage.remote.token is required for the remote backend".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Flat variable names mapped onto nested keys.
fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        let mapped = match key.as_str().to_ascii_lowercase().as_str() {
            "database_url" => "database.url",
            "db_host" => "database.host",
            "db_user" => "database.user",
            "db_password" => "database.password",
            "db_name" => "database.name",
            "db_port" => "database.port",
            "db_ssl" => "database.ssl",
            "blob_read_write_token" => "storage.remote.token",
            "loglevel" => "basic.loglevel",
            _ => return None,
        };
        Some(mapped.into())
    })
}
