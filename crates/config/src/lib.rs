use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;
pub const CONFIG_DIR_ENV: &str = "TECHNOTES_CONFIG_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_enabled")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: true,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address `{}`", self.bind_addr))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Relative paths are resolved against the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: default_database_file(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        if self.database_file.is_absolute() {
            self.database_file.clone()
        } else {
            data_dir.join(&self.database_file)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:3500".to_string()
}

fn default_database_file() -> PathBuf {
    PathBuf::from("technotes.db")
}

fn default_log_filter() -> String {
    "info,notes_api=debug,app_server=debug".to_string()
}

const fn default_enabled() -> bool {
    true
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    /// Uses `$TECHNOTES_CONFIG_DIR` when set, the platform config dir otherwise.
    pub fn from_default_location() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(Self::from_dir(dir));
        }
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("technotes");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            let config = AppConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).context("failed to parse app config json")?;
        self.migrate(&mut config);
        self.save(&config)?;
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut AppConfig) {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating app config schema"
        );

        // v1 wrote an empty filter by default, which silences everything.
        if config.logging.filter.trim().is_empty() {
            config.logging = LoggingConfig::default();
        }
        config.schema_version = CURRENT_SCHEMA_VERSION;
    }
}

/// Directory for the database and log files.
pub fn default_data_dir() -> PathBuf {
    let mut dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("technotes");
    dir
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        let config = store.load_or_init().expect("load default");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.server.bind_addr, "127.0.0.1:3500");
        assert!(store.path().exists());
    }

    #[test]
    fn migrates_old_schema_and_fills_missing_sections() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        fs::write(
            store.path(),
            r#"{
                "schema_version": 1,
                "server": { "bind_addr": "0.0.0.0:8080" },
                "logging": { "filter": "" }
            }"#,
        )
        .expect("write old config");

        let config = store.load_or_init().expect("load");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(config.server.cors);
        assert_eq!(config.logging.filter, default_log_filter());

        let reloaded: AppConfig =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read"))
                .expect("parse");
        assert_eq!(reloaded.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn rejects_invalid_bind_address() {
        let server = ServerConfig {
            bind_addr: "not an address".to_string(),
            cors: false,
        };
        assert!(server.socket_addr().is_err());
        assert!(ServerConfig::default().socket_addr().is_ok());
    }

    #[test]
    fn resolves_relative_database_file_against_data_dir() {
        let storage = StorageConfig::default();
        let path = storage.database_path(Path::new("/var/lib/technotes"));
        assert_eq!(path, PathBuf::from("/var/lib/technotes/technotes.db"));
    }
}
