use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use config::{AppConfig, ConfigStore, default_data_dir};
use storage_sqlite::SqliteStorage;
use tracing::{error, info};

mod logging;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let data_dir = default_data_dir();
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }

    let config_store = ConfigStore::from_default_location()?;
    let (config, config_error) = match config_store.load_or_init() {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };

    let _log_guard = logging::init_local_logger(&data_dir.join("logs"), &config.logging.filter);
    if let Some(err) = config_error {
        error!(
            path = %config_store.path().display(),
            "failed to load config, using defaults: {err:#}"
        );
    }

    let db_path = config.storage.database_path(&data_dir);
    let storage = SqliteStorage::connect(&db_path)
        .await
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let schema_version = storage.schema_version().await?;
    info!(path = %db_path.display(), schema_version, "storage ready");

    let addr = config.server.socket_addr()?;
    let router = notes_api::router(Arc::new(storage), config.server.cors);
    server::serve(addr, router).await
}
