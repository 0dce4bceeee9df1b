pub mod catalog;
pub mod config;
pub mod db;
pub mod util;

use std::sync::Arc;
use tracing::info;

use catalog::{Catalog, CatalogError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("No database path configured")]
    NoDatabasePath,
}

/// Open the SQLite database named by `config` and the catalog stored in it.
pub async fn open(config: &config::Config) -> Result<Catalog, AppError> {
    let db_path = config.get_database_path().ok_or(AppError::NoDatabasePath)?;

    info!("Opening database at {}", db_path);
    let store = Arc::new(db::SqliteKvStore::new(&db_path).await?);

    let catalog = Catalog::open(store, config.catalog.options()).await?;
    info!(
        "Catalog ready, fallback category is {}",
        catalog.fallback_category_id()
    );

    Ok(catalog)
}
