use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::CatalogOptions;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_logfile")]
    pub logfile: String,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(alias = "fallbackcategory", default = "default_fallback_category")]
    pub fallback_category: String,
    #[serde(alias = "seedsampledata", default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fallback_category: default_fallback_category(),
            seed_sample_data: default_seed_sample_data(),
        }
    }
}

impl CatalogConfig {
    pub fn options(&self) -> CatalogOptions {
        CatalogOptions {
            fallback_category: self.fallback_category.clone(),
            seed_sample_data: self.seed_sample_data,
        }
    }
}

fn default_logfile() -> String {
    "stdout".to_string()
}

fn default_fallback_category() -> String {
    "Aptitude".to_string()
}

fn default_seed_sample_data() -> bool {
    true
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::parse(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("vidshelf.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.logfile, "stdout");
        assert_eq!(config.catalog.fallback_category, "Aptitude");
        assert!(config.catalog.seed_sample_data);
        assert_eq!(config.get_database_path(), None);
    }

    #[test]
    fn test_database_path() {
        let config = Config::parse(
            "dbdir: /var/lib/vidshelf\ncatalog:\n  fallback_category: General\n  seed_sample_data: false\n",
        )
        .unwrap();
        assert_eq!(
            config.get_database_path().as_deref(),
            Some("/var/lib/vidshelf/vidshelf.db")
        );
        assert_eq!(config.catalog.options().fallback_category, "General");
        assert!(!config.catalog.options().seed_sample_data);

        let config = Config::parse(
            "dbdir: /var/lib/vidshelf\ndatabase:\n  sqlite:\n    filename: /tmp/shelf.db\n",
        )
        .unwrap();
        assert_eq!(config.get_database_path().as_deref(), Some("/tmp/shelf.db"));
    }
}
