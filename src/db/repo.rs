use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// A flat, string-keyed store. Every value is an opaque string; the store
/// knows nothing about what is encoded in it.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> DbResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> DbResult<()>;
    async fn remove(&self, key: &str) -> DbResult<()>;

    /// Write several keys as one unit. Either every entry is stored or,
    /// on error, none of them is.
    async fn set_many(&self, entries: &[(&str, String)]) -> DbResult<()>;

    /// Returns true if `key` holds a value.
    async fn contains(&self, key: &str) -> DbResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
