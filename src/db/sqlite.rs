use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::repo::*;

pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(store)
    }

    /// Open a private in-memory database. The pool is pinned to a single
    /// connection that never expires, since every new connection to
    /// `:memory:` would see an empty database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let result = sqlx::query_as::<_, (String,)>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result.map(|r| r.0))
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")
                .bind(*key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("Committed batch of {} keys", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = SqliteKvStore::in_memory().await.unwrap();
        assert_eq!(store.get("nope").await.unwrap(), None);
        assert!(!store.contains("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = SqliteKvStore::in_memory().await.unwrap();
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_many() {
        let store = SqliteKvStore::in_memory().await.unwrap();
        store
            .set_many(&[("a", "1".to_string()), ("b", "2".to_string())])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_set_many_rolls_back_on_error() {
        let store = SqliteKvStore::in_memory().await.unwrap();
        store.set("a", "old").await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_bad BEFORE INSERT ON kv WHEN NEW.key = 'bad' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let result = store
            .set_many(&[("a", "new".to_string()), ("bad", "x".to_string())])
            .await;
        assert!(matches!(result, Err(DbError::Sqlx(_))));

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("old"));
        assert_eq!(store.get("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let path = path.to_string_lossy().to_string();

        let store = SqliteKvStore::new(&path).await.unwrap();
        store.set("catalog.videos", "[]").await.unwrap();
        store.close().await;

        let store = SqliteKvStore::new(&path).await.unwrap();
        assert_eq!(
            store.get("catalog.videos").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
