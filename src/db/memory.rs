use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::repo::*;

/// Process-local substrate. Nothing is persisted across restarts.
#[derive(Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following read fail with `DbError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every following write fail with `DbError::Unavailable`, the way
    /// a full disk or an exceeded quota would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> DbResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("read rejected".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> DbResult<Option<String>> {
        self.check_readable()?;
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.check_writable()?;
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DbResult<()> {
        self.check_writable()?;
        let mut values = self.values.write().await;
        values.remove(key);
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> DbResult<()> {
        self.check_writable()?;
        let mut values = self.values.write().await;
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let store = MemoryKvStore::new();
        store.set("a", "old").await.unwrap();

        store.set_fail_writes(true);
        let result = store
            .set_many(&[("a", "new".to_string()), ("b", "new".to_string())])
            .await;
        assert!(matches!(result, Err(DbError::Unavailable(_))));

        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("old"));
        assert_eq!(store.get("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_read() {
        let store = MemoryKvStore::new();
        store.set("a", "1").await.unwrap();

        store.set_fail_reads(true);
        assert!(matches!(store.get("a").await, Err(DbError::Unavailable(_))));
        assert!(store.contains("a").await.is_err());

        store.set_fail_reads(false);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }
}
