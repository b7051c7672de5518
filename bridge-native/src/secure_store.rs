//! In-process secure storage

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::SecureStore};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Map-backed secret store for a single server instance.
///
/// Values live only in process memory and vanish on restart, which matches the
/// lifetime of a browser session cookie signed with an ephemeral key.
#[derive(Default)]
pub struct MemorySecureStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        debug!(key = key, "Stored secret");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        if self.entries.write().await.remove(key).is_some() {
            debug!(key = key, "Deleted secret");
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn take_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.write().await.remove(key))
    }
}
