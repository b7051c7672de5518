//! Secure Storage Abstraction
//!
//! Session-scoped credential persistence. Keys are namespaced by the caller
//! (e.g. `linkedin:tokens:{session}`), values are opaque bytes.

use async_trait::async_trait;

use crate::error::Result;

/// Secure credential storage trait
///
/// Backends range from an in-process map (single server instance) to an
/// encrypted external store shared by several instances.
///
/// # Security Requirements
///
/// Implementations MUST:
/// - Never log or expose stored values
/// - Replace a previous value atomically on `set_secret`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn store_token(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("oauth_token", token.as_bytes()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value for `key`
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }

    /// List all stored keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove and return a secret in one step.
    ///
    /// The default is not atomic; backends that can do better should override it.
    async fn take_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.get_secret(key).await?;
        if value.is_some() {
            self.delete_secret(key).await?;
        }
        Ok(value)
    }
}
