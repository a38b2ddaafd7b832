//! Transient secret storage.
//!
//! Cookie/session mechanics are a collaborator's concern; the engine only
//! sees a namespaced key-value store with TTL. Authorization attempts and
//! token sets live here, isolated per provider by `secret_namespace`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Namespaced key-value store with optional TTL.
///
/// Implementations wrap whatever the application uses for session secrets
/// (cookies, Redis, a database). Values are opaque strings; the engine
/// serializes its records to JSON before handing them over.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<String>>;

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<()>;

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<()>;
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    store: &dyn SecretStore,
    namespace: &str,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.get(namespace, key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string())),
        None => Ok(None),
    }
}

pub(crate) async fn set_json<T: Serialize>(
    store: &dyn SecretStore,
    namespace: &str,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.set(namespace, key, &raw, ttl).await
}

/// Store entry with expiration.
#[derive(Clone, Debug)]
struct StoreEntry {
    data: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoreEntry {
    fn new(data: String, ttl: Option<Duration>) -> StoreResult<Self> {
        let expires_at = ttl
            .map(|duration| {
                chrono::Duration::from_std(duration)
                    .map(|d| Utc::now() + d)
                    .map_err(|e| StoreError::Backend(format!("invalid TTL: {e}")))
            })
            .transpose()?;
        Ok(Self {
            data,
            expires_at,
        })
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() > exp)
    }
}

/// In-memory store implementation.
///
/// Suitable for tests and single-instance deployments; expired entries are
/// cleaned up lazily on read.
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoreEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn scoped_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> StoreResult<Option<String>> {
        let scoped = Self::scoped_key(namespace, key);
        let entries = self.entries.read().await;

        if let Some(entry) = entries.get(&scoped) {
            if entry.is_expired() {
                drop(entries);
                let mut entries = self.entries.write().await;
                entries.remove(&scoped);
                return Ok(None);
            }
            Ok(Some(entry.data.clone()))
        } else {
            Ok(None)
        }
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let entry = StoreEntry::new(value.to_string(), ttl)?;
        let mut entries = self.entries.write().await;
        entries.insert(Self::scoped_key(namespace, key), entry);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&Self::scoped_key(namespace, key));
        Ok(())
    }
}
