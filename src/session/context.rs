//! Per-request session handle.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{Result, TidegateError};
use crate::session::envelope::SessionEnvelope;
use crate::store::SessionStore;

/// The per-request view of one session.
///
/// Cheap to clone; the middleware inserts a clone into the request
/// extensions and keeps its own for the exit path, so mutations made by
/// handlers are visible when the middleware persists.
///
/// The envelope is either present (a live, possibly empty session) or
/// absent. Absent means "no store": either the backing entry was never
/// loaded, or [`Session::clear`] ran. Write operations against an absent
/// envelope fail instead of silently dropping data, since writing to a
/// cleared session is a caller bug.
#[derive(Clone)]
pub struct Session {
    id: Arc<str>,
    store: Arc<dyn SessionStore>,
    ttl: std::time::Duration,
    envelope: Arc<RwLock<Option<SessionEnvelope>>>,
}

impl Session {
    /// Create a brand-new session with an initialized, empty envelope.
    pub fn fresh(
        id: impl Into<String>,
        store: Arc<dyn SessionStore>,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            id: Arc::from(id.into()),
            store,
            ttl,
            envelope: Arc::new(RwLock::new(Some(SessionEnvelope::new()))),
        }
    }

    /// Create a handle for an existing identifier without loading it.
    ///
    /// The envelope stays absent until [`Session::load`] succeeds, which
    /// lets the caller distinguish "not yet loaded / evicted" from
    /// "loaded but empty".
    pub fn resume(
        id: impl Into<String>,
        store: Arc<dyn SessionStore>,
        ttl: std::time::Duration,
    ) -> Self {
        Self {
            id: Arc::from(id.into()),
            store,
            ttl,
            envelope: Arc::new(RwLock::new(None)),
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fetch the envelope from the store.
    ///
    /// If the store has no entry (evicted, expired, or corrupt), the
    /// envelope is left absent.
    pub async fn load(&self) -> Result<()> {
        let loaded = self.store.load(&self.id).await?;
        *self.envelope.write().await = loaded;
        Ok(())
    }

    /// Persist the current envelope with a refreshed TTL.
    ///
    /// A cleared session is not written back; persisting after
    /// [`Session::clear`] would resurrect the deleted entry.
    pub async fn save(&self) -> Result<()> {
        let snapshot = self.envelope.read().await.clone();
        match snapshot {
            Some(envelope) => self.store.save(&self.id, &envelope, self.ttl).await,
            None => {
                tracing::debug!(session_id = %self.id, "Skipping save of cleared session");
                Ok(())
            }
        }
    }

    /// Delete the store entry and mark the in-memory envelope absent.
    ///
    /// The middleware uses the absent state to emit a cookie-deletion
    /// instruction on the way out.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete(&self.id).await?;
        *self.envelope.write().await = None;
        Ok(())
    }

    /// Whether the envelope is in the "no store" state.
    pub async fn is_cleared(&self) -> bool {
        self.envelope.read().await.is_none()
    }

    /// Get a typed value from the session's data bucket.
    ///
    /// Returns `Ok(None)` when the key is absent or the session is
    /// cleared. A stored value that does not deserialize as `T` is a
    /// caller type error and surfaces as such.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let guard = self.envelope.read().await;
        let Some(envelope) = guard.as_ref() else {
            return Ok(None);
        };
        match envelope.get(key) {
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|e| {
                TidegateError::internal(format!("Failed to deserialize session value: {}", e))
            }),
            None => Ok(None),
        }
    }

    /// Set a value in the session's data bucket.
    pub async fn set<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| {
            TidegateError::internal(format!("Failed to serialize session value: {}", e))
        })?;

        let mut guard = self.envelope.write().await;
        match guard.as_mut() {
            Some(envelope) => {
                envelope.insert(key, value);
                Ok(())
            }
            None => Err(invalid_session(&self.id)),
        }
    }

    /// Remove a value from the session's data bucket.
    pub async fn remove(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.envelope.write().await;
        match guard.as_mut() {
            Some(envelope) => Ok(envelope.remove(key)),
            None => Err(invalid_session(&self.id)),
        }
    }

    /// Whether the data bucket contains a key.
    pub async fn contains(&self, key: &str) -> bool {
        self.envelope
            .read()
            .await
            .as_ref()
            .map(|envelope| envelope.contains(key))
            .unwrap_or(false)
    }

    /// Record why this session was issued.
    pub(crate) async fn set_cause(&self, cause: &str) {
        if let Some(envelope) = self.envelope.write().await.as_mut() {
            envelope.set_cause(cause);
        }
    }

    #[cfg(test)]
    pub(crate) async fn cause(&self) -> Option<String> {
        self.envelope
            .read()
            .await
            .as_ref()
            .and_then(|envelope| envelope.cause().map(str::to_string))
    }
}

fn invalid_session(id: &str) -> TidegateError {
    TidegateError::internal(format!(
        "Session '{}' has been cleared; its store can no longer be modified",
        id
    ))
}
