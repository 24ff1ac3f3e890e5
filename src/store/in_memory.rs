use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::session::SessionEnvelope;
use crate::store::SessionStore;

/// In-memory session store.
///
/// Stores envelopes in a HashMap with per-entry expiry. Suitable for
/// development and testing; sessions are lost on restart and not shared
/// across instances.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

#[derive(Clone)]
struct Entry {
    envelope: SessionEnvelope,
    expires_at: SystemTime,
}

impl Entry {
    fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let initial_len = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        initial_len - entries.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn exists(&self, session_id: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(session_id)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionEnvelope>> {
        let entries = self.entries.read().await;
        match entries.get(session_id) {
            Some(entry) if entry.is_expired() => {
                drop(entries);
                self.entries.write().await.remove(session_id);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.envelope.clone())),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        envelope: &SessionEnvelope,
        ttl: Duration,
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            session_id.to_string(),
            Entry {
                envelope: envelope.clone(),
                expires_at: SystemTime::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(session_id);
        Ok(())
    }
}
