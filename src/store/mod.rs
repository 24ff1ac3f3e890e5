//! Session storage backends.
//!
//! The store is a key-value service mapping session identifiers to
//! [`SessionEnvelope`] records with a TTL. Redis is the production
//! backend; the in-memory store serves development and tests.

mod in_memory;
mod redis;

pub use in_memory::InMemorySessionStore;
pub use redis::RedisSessionStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::session::SessionEnvelope;

/// Key-value storage for session envelopes.
///
/// Writes are last-writer-wins with no optimistic concurrency: a session
/// is effectively single-writer per identifier within one request, and
/// concurrent requests bearing the same cookie race by design (callers
/// must not rely on read-modify-write sequences in the session bucket).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Check whether an entry exists for the identifier.
    async fn exists(&self, session_id: &str) -> Result<bool>;

    /// Load the envelope for the identifier.
    ///
    /// Returns `Ok(None)` when the entry is absent or its stored content
    /// fails to deserialize; corrupt entries are treated as absent, never
    /// surfaced as parse errors.
    async fn load(&self, session_id: &str) -> Result<Option<SessionEnvelope>>;

    /// Upsert the envelope with a refreshed TTL.
    async fn save(&self, session_id: &str, envelope: &SessionEnvelope, ttl: Duration)
        -> Result<()>;

    /// Delete the entry. Deleting a non-existent key is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;
}

/// Storage key for a session identifier.
pub(crate) fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}
