use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, TidegateError};
use crate::session::SessionEnvelope;
use crate::store::{SessionStore, session_key};

/// Redis-backed session store.
///
/// Entries live under `session:{id}` as JSON with a server-side TTL. All
/// operations are single-attempt: a connectivity or command failure
/// propagates as [`TidegateError::ServiceUnavailable`] rather than being
/// retried, since a retried write could resurrect a stale TTL.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    /// Create a store from a connection URL.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            TidegateError::internal(format!("Failed to create Redis client: {}", e))
        })?;
        Ok(Self { client })
    }

    /// Create a store from an existing client.
    pub fn from_client(client: redis::Client) -> Self {
        Self { client }
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                TidegateError::service_unavailable(format!("Failed to get Redis connection: {}", e))
            })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn exists(&self, session_id: &str) -> Result<bool> {
        let mut conn = self.get_connection().await?;

        let exists: bool = redis::cmd("EXISTS")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| TidegateError::service_unavailable(format!("Redis EXISTS failed: {}", e)))?;

        Ok(exists)
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionEnvelope>> {
        let mut conn = self.get_connection().await?;

        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| TidegateError::service_unavailable(format!("Redis GET failed: {}", e)))?;

        let Some(bytes) = data else {
            return Ok(None);
        };

        // A corrupt entry is treated as absent; the middleware will issue
        // a fresh session in its place.
        match serde_json::from_slice(&bytes) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Discarding undecodable session entry"
                );
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        session_id: &str,
        envelope: &SessionEnvelope,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let payload = serde_json::to_vec(envelope).map_err(|e| {
            TidegateError::internal(format!("Failed to serialize session envelope: {}", e))
        })?;

        redis::cmd("SET")
            .arg(session_key(session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| TidegateError::service_unavailable(format!("Redis SET failed: {}", e)))?;

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;

        redis::cmd("DEL")
            .arg(session_key(session_id))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| TidegateError::service_unavailable(format!("Redis DEL failed: {}", e)))?;

        Ok(())
    }
}
