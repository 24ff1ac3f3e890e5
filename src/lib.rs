//! Tidegate - session and authorization middleware for axum
//!
//! Tidegate authenticates HTTP clients through signed session cookies
//! backed by a server-side key-value store, and authorizes the resolved
//! subject through a flat role/permission model.
//!
//! # Features
//!
//! - **Sessions**: signed-cookie session middleware with a Redis-backed
//!   store and deterministic handling of stale or tampered cookies
//! - **Authorization**: subjects with direct permissions, roles, and a
//!   superuser flag; fail-closed permission checks
//! - **Extractors**: resolve the authenticated subject per request, with
//!   session-level caching in front of the identity store
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use std::sync::Arc;
//! use tidegate::{RedisSessionStore, SessionConfig, SessionMiddleware};
//!
//! #[tokio::main]
//! async fn main() -> tidegate::Result<()> {
//!     tidegate::init_tracing();
//!
//!     let store = Arc::new(RedisSessionStore::new("redis://127.0.0.1/")?);
//!     let sessions = SessionMiddleware::new(SessionConfig::from_env(), store)?;
//!
//!     let app: Router = Router::new()
//!         .route("/", get(|| async { "hello" }))
//!         .layer(axum::middleware::from_fn(move |request, next| {
//!             let sessions = sessions.clone();
//!             async move { sessions.handle(request, next).await }
//!         }));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//!     Ok(())
//! }
//! ```

pub mod auth;
mod config;
mod error;
pub mod session;
pub mod store;
pub mod utils;

// Re-exports for public API
pub use auth::{
    CurrentSubject, IdentityProvider, MaybeSubject, PasswordConfig, PasswordHasher, Permission,
    Role, SUBJECT_SESSION_KEY, Subject,
};
pub use config::{SessionConfig, SkipHeader};
pub use error::{Result, TidegateError};
pub use session::{CookieSigner, Session, SessionEnvelope, SessionMiddleware, VerifyError};
pub use store::{InMemorySessionStore, RedisSessionStore, SessionStore};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// Call early in your application, before constructing the middleware.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "tidegate=debug")
/// - `TIDEGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("TIDEGATE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
