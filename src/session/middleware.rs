//! Session middleware
//!
//! Runs on every request: derives or validates the session identifier
//! from the incoming cookie, attaches a [`Session`] to the request
//! extensions, invokes the downstream handler, then persists the session
//! and manages the outgoing cookie.
//!
//! Per request, exactly one of four entry states applies:
//!
//! - no cookie: create a new session, mark it for cookie issuance
//! - cookie verifies, store entry missing: the entry was evicted or
//!   expired; create a new session (the orphaned cookie is superseded)
//! - cookie verifies, store entry present: load the existing session
//! - cookie fails verification: create a new session
//!
//! On the way out the middleware persists the envelope with a refreshed
//! TTL and sets the signed cookie when one was issued. A session cleared
//! during the request instead gets a cookie-deletion instruction, and
//! clearing always wins over issuance when both could apply.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, SameSite};
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::{Result, TidegateError};
use crate::session::context::Session;
use crate::session::signer::CookieSigner;
use crate::store::SessionStore;

/// Session middleware for axum routers.
///
/// Cheap to clone; the configuration, signer, and store handle are
/// shared. Everything else is request-scoped.
///
/// # Example
///
/// ```rust,ignore
/// use axum::Router;
/// use tidegate::{SessionConfig, SessionMiddleware, RedisSessionStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(RedisSessionStore::new("redis://127.0.0.1/")?);
/// let sessions = SessionMiddleware::new(SessionConfig::from_env(), store)?;
///
/// let app: Router = Router::new()
///     .layer(axum::middleware::from_fn(move |request, next| {
///         let sessions = sessions.clone();
///         async move { sessions.handle(request, next).await }
///     }));
/// ```
#[derive(Clone)]
pub struct SessionMiddleware {
    config: Arc<SessionConfig>,
    signer: Arc<CookieSigner>,
    store: Arc<dyn SessionStore>,
}

impl SessionMiddleware {
    /// Create the middleware from a configuration and a store handle.
    ///
    /// # Errors
    ///
    /// Fails fast when the configuration carries no signing secret.
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let signer = CookieSigner::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            store,
        })
    }

    /// Handle one request.
    ///
    /// Suitable for `axum::middleware::from_fn`. Store faults propagate
    /// and map to a service-unavailable response; cookie verification
    /// failures never do (they issue a fresh session instead).
    pub async fn handle(self, mut request: Request, next: Next) -> Result<Response> {
        if self.should_skip(request.headers()) {
            tracing::debug!("Skip header matched; bypassing session handling");
            return Ok(next.run(request).await);
        }

        let (session, needs_cookie) = self.open_session(request.headers()).await?;
        request.extensions_mut().insert(session.clone());

        let mut response = next.run(request).await;

        // Exit path. `next.run` yields a response even when the handler
        // errored, so the session is always synced against what the
        // client's cookie will claim.
        if session.is_cleared().await {
            // A session cleared mid-request wins over cookie issuance.
            tracing::debug!(session_id = %session.id(), "Session cleared; deleting cookie");
            append_set_cookie(&mut response, self.removal_cookie())?;
        } else {
            session.save().await?;
            if needs_cookie {
                append_set_cookie(&mut response, self.issue_cookie(session.id()))?;
            }
        }

        Ok(response)
    }

    /// Resolve the entry state and produce the request's session plus
    /// whether a new cookie must be issued.
    async fn open_session(&self, headers: &HeaderMap) -> Result<(Session, bool)> {
        let Some(raw) = self.session_cookie(headers) else {
            tracing::info!("No session cookie presented; creating a new session");
            return Ok((self.create_session("new").await, true));
        };

        match self.signer.verify(&raw) {
            Ok(session_id) => {
                if self.store.exists(&session_id).await? {
                    let session = Session::resume(
                        session_id.clone(),
                        self.store.clone(),
                        self.config.ttl(),
                    );
                    session.load().await?;
                    if session.is_cleared().await {
                        // The entry vanished (or was corrupt) between the
                        // existence check and the load; same treatment as
                        // a missing entry.
                        tracing::info!(
                            session_id = %session_id,
                            "Store entry unreadable; creating a new session"
                        );
                        return Ok((self.create_session("stale store").await, true));
                    }
                    tracing::debug!(session_id = %session_id, "Resumed existing session");
                    session.set_cause("resumed").await;
                    Ok((session, false))
                } else {
                    tracing::info!(
                        session_id = %session_id,
                        "Valid session cookie but no store entry; creating a new session"
                    );
                    Ok((self.create_session("stale store").await, true))
                }
            }
            Err(err) => {
                tracing::info!(error = %err, "Session cookie failed verification; creating a new session");
                Ok((
                    self.create_session(&format!("renewed after {}", err)).await,
                    true,
                ))
            }
        }
    }

    async fn create_session(&self, cause: &str) -> Session {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(session_id = %session_id, cause = %cause, "Created new session");
        let session = Session::fresh(session_id, self.store.clone(), self.config.ttl());
        session.set_cause(cause).await;
        session
    }

    /// Whether any configured skip header matches the request.
    fn should_skip(&self, headers: &HeaderMap) -> bool {
        self.config.skip_headers.iter().any(|skip| {
            match headers
                .get(skip.header_name.as_str())
                .and_then(|v| v.to_str().ok())
            {
                Some(value) => skip.header_value == "*" || value == skip.header_value,
                None => false,
            }
        })
    }

    /// Extract this middleware's cookie value from the Cookie header(s).
    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(std::result::Result::ok)
            .find(|cookie| cookie.name() == self.config.cookie_name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Build the signed Set-Cookie for a newly issued session.
    fn issue_cookie(&self, session_id: &str) -> Cookie<'static> {
        let signed = self.signer.sign(session_id);

        let mut builder = Cookie::build((self.config.cookie_name.clone(), signed))
            .path(self.config.cookie_path.clone())
            .http_only(self.config.cookie_http_only)
            .secure(self.config.cookie_secure)
            .same_site(SameSite::Lax);

        if self.config.cookie_max_age_seconds > 0 {
            builder = builder.max_age(cookie::time::Duration::seconds(
                self.config.cookie_max_age_seconds as i64,
            ));
        }

        builder.build()
    }

    /// Build the cookie-deletion instruction for a cleared session.
    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), ""))
            .path(self.config.cookie_path.clone())
            .http_only(self.config.cookie_http_only)
            .secure(self.config.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::ZERO)
            .build()
    }
}

fn append_set_cookie(response: &mut Response, cookie: Cookie<'static>) -> Result<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| TidegateError::internal(format!("Invalid Set-Cookie value: {}", e)))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SkipHeader;
    use crate::store::InMemorySessionStore;

    fn middleware(config: SessionConfig) -> SessionMiddleware {
        SessionMiddleware::new(config, Arc::new(InMemorySessionStore::new())).unwrap()
    }

    fn test_config() -> SessionConfig {
        SessionConfig::new("0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_missing_secret_rejected() {
        let result =
            SessionMiddleware::new(SessionConfig::default(), Arc::new(InMemorySessionStore::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_should_skip_exact_match() {
        let mut config = test_config();
        config.skip_headers = vec![SkipHeader::new("x-internal", "gateway")];
        let mw = middleware(config);

        let mut headers = HeaderMap::new();
        headers.insert("x-internal", HeaderValue::from_static("gateway"));
        assert!(mw.should_skip(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("x-internal", HeaderValue::from_static("other"));
        assert!(!mw.should_skip(&headers));

        assert!(!mw.should_skip(&HeaderMap::new()));
    }

    #[test]
    fn test_should_skip_wildcard_matches_presence() {
        let mut config = test_config();
        config.skip_headers = vec![SkipHeader::new("x-health-check", "*")];
        let mw = middleware(config);

        let mut headers = HeaderMap::new();
        headers.insert("x-health-check", HeaderValue::from_static("anything"));
        assert!(mw.should_skip(&headers));

        assert!(!mw.should_skip(&HeaderMap::new()));
    }

    #[test]
    fn test_session_cookie_extraction() {
        let mw = middleware(test_config());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; sid=signed-value; theme=dark"),
        );
        assert_eq!(mw.session_cookie(&headers), Some("signed-value".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(mw.session_cookie(&headers), None);
    }

    #[test]
    fn test_issue_cookie_attributes() {
        let mw = middleware(test_config());
        let cookie = mw.issue_cookie("session-1");

        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        // max_age 0 config means a session cookie with no Max-Age
        assert_eq!(cookie.max_age(), None);

        // The value verifies back to the session identifier
        let signer = CookieSigner::new(&test_config()).unwrap();
        assert_eq!(signer.verify(cookie.value()), Ok("session-1".to_string()));
    }

    #[test]
    fn test_issue_cookie_with_max_age() {
        let mut config = test_config();
        config.cookie_max_age_seconds = 3600;
        let mw = middleware(config);

        let cookie = mw.issue_cookie("session-1");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::seconds(3600)));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let mw = middleware(test_config());
        let cookie = mw.removal_cookie();

        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
    }

    #[tokio::test]
    async fn test_create_session_records_cause() {
        let mw = middleware(test_config());
        let session = mw.create_session("new").await;
        assert_eq!(session.cause().await.as_deref(), Some("new"));
        assert!(!session.is_cleared().await);
    }

    #[tokio::test]
    async fn test_created_session_ids_are_unique() {
        let mw = middleware(test_config());
        let a = mw.create_session("new").await;
        let b = mw.create_session("new").await;
        assert_ne!(a.id(), b.id());
    }
}
