//! Axum extractors for resolving the authenticated subject.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::future::Future;
use std::sync::Arc;

use crate::auth::provider::IdentityProvider;
use crate::auth::subject::Subject;
use crate::error::TidegateError;
use crate::session::Session;

/// Session bucket key under which the resolved subject is cached.
pub const SUBJECT_SESSION_KEY: &str = "user";

/// Axum extractor for the authenticated subject.
///
/// Resolution order: the subject cached in the session bucket, then the
/// [`IdentityProvider`] looked up by session token. A successful provider
/// lookup is cached back into the session so subsequent requests skip the
/// persistence call. Rejects with 401 when no subject can be resolved:
/// an authentication failure, distinct from the 403 a failed permission
/// check produces.
///
/// Requires the session middleware, plus the provider installed as
/// `Extension(Arc<dyn IdentityProvider>)`.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(CurrentSubject(subject): CurrentSubject) -> Json<Subject> {
///     Json(subject)
/// }
///
/// async fn delete_post(CurrentSubject(subject): CurrentSubject) -> Result<StatusCode> {
///     subject.can("posts:delete")?;
///     // ...
///     Ok(StatusCode::NO_CONTENT)
/// }
/// ```
pub struct CurrentSubject(pub Subject);

impl<S> FromRequestParts<S> for CurrentSubject
where
    S: Send + Sync,
{
    type Rejection = TidegateError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            let session = parts.extensions.get::<Session>().cloned().ok_or_else(|| {
                TidegateError::internal("Session middleware not installed on this route")
            })?;

            // Cached by a previous request on this session
            if let Some(subject) = session.get::<Subject>(SUBJECT_SESSION_KEY).await? {
                return Ok(CurrentSubject(subject));
            }

            let provider = parts
                .extensions
                .get::<Arc<dyn IdentityProvider>>()
                .cloned()
                .ok_or_else(|| {
                    TidegateError::internal("Identity provider not found in request extensions")
                })?;

            match provider.find_by_session_token(session.id()).await? {
                Some(subject) => {
                    // Cache for future requests on this session
                    session.set(SUBJECT_SESSION_KEY, &subject).await?;
                    Ok(CurrentSubject(subject))
                }
                None => Err(TidegateError::unauthorized("Not authenticated")),
            }
        })
    }
}

/// Axum extractor for optional authentication.
///
/// Returns `Some(subject)` when one can be resolved, `None` otherwise.
/// Never rejects the request.
pub struct MaybeSubject(pub Option<Subject>);

impl<S> FromRequestParts<S> for MaybeSubject
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        Box::pin(async move {
            match CurrentSubject::from_request_parts(parts, state).await {
                Ok(CurrentSubject(subject)) => Ok(MaybeSubject(Some(subject))),
                Err(_) => Ok(MaybeSubject(None)),
            }
        })
    }
}
