//! Identity lookup collaborator.

use async_trait::async_trait;

use crate::auth::subject::Subject;
use crate::error::Result;

/// Resolves subjects from the persistence layer.
///
/// Implementations must return subjects with their direct permissions and
/// roles (and each role's permissions) already loaded, so permission
/// resolution never triggers additional queries mid-check.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the subject owning a session token.
    ///
    /// Returns `Ok(None)` when the token maps to no subject; that is an
    /// unauthenticated request, not a fault.
    async fn find_by_session_token(&self, token: &str) -> Result<Option<Subject>>;

    /// Look up a subject by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<Subject>>;
}
