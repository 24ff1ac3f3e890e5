use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for tidegate operations
#[derive(Debug, thiserror::Error)]
pub enum TidegateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An authorization failure from a permission check.
    ///
    /// Distinct from [`TidegateError::Unauthorized`]: the subject was
    /// authenticated but lacks one or more required permissions. Carries
    /// the permission names that were required so the response (and the
    /// server-side log) can say which check failed.
    #[error("Permission denied: requires {}", .required.join(", "))]
    PermissionDenied { required: Vec<String> },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response body for API errors
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    error_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_permissions: Option<Vec<String>>,
}

impl TidegateError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Build a permission-denied error from the permission names that
    /// were required for the failed check.
    pub fn permission_denied(required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::PermissionDenied {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns a message suitable for client responses.
    ///
    /// Client errors (4xx) expose their message since the caller needs to
    /// know what went wrong. Server errors (5xx) return a generic message;
    /// the full details are logged server-side only (CWE-209).
    fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::BadRequest(msg) => format!("Bad request: {}", msg),
            Self::Unauthorized(msg) => format!("Unauthorized: {}", msg),
            Self::Forbidden(msg) => format!("Forbidden: {}", msg),
            Self::PermissionDenied { .. } => self.to_string(),

            Self::Internal(_) => "Internal server error".to_string(),
            Self::Anyhow(_) => "Internal server error".to_string(),
            Self::ServiceUnavailable(_) => "Service unavailable".to_string(),
        }
    }
}

impl IntoResponse for TidegateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        let required_permissions = match &self {
            Self::PermissionDenied { required } => Some(required.clone()),
            _ => None,
        };

        // Full error details stay in the server logs
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: self.safe_message(),
            error_id,
            required_permissions,
        });

        (status, body).into_response()
    }
}

/// Result type alias for tidegate operations
pub type Result<T> = std::result::Result<T, TidegateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = TidegateError::not_found("Session not found");
        assert!(matches!(err, TidegateError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Session not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unauthorized_error() {
        let err = TidegateError::unauthorized("Not authenticated");
        assert!(matches!(err, TidegateError::Unauthorized(_)));
        assert_eq!(err.to_string(), "Unauthorized: Not authenticated");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_permission_denied_error() {
        let err = TidegateError::permission_denied(["posts:write", "posts:delete"]);
        assert_eq!(
            err.to_string(),
            "Permission denied: requires posts:write, posts:delete"
        );
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_permission_denied_distinct_from_unauthorized() {
        // Authentication failure and authorization failure must map to
        // different response classes
        let unauthenticated = TidegateError::unauthorized("No subject");
        let unauthorized = TidegateError::permission_denied(["admin"]);
        assert_ne!(unauthenticated.status_code(), unauthorized.status_code());
    }

    #[test]
    fn test_service_unavailable_error() {
        let err = TidegateError::service_unavailable("Redis is down");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_anyhow_error() {
        let anyhow_err = anyhow::anyhow!("Something unexpected");
        let err: TidegateError = anyhow_err.into();
        assert!(matches!(err, TidegateError::Anyhow(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_safe_message_client_errors_exposed() {
        assert_eq!(
            TidegateError::unauthorized("Token expired").safe_message(),
            "Unauthorized: Token expired"
        );
        assert_eq!(
            TidegateError::forbidden("Admin only").safe_message(),
            "Forbidden: Admin only"
        );
    }

    #[test]
    fn test_safe_message_server_errors_hidden() {
        assert_eq!(
            TidegateError::internal("Connection to db-prod-01:5432 failed").safe_message(),
            "Internal server error"
        );
        assert_eq!(
            TidegateError::service_unavailable("Redis at cache.internal:6379 unreachable")
                .safe_message(),
            "Service unavailable"
        );
    }

    #[tokio::test]
    async fn test_into_response_permission_denied_lists_permissions() {
        let err = TidegateError::permission_denied(["posts:write"]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["required_permissions"][0], "posts:write");
        assert!(json["error_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_into_response_hides_internal_details() {
        let err = TidegateError::internal("Sensitive: store password is 'secret123'");
        let response = err.into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret123"));
    }
}
