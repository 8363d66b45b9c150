//! Gateway Error Types
//!
//! Every failure a request can end in. Components return [`GatewayResult`];
//! the HTTP layer turns a [`GatewayError`] into a status code and a plain-text
//! body through its `IntoResponse` impl.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::admission::AdmissionRejection;

/// Challenge sent with every 401
pub const BASIC_CHALLENGE: &str = "Basic realm=\"Authorization Required\"";

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error types for gateway operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Missing or mismatched credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed payload; the message is surfaced verbatim
    #[error("{0}")]
    Validation(String),

    /// Application disabled or out of quota
    #[error("{0}")]
    Admission(AdmissionRejection),

    /// Unknown message or application
    #[error("{0}")]
    NotFound(String),

    /// Name collision in the application directory
    #[error("{0}")]
    Conflict(String),

    /// Underlying persistence failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Validation(_)
            | GatewayError::Admission(_)
            | GatewayError::Conflict(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable label, used for metrics and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::Validation(_) => "invalid",
            GatewayError::Admission(rejection) => rejection.reason.as_str(),
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Conflict(_) => "conflict",
            GatewayError::Storage(_) => "storage_error",
        }
    }

    /// Body sent to the client. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, error_code = self.error_code(), "Request failed");
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error_code = self.error_code(), "Authentication failed");
        } else {
            tracing::debug!(error = %self, error_code = self.error_code(), "Request rejected");
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log();

        let mut response = (self.status_code(), self.user_message()).into_response();
        if matches!(self, GatewayError::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_CHALLENGE),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::RejectionReason;
    use crate::directory::ApplicationName;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GatewayError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::Storage("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = GatewayError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            BASIC_CHALLENGE
        );
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = GatewayError::Storage("connection reset by peer".into());
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_admission_message_is_verbatim() {
        let err = GatewayError::Admission(AdmissionRejection {
            reason: RejectionReason::Disabled,
            application: ApplicationName::parse("MyApp").unwrap(),
        });
        assert_eq!(
            err.user_message(),
            "Unable to send sms as application 'myapp' has been disabled"
        );
        assert_eq!(err.error_code(), "disabled");
    }
}
