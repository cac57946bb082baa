use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Closed set of failure categories produced at the HTTP boundary.
///
/// Call sites match on the kind instead of inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    ServerError,
    Network,
}

impl ErrorKind {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::NOT_FOUND => Self::NotFound,
            s if s.is_server_error() => Self::ServerError,
            _ => Self::Validation,
        }
    }

    /// Human-readable reason shown to the user.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Unauthorized => "authentication required",
            Self::Forbidden => "permission denied",
            Self::NotFound => "not found",
            Self::Validation => "request rejected",
            Self::ServerError => "server error",
            Self::Network => "network unreachable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// A categorized failure from the backend or a mock store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Builds the `"<context>: <reason>"` message for a failed response.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let kind = ErrorKind::from_status(status);
        let message = match kind {
            ErrorKind::Validation => format!("{context} ({})", status.as_u16()),
            _ => format!("{context}: {}", kind.reason()),
        };
        Self {
            kind,
            status: Some(status.as_u16()),
            message,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    /// Kind of a remote failure, `None` for local ones (config, IO, input).
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind),
            Self::NotAuthenticated => Some(ErrorKind::Unauthorized),
            Self::Network(_) => Some(ErrorKind::Network),
            Self::Identity(_) => Some(ErrorKind::Unauthorized),
            Self::Input(_) => Some(ErrorKind::Validation),
            Self::Config(_) | Self::Json(_) | Self::Io(_) => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.kind() == Some(ErrorKind::Unauthorized)
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ErrorKind::from_status(StatusCode::UNAUTHORIZED),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::FORBIDDEN),
            ErrorKind::Forbidden
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::NOT_FOUND),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::BAD_GATEWAY),
            ErrorKind::ServerError
        );
        assert_eq!(
            ErrorKind::from_status(StatusCode::CONFLICT),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "Failed to delete SSH key");
        assert_eq!(err.to_string(), "Failed to delete SSH key: permission denied");
        assert_eq!(err.status, Some(403));

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch templates");
        assert_eq!(err.to_string(), "Failed to fetch templates: server error");

        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "Failed to create template");
        assert_eq!(err.to_string(), "Failed to create template (422)");
    }

    #[test]
    fn test_store_messages_are_verbatim() {
        let err: TallyError = ApiError::validation("Template for repository already exists").into();
        assert_eq!(err.to_string(), "Template for repository already exists");
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
    }

    #[test]
    fn test_auth_failures() {
        assert!(TallyError::NotAuthenticated.is_auth_failure());
        let err: TallyError = ApiError::from_status(StatusCode::UNAUTHORIZED, "x").into();
        assert!(err.is_auth_failure());
        assert!(!TallyError::Config("bad".into()).is_auth_failure());
    }
}
