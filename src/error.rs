//! Error taxonomy for outbound API calls and tool dispatch.
//!
//! Every failure of a logical request is surfaced as an `ApiError` variant.
//! `ToolError` adds the failures that happen before any request is made.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Required connection parameters are absent or unusable for an environment.
    #[error("environment '{environment}' is not usable: {reason}")]
    Configuration { environment: String, reason: String },

    /// Token fetch failed, or the request was rejected again after reauthentication.
    #[error("authentication failed for {endpoint}{}: {message}", fmt_status(.status))]
    Auth {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },

    /// A retryable status persisted after the retry budget was spent.
    #[error("{endpoint} still failing with status {status} after {attempts} attempts: {body}")]
    Transient {
        endpoint: String,
        status: u16,
        body: String,
        attempts: u32,
    },

    /// Non-retryable error status.
    #[error("{endpoint} failed with status {status}: {message}")]
    Permanent {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Transport failure without a status code.
    #[error("network error calling {endpoint} after {attempts} attempts: {message}")]
    Network {
        endpoint: String,
        message: String,
        attempts: u32,
    },
}

impl ApiError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Configuration { .. } => "configuration",
            ApiError::Auth { .. } => "auth",
            ApiError::Transient { .. } => "transient",
            ApiError::Permanent { .. } => "permanent",
            ApiError::Network { .. } => "network",
        }
    }

    /// Last observed HTTP status, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. } => *status,
            ApiError::Transient { status, .. } | ApiError::Permanent { status, .. } => Some(*status),
            ApiError::Configuration { .. } | ApiError::Network { .. } => None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("Environment '{name}' not configured. Available: {}", .available.join(", "))]
    UnknownEnvironment { name: String, available: Vec<String> },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::UnknownEnvironment { .. } => "unknown_environment",
            ToolError::Api(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_endpoint_and_status() {
        let err = ApiError::Transient {
            endpoint: "POST /api/projects/search".into(),
            status: 503,
            body: "busy".into(),
            attempts: 4,
        };
        let text = err.to_string();
        assert!(text.contains("POST /api/projects/search"));
        assert!(text.contains("503"));
        assert!(text.contains("4 attempts"));
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.kind(), "transient");

        let auth = ApiError::Auth {
            endpoint: "GET /api/projects/1".into(),
            status: Some(401),
            message: "rejected after reauthentication".into(),
        };
        assert_eq!(
            auth.to_string(),
            "authentication failed for GET /api/projects/1 (status 401): rejected after reauthentication"
        );
    }

    #[test]
    fn unknown_environment_lists_available() {
        let err = ToolError::UnknownEnvironment {
            name: "staging".into(),
            available: vec!["prod".into(), "test".into()],
        };
        assert_eq!(err.to_string(), "Environment 'staging' not configured. Available: prod, test");
        assert_eq!(err.kind(), "unknown_environment");

        let wrapped: ToolError = ApiError::Network {
            endpoint: "GET /api/projects/list".into(),
            message: "connection refused".into(),
            attempts: 4,
        }
        .into();
        assert_eq!(wrapped.kind(), "network");
        assert!(wrapped.to_string().starts_with("network error calling GET /api/projects/list"));
    }
}
