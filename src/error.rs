//! Error types for the bootstrap run
//!
//! `ProvisionError` is the fatal taxonomy surfaced to the operator.
//! `GoogleApiError` is a parsed non-2xx response from a Google REST API;
//! call sites inspect it for the expected 404/409 cases before turning it
//! into a `ProvisionError`.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

const API_HINT: &str = "check that the Cloud Resource Manager, IAM and Cloud Storage APIs are \
                        enabled and that your account has permission on the project";

/// Errors that abort a bootstrap run
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Empty or otherwise unusable project id
    #[error("Invalid project ID: {0}")]
    InvalidProjectId(String),

    /// No usable application-default credentials
    #[error(
        "Authentication failed: {0}. Run 'gcloud auth application-default login' and try again"
    )]
    Authentication(String),

    /// 403 or a disabled API
    #[error("{context}: {message} (hint: {hint})", hint = API_HINT)]
    PermissionOrApi { context: String, message: String },

    /// Quota or key-count limit reached
    #[error("{context}: {message}")]
    Quota { context: String, message: String },

    /// Neither candidate bucket name is usable by this project
    #[error(
        "Bucket names '{shared}' and '{fallback}' are both taken by other projects; \
         refusing to pick one for project {project}"
    )]
    BucketOwnershipConflict {
        shared: String,
        fallback: String,
        project: String,
    },

    /// Any other provider failure
    #[error("{context}: {message}")]
    Api { context: String, message: String },

    /// Writing the key file failed
    #[error("Failed to write key file {}: {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn api(context: impl Into<String>, message: impl ToString) -> Self {
        ProvisionError::Api {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// A failed Google API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleApiError {
    /// HTTP status code
    pub http_status: u16,
    /// Canonical status string (`ALREADY_EXISTS`, `PERMISSION_DENIED`, ...)
    /// when the API reports one. Cloud Storage does not.
    pub status: Option<String>,
    /// Human readable message from the API
    pub message: String,
}

impl GoogleApiError {
    /// Parse a `{"error": {...}}` body, falling back to the raw text
    pub fn from_body(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self {
                http_status,
                status: envelope.error.status,
                message: if envelope.error.message.is_empty() {
                    format!("HTTP {}", http_status)
                } else {
                    envelope.error.message
                },
            },
            Err(_) => {
                let trimmed = body.trim();
                Self {
                    http_status,
                    status: None,
                    message: if trimmed.is_empty() {
                        format!("HTTP {}", http_status)
                    } else {
                        trimmed.to_string()
                    },
                }
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.http_status == 409
    }

    pub fn is_forbidden(&self) -> bool {
        self.http_status == 403
    }

    fn has_status(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    pub fn is_quota(&self) -> bool {
        self.http_status == 429 || self.has_status("RESOURCE_EXHAUSTED")
    }

    pub fn is_failed_precondition(&self) -> bool {
        self.has_status("FAILED_PRECONDITION")
    }

    /// Classify into the fatal taxonomy
    pub fn into_error(self, context: impl Into<String>) -> ProvisionError {
        let context = context.into();
        let message = self.message.clone();

        if self.http_status == 401 || self.has_status("UNAUTHENTICATED") {
            ProvisionError::Authentication(message)
        } else if self.is_forbidden()
            || self.has_status("PERMISSION_DENIED")
            || self.has_status("SERVICE_DISABLED")
        {
            ProvisionError::PermissionOrApi { context, message }
        } else if self.is_quota() {
            ProvisionError::Quota { context, message }
        } else {
            ProvisionError::Api { context, message }
        }
    }
}

impl std::fmt::Display for GoogleApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} {}: {}", self.http_status, status, self.message),
            None => write!(f, "{}: {}", self.http_status, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iam_error_body() {
        let body = r#"{"error": {"code": 409, "message": "Service account binge-plus-sa already exists within project projects/demo.", "status": "ALREADY_EXISTS"}}"#;
        let err = GoogleApiError::from_body(409, body);

        assert!(err.is_conflict());
        assert_eq!(err.status.as_deref(), Some("ALREADY_EXISTS"));
        assert!(err.message.contains("already exists"));
    }

    #[test]
    fn test_parse_storage_error_body_without_status() {
        let body = r#"{"error": {"code": 409, "message": "The requested bucket name is not available.", "errors": [{"reason": "conflict"}]}}"#;
        let err = GoogleApiError::from_body(409, body);

        assert_eq!(err.status, None);
        assert_eq!(err.message, "The requested bucket name is not available.");
    }

    #[test]
    fn test_parse_non_json_body() {
        let err = GoogleApiError::from_body(502, "  Bad Gateway \n");
        assert_eq!(err.message, "Bad Gateway");

        let err = GoogleApiError::from_body(500, "");
        assert_eq!(err.message, "HTTP 500");
    }

    #[test]
    fn test_classification() {
        let forbidden = GoogleApiError::from_body(
            403,
            r#"{"error": {"code": 403, "message": "Identity and Access Management (IAM) API has not been used in project 1 before or it is disabled.", "status": "PERMISSION_DENIED"}}"#,
        );
        assert!(matches!(
            forbidden.into_error("create service account"),
            ProvisionError::PermissionOrApi { .. }
        ));

        let unauthenticated = GoogleApiError::from_body(401, "");
        assert!(matches!(
            unauthenticated.into_error("x"),
            ProvisionError::Authentication(_)
        ));

        let quota = GoogleApiError::from_body(
            429,
            r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(quota.into_error("x"), ProvisionError::Quota { .. }));

        let other = GoogleApiError::from_body(500, "boom");
        match other.into_error("get policy") {
            ProvisionError::Api { context, message } => {
                assert_eq!(context, "get policy");
                assert_eq!(message, "boom");
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_permission_error_carries_hint() {
        let err = ProvisionError::PermissionOrApi {
            context: "create bucket".into(),
            message: "denied".into(),
        };
        let text = err.to_string();
        assert!(text.starts_with("create bucket: denied"));
        assert!(text.contains("APIs are enabled"));
    }
}
