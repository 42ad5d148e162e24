//! User-management client errors.

use std::fmt;

use cosi_core::CoreError;
use cosi_xml::XmlError;

/// Backend error codes that callers may treat as "already absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentinel {
    /// The user or access key does not exist.
    NoSuchEntity,
}

impl Sentinel {
    /// Backend error code of this sentinel.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NoSuchEntity => "NoSuchEntity",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors returned by the user-management client.
#[derive(Debug, thiserror::Error)]
pub enum UserClientError {
    /// The endpoint is empty.
    #[error("endpoint is empty")]
    EmptyEndpoint,

    /// The endpoint is not a valid URL.
    #[error("url parse endpoint [{endpoint}] failed: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The access key is empty.
    #[error("access key is empty")]
    EmptyAccessKey,

    /// The secret key is empty.
    #[error("secret key is empty")]
    EmptySecretKey,

    /// A call was made without parameters.
    #[error("enter param is empty")]
    EmptyParams,

    /// Building the HTTP client failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request could not be sent or its body read.
    #[error("{action} call failed: {source}")]
    Transport {
        /// The `Action` parameter of the call.
        action: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with an error envelope.
    #[error("{action} failed: code is [{code}], msg is [{message}], requestId is [{request_id}]")]
    Backend {
        /// The `Action` parameter of the call.
        action: String,
        /// HTTP status code.
        status: u16,
        /// Backend error code.
        code: String,
        /// Backend message.
        message: String,
        /// Backend request id.
        request_id: String,
    },

    /// The backend answered with an error status and a body that is not an
    /// error envelope.
    #[error("{action} failed with status {status}, undecodable body [{body}]: {source}")]
    UndecodableError {
        /// The `Action` parameter of the call.
        action: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
        /// Why decoding failed.
        #[source]
        source: XmlError,
    },

    /// A success body did not match the expected document.
    #[error("decode {action} response failed: {source}")]
    Xml {
        /// The `Action` parameter of the call.
        action: String,
        /// Underlying error.
        #[source]
        source: XmlError,
    },
}

impl UserClientError {
    /// Backend error code, if the backend reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether this error is the backend reporting `sentinel`.
    #[must_use]
    pub fn is_sentinel(&self, sentinel: Sentinel) -> bool {
        self.code() == Some(sentinel.code())
    }
}

/// Convenience result type for user-management operations.
pub type UserResult<T> = Result<T, UserClientError>;

/// The deprovisioning step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStep {
    /// Listing the user's access keys.
    ListAccessKeys,
    /// Deleting one access key.
    DeleteAccessKey,
    /// Deleting the user.
    DeleteUser,
}

impl fmt::Display for RemovalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListAccessKeys => "list access keys",
            Self::DeleteAccessKey => "delete access key",
            Self::DeleteUser => "delete user",
        })
    }
}

/// Partial-failure result of removing a user.
///
/// Every step is idempotent, so retrying the removal re-lists the keys and
/// resumes from `remaining_keys`.
#[derive(Debug, thiserror::Error)]
#[error(
    "remove user [{user}] failed at step [{step}], deleted keys {deleted_keys:?}, remaining keys {remaining_keys:?}: {source}"
)]
pub struct RemovalError {
    /// The user being removed.
    pub user: String,
    /// The step that failed.
    pub step: RemovalStep,
    /// Access keys deleted before the failure.
    pub deleted_keys: Vec<String>,
    /// Access keys still present, the failing one first.
    pub remaining_keys: Vec<String>,
    /// The backend error.
    #[source]
    pub source: UserClientError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(code: &str) -> UserClientError {
        UserClientError::Backend {
            action: "GetUser".to_owned(),
            status: 404,
            code: code.to_owned(),
            message: "not found".to_owned(),
            request_id: "req-1".to_owned(),
        }
    }

    #[test]
    fn test_should_match_sentinel_by_code() {
        assert!(backend("NoSuchEntity").is_sentinel(Sentinel::NoSuchEntity));
        assert!(!backend("AccessDenied").is_sentinel(Sentinel::NoSuchEntity));
        assert!(!UserClientError::EmptyParams.is_sentinel(Sentinel::NoSuchEntity));
    }

    #[test]
    fn test_should_render_backend_error_with_context() {
        let msg = backend("NoSuchEntity").to_string();
        assert!(msg.contains("GetUser"));
        assert!(msg.contains("[NoSuchEntity]"));
        assert!(msg.contains("[req-1]"));
    }

    #[test]
    fn test_should_render_removal_error_with_progress() {
        let err = RemovalError {
            user: "alice".to_owned(),
            step: RemovalStep::DeleteAccessKey,
            deleted_keys: vec!["AK1".to_owned()],
            remaining_keys: vec!["AK2".to_owned()],
            source: backend("InternalError"),
        };
        let msg = err.to_string();
        assert!(msg.contains("[alice]"));
        assert!(msg.contains("delete access key"));
        assert!(msg.contains("AK2"));
    }
}
