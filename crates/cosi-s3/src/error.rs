//! Object-storage client errors.

use cosi_core::CoreError;
use cosi_xml::XmlError;

use crate::tolerance::MissingResource;

/// Errors returned by the object-storage client.
#[derive(Debug, thiserror::Error)]
pub enum S3ClientError {
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

    /// Building the HTTP client failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request could not be sent or its body read.
    #[error("{operation} on bucket [{bucket}] failed: {source}")]
    Transport {
        /// The operation, e.g. `PutBucketPolicy`.
        operation: &'static str,
        /// Target bucket.
        bucket: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with an error status.
    #[error(
        "{operation} on bucket [{bucket}] failed: code is [{code}], msg is [{message}], requestId is [{request_id}]"
    )]
    Backend {
        /// The operation, e.g. `PutBucketPolicy`.
        operation: &'static str,
        /// Target bucket.
        bucket: String,
        /// HTTP status code.
        status: u16,
        /// S3 error code.
        code: String,
        /// Backend message.
        message: String,
        /// Backend request id.
        request_id: String,
    },

    /// The stored policy is not valid JSON or could not be serialized.
    #[error("bucket [{bucket}] policy json error: {source}")]
    Policy {
        /// Target bucket.
        bucket: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A request body could not be serialized.
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),
}

impl S3ClientError {
    /// Backend error code, if the backend reported one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Backend { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The missing resource this error reports, if any.
    #[must_use]
    pub fn missing_resource(&self) -> Option<MissingResource> {
        self.code().and_then(MissingResource::from_code)
    }
}

/// Convenience result type for object-storage operations.
pub type S3Result<T> = Result<T, S3ClientError>;
