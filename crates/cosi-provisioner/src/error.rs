//! Provisioner errors and the status reported to the control plane.

use std::fmt;

use cosi_core::CoreError;
use cosi_s3::S3ClientError;
use cosi_user::{RemovalError, UserClientError};

/// Coarse status code of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    /// Any failure; the message carries the detail.
    Internal,
}

impl Code {
    /// Canonical name of the code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error status returned to the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Status code.
    pub code: Code,
    /// Description of the failure.
    pub message: String,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Errors of the driver operations.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionerError {
    /// The request is malformed.
    #[error("check {request} request failed: {reason}")]
    Validation {
        /// The operation, e.g. `DriverGrantBucketAccess`.
        request: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// A bucket or account id could not be decoded.
    #[error("fetch data from resource id [{id}] failed: {source}")]
    ResourceId {
        /// The rejected id.
        id: String,
        /// Underlying error.
        #[source]
        source: CoreError,
    },

    /// Credentials could not be resolved.
    #[error("get account secret [{secret}] failed: {source}")]
    Credentials {
        /// `namespace/name` of the secret.
        secret: String,
        /// Underlying error.
        #[source]
        source: CoreError,
    },

    /// An object-storage step failed.
    #[error("{context} failed: {source}")]
    Storage {
        /// The failing step.
        context: String,
        /// Underlying error.
        #[source]
        source: S3ClientError,
    },

    /// A user-management step failed.
    #[error("{context} failed: {source}")]
    User {
        /// The failing step.
        context: String,
        /// Underlying error.
        #[source]
        source: UserClientError,
    },

    /// Removing the grantee's backend user failed partway.
    #[error(transparent)]
    Removal(#[from] RemovalError),
}

impl ProvisionerError {
    pub(crate) fn validation(request: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            request,
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(context: impl Into<String>) -> impl FnOnce(S3ClientError) -> Self {
        let context = context.into();
        move |source| Self::Storage { context, source }
    }

    pub(crate) fn user(context: impl Into<String>) -> impl FnOnce(UserClientError) -> Self {
        let context = context.into();
        move |source| Self::User { context, source }
    }

    /// Status code reported for this error.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn code(&self) -> Code {
        Code::Internal
    }

    /// Status reported to the control plane.
    #[must_use]
    pub fn to_status(&self) -> Status {
        Status {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<ProvisionerError> for Status {
    fn from(err: ProvisionerError) -> Self {
        err.to_status()
    }
}

/// Convenience result type for driver operations.
pub type ProvisionerResult<T> = Result<T, ProvisionerError>;
