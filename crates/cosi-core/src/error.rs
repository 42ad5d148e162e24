//! Error types for the COSI driver core.

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The resource id does not split into exactly three `/`-separated segments.
    #[error("invalid format of resource id [{0}]")]
    InvalidFormat(String),

    /// One of the three resource id segments is empty.
    #[error("invalid value of resource id [{0}]")]
    InvalidValue(String),

    /// A required key is missing from a credential secret.
    #[error("credential secret [{secret}] has no [{key}] entry")]
    MissingCredential {
        /// `namespace/name` of the secret.
        secret: String,
        /// The missing data key.
        key: &'static str,
    },

    /// The credential source could not produce the requested secret.
    #[error("failed to get account secret [{secret}]: {reason}")]
    SecretUnavailable {
        /// `namespace/name` of the secret.
        secret: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// TLS setup for a backend HTTP client failed.
    #[error("build tls config failed: {0}")]
    Tls(#[source] reqwest::Error),
}

/// Convenience result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
