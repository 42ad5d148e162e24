//! TLS mode selection and HTTP client construction for backend clients.

use std::time::Duration;

use tracing::warn;

use crate::error::{CoreError, CoreResult};

/// How a backend client verifies the server certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Verify the server against the given PEM root CA only.
    Verify(Vec<u8>),
    /// Accept any server certificate.
    ///
    /// Used when the credential secret carries no root CA. Connections are
    /// encrypted but not authenticated.
    TrustAll,
}

impl TlsMode {
    /// Select the mode from an optional root CA; empty or absent means [`TlsMode::TrustAll`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cosi_core::TlsMode;
    ///
    /// assert_eq!(TlsMode::from_root_ca(None), TlsMode::TrustAll);
    /// assert_eq!(TlsMode::from_root_ca(Some(b"")), TlsMode::TrustAll);
    /// assert!(matches!(TlsMode::from_root_ca(Some(b"pem")), TlsMode::Verify(_)));
    /// ```
    #[must_use]
    pub fn from_root_ca(root_ca: Option<&[u8]>) -> Self {
        match root_ca {
            Some(ca) if !ca.is_empty() => Self::Verify(ca.to_vec()),
            _ => Self::TrustAll,
        }
    }
}

/// Build a `reqwest` client with the given TLS mode and per-request timeout.
///
/// # Errors
///
/// Returns [`CoreError::Tls`] if the root CA is not valid PEM or the client
/// cannot be built.
pub fn build_http_client(tls: &TlsMode, timeout: Duration) -> CoreResult<reqwest::Client> {
    let builder = reqwest::Client::builder().timeout(timeout);

    let builder = match tls {
        TlsMode::Verify(pem) => {
            let cert = reqwest::Certificate::from_pem(pem).map_err(CoreError::Tls)?;
            builder
                .tls_certs_only([cert])
                .min_tls_version(reqwest::tls::Version::TLS_1_2)
        }
        TlsMode::TrustAll => {
            warn!("no root CA configured, backend server certificates will not be verified");
            builder.danger_accept_invalid_certs(true)
        }
    };

    builder.build().map_err(CoreError::Tls)
}
