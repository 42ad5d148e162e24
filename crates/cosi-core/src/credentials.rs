//! Backend credential bundle and the source that resolves it.
//!
//! Credentials live in secrets owned by the control plane. A secret is an
//! opaque map of byte values; [`BackendCredentials::from_secret_data`]
//! extracts the entries the backend clients need.

use std::collections::HashMap;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::tls::TlsMode;

/// Data key holding the backend access key.
pub const ACCESS_KEY: &str = "accessKey";
/// Data key holding the backend secret key.
pub const SECRET_KEY: &str = "secretKey";
/// Data key holding the backend endpoint URL.
pub const ENDPOINT: &str = "endpoint";
/// Data key holding the optional PEM root CA.
pub const ROOT_CA: &str = "rootCA";

/// Raw secret data as returned by a [`CredentialSource`].
pub type SecretData = HashMap<String, Vec<u8>>;

/// Credentials for one backend account.
///
/// Passed by value into a backend client for the duration of a single
/// request. The `Debug` output never includes the secret key or the CA.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Endpoint URL of the backend.
    pub endpoint: String,
    /// PEM-encoded root CA, if the secret carries one.
    pub root_ca: Option<Vec<u8>>,
}

impl BackendCredentials {
    /// Extract credentials from raw secret data.
    ///
    /// `secret` is the `namespace/name` of the secret and is only used in
    /// error messages. An empty `rootCA` entry is treated as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use cosi_core::BackendCredentials;
    ///
    /// let data = HashMap::from([
    ///     ("accessKey".to_owned(), b"AK".to_vec()),
    ///     ("secretKey".to_owned(), b"SK".to_vec()),
    ///     ("endpoint".to_owned(), b"https://10.0.0.1:443".to_vec()),
    /// ]);
    /// let creds = BackendCredentials::from_secret_data("ns/name", &data).unwrap();
    /// assert_eq!(creds.access_key, "AK");
    /// assert!(creds.root_ca.is_none());
    /// ```
    pub fn from_secret_data(secret: &str, data: &SecretData) -> CoreResult<Self> {
        let text = |key: &'static str| {
            data.get(key)
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .ok_or_else(|| CoreError::MissingCredential {
                    secret: secret.to_owned(),
                    key,
                })
        };

        Ok(Self {
            access_key: text(ACCESS_KEY)?,
            secret_key: text(SECRET_KEY)?,
            endpoint: text(ENDPOINT)?,
            root_ca: data.get(ROOT_CA).filter(|ca| !ca.is_empty()).cloned(),
        })
    }

    /// TLS mode implied by the presence of a root CA.
    #[must_use]
    pub fn tls_mode(&self) -> TlsMode {
        TlsMode::from_root_ca(self.root_ca.as_deref())
    }
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("root_ca", &self.root_ca.as_ref().map(|_| "<pem>"))
            .finish()
    }
}

/// Trait for looking up credential secrets by namespace and name.
///
/// Implementations may back this with an orchestrator secret store, files,
/// or any other source.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the raw data of the secret `namespace/name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SecretUnavailable`] if the secret cannot be read.
    async fn get_secret(&self, namespace: &str, name: &str) -> CoreResult<SecretData>;

    /// Fetch the secret `namespace/name` and extract backend credentials from it.
    async fn credentials(&self, namespace: &str, name: &str) -> CoreResult<BackendCredentials> {
        let data = self.get_secret(namespace, name).await?;
        BackendCredentials::from_secret_data(&format!("{namespace}/{name}"), &data)
    }
}

/// A simple in-memory credential source.
///
/// Suitable for tests and local development.
///
/// # Examples
///
/// ```
/// use cosi_core::StaticCredentialSource;
///
/// let source = StaticCredentialSource::new()
///     .with_credentials("ns", "admin", "AK", "SK", "https://10.0.0.1", None);
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialSource {
    secrets: HashMap<(String, String), SecretData>,
}

impl StaticCredentialSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret with raw data.
    #[must_use]
    pub fn with_secret(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        data: SecretData,
    ) -> Self {
        self.secrets.insert((namespace.into(), name.into()), data);
        self
    }

    /// Add a secret holding backend credentials.
    #[must_use]
    pub fn with_credentials(
        self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        access_key: &str,
        secret_key: &str,
        endpoint: &str,
        root_ca: Option<&[u8]>,
    ) -> Self {
        let mut data = SecretData::from([
            (ACCESS_KEY.to_owned(), access_key.as_bytes().to_vec()),
            (SECRET_KEY.to_owned(), secret_key.as_bytes().to_vec()),
            (ENDPOINT.to_owned(), endpoint.as_bytes().to_vec()),
        ]);
        if let Some(ca) = root_ca {
            data.insert(ROOT_CA.to_owned(), ca.to_vec());
        }
        self.with_secret(namespace, name, data)
    }

    /// Number of stored secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the source holds no secrets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn get_secret(&self, namespace: &str, name: &str) -> CoreResult<SecretData> {
        self.secrets
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
            .ok_or_else(|| CoreError::SecretUnavailable {
                secret: format!("{namespace}/{name}"),
                reason: "not found".to_owned(),
            })
    }
}
