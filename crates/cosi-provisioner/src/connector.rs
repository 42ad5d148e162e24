//! Construction of backend clients from resolved credentials.

use cosi_core::{BackendCredentials, DriverConfig};
use cosi_s3::{ObjectStorage, S3Client, S3ClientConfig, S3Result};
use cosi_user::{SignedClient, SignedClientConfig, UserApi, UserResult};

/// Builds backend clients for one operation.
///
/// Clients are created per call from the credentials of the secret the
/// request refers to and are never cached.
pub trait BackendConnector: Send + Sync {
    /// Object-storage client for the account in `credentials`.
    fn object_storage(&self, credentials: &BackendCredentials)
    -> S3Result<Box<dyn ObjectStorage>>;

    /// User-management client for the account in `credentials`.
    fn user_api(&self, credentials: &BackendCredentials) -> UserResult<Box<dyn UserApi>>;
}

/// Connector building the HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    config: DriverConfig,
}

impl HttpConnector {
    /// Connector applying the timeouts, region and admin port of `config`.
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }
}

impl BackendConnector for HttpConnector {
    fn object_storage(
        &self,
        credentials: &BackendCredentials,
    ) -> S3Result<Box<dyn ObjectStorage>> {
        let client = S3Client::new(S3ClientConfig::from_credentials(credentials, &self.config))?;
        Ok(Box::new(client))
    }

    fn user_api(&self, credentials: &BackendCredentials) -> UserResult<Box<dyn UserApi>> {
        let client =
            SignedClient::new(SignedClientConfig::from_credentials(credentials, &self.config))?;
        Ok(Box::new(client))
    }
}
