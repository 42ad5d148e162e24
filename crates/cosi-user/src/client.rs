//! Signed-request client for the user-management API.
//!
//! The backend serves a single resource, `/poe/rest`, on a fixed
//! administrative port. Every call is a GET whose parameters, including the
//! authentication parameters and the signature, are sent in the query
//! string. A client is built per grant/revoke call and dropped afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use cosi_auth::QuerySigner;
use cosi_core::{BackendCredentials, DriverConfig, TlsMode, build_http_client};
use cosi_xml::{ErrorResponse, from_xml};
use reqwest::{Method, StatusCode};
use tracing::{debug, error};
use typed_builder::TypedBuilder;

use crate::error::{UserClientError, UserResult};

/// Resource path of every user-management call.
pub(crate) const USER_API_URI: &str = "/poe/rest";

/// Parameter naming the operation.
pub(crate) const ACTION_PARAM: &str = "Action";

/// Default administrative port of the user-management backend.
const DEFAULT_ADMIN_PORT: u16 = 9443;

/// Signed client configuration.
#[derive(Clone, TypedBuilder)]
pub struct SignedClientConfig {
    /// Endpoint URL. Only its scheme and host are used.
    #[builder(setter(into))]
    pub endpoint: String,
    /// Access key id.
    #[builder(setter(into))]
    pub access_key: String,
    /// Secret access key.
    #[builder(setter(into))]
    pub secret_key: String,
    /// Server certificate verification.
    pub tls: TlsMode,
    /// Port the endpoint is rewritten to.
    #[builder(default = DEFAULT_ADMIN_PORT)]
    pub admin_port: u16,
    /// Per-request timeout.
    #[builder(default = Duration::from_secs(60))]
    pub timeout: Duration,
}

impl SignedClientConfig {
    /// Configuration for the account in `credentials`, with port and
    /// timeout taken from `config`.
    #[must_use]
    pub fn from_credentials(credentials: &BackendCredentials, config: &DriverConfig) -> Self {
        Self {
            endpoint: credentials.endpoint.clone(),
            access_key: credentials.access_key.clone(),
            secret_key: credentials.secret_key.clone(),
            tls: credentials.tls_mode(),
            admin_port: config.user_admin_port,
            timeout: config.user_client_timeout(),
        }
    }
}

impl fmt::Debug for SignedClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("tls", &matches!(self.tls, TlsMode::Verify(_)))
            .field("admin_port", &self.admin_port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client issuing query-signed GET calls to the user-management backend.
#[derive(Debug)]
pub struct SignedClient {
    http: reqwest::Client,
    /// `scheme://host:admin_port`.
    endpoint: String,
    /// `host:admin_port`, the host line of the string to sign.
    host: String,
    signer: QuerySigner,
}

impl SignedClient {
    /// Build a client, rewriting the endpoint port to the admin port.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or not a URL with a host,
    /// if either key is empty, or if the TLS client cannot be built.
    pub fn new(config: SignedClientConfig) -> UserResult<Self> {
        if config.endpoint.is_empty() {
            return Err(UserClientError::EmptyEndpoint);
        }
        let url = reqwest::Url::parse(&config.endpoint).map_err(|e| {
            UserClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        let Some(hostname) = url.host_str() else {
            return Err(UserClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "missing host".to_owned(),
            });
        };
        if config.access_key.is_empty() {
            return Err(UserClientError::EmptyAccessKey);
        }
        if config.secret_key.is_empty() {
            return Err(UserClientError::EmptySecretKey);
        }

        let host = format!("{hostname}:{}", config.admin_port);
        let endpoint = format!("{}://{host}", url.scheme());
        let http = build_http_client(&config.tls, config.timeout)?;

        Ok(Self {
            http,
            endpoint,
            host,
            signer: QuerySigner::new(config.access_key, config.secret_key),
        })
    }

    /// Endpoint the client sends to, with the admin port applied.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sign and send one call, returning the raw success body.
    ///
    /// `params` must name the operation in `Action`; the authentication
    /// parameters and the signature are added here.
    ///
    /// # Errors
    ///
    /// Returns [`UserClientError::EmptyParams`] for an empty parameter set,
    /// [`UserClientError::Transport`] if the request fails, and
    /// [`UserClientError::Backend`] (or `UndecodableError`) for any status
    /// other than 200.
    pub async fn call(&self, mut params: BTreeMap<String, String>) -> UserResult<Vec<u8>> {
        if params.is_empty() {
            return Err(UserClientError::EmptyParams);
        }
        let action = params.get(ACTION_PARAM).cloned().unwrap_or_default();

        let query = self
            .signer
            .sign(Method::GET.as_str(), &self.host, USER_API_URI, &mut params);
        debug!(action = %action, endpoint = %self.endpoint, "sending user-management request");

        let url = format!("{}{USER_API_URI}?{query}", self.endpoint);
        let transport = |source| UserClientError::Transport {
            action: action.clone(),
            source,
        };
        let response = self.http.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if status != StatusCode::OK {
            error!(action = %action, status = status.as_u16(), "user-management call not success");
            return Err(error_from_body(action, status, &body));
        }
        Ok(body.to_vec())
    }
}

/// Decode the `<ErrorResponse>` envelope of a failed call.
fn error_from_body(action: String, status: StatusCode, body: &[u8]) -> UserClientError {
    match from_xml::<ErrorResponse>(body) {
        Ok(err) => UserClientError::Backend {
            action,
            status: status.as_u16(),
            code: err.code,
            message: err.message,
            request_id: err.request_id,
        },
        Err(source) => UserClientError::UndecodableError {
            action,
            status: status.as_u16(),
            body: String::from_utf8_lossy(body).into_owned(),
            source,
        },
    }
}
