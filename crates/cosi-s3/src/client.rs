//! HTTP object-storage client.
//!
//! Requests use path-style addressing (`{endpoint}/{bucket}`) and are signed
//! with SigV4. A client is built per grant/revoke call from the bucket
//! owner's credentials and dropped afterwards.

use std::fmt;
use std::time::Duration;

use cosi_auth::SigV4Signer;
use cosi_auth::canonical::build_canonical_uri;
use cosi_core::{BackendCredentials, DriverConfig, TlsMode, build_http_client};
use cosi_xml::{CreateBucketConfiguration, S3Error, from_xml, to_xml};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use tracing::{debug, info};
use typed_builder::TypedBuilder;

use crate::error::{S3ClientError, S3Result};
use crate::policy::PolicyDocument;
use crate::storage::ObjectStorage;
use crate::tolerance::Tolerance;

/// Subresource selecting the bucket policy.
const POLICY_QUERY: &str = "policy";

/// Response header carrying the backend request id.
const REQUEST_ID_HEADER: &str = "x-amz-request-id";

/// Object-storage client configuration.
#[derive(Clone, TypedBuilder)]
pub struct S3ClientConfig {
    /// Endpoint URL, e.g. `https://10.0.0.1:443`.
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
    /// Signing region.
    #[builder(default = String::from("us-east-1"), setter(into))]
    pub region: String,
    /// Per-request timeout.
    #[builder(default = Duration::from_secs(200))]
    pub timeout: Duration,
}

impl S3ClientConfig {
    /// Configuration for the account in `credentials`, with region and
    /// timeout taken from `config`.
    #[must_use]
    pub fn from_credentials(credentials: &BackendCredentials, config: &DriverConfig) -> Self {
        Self {
            endpoint: credentials.endpoint.clone(),
            access_key: credentials.access_key.clone(),
            secret_key: credentials.secret_key.clone(),
            tls: credentials.tls_mode(),
            region: config.s3_region.clone(),
            timeout: config.s3_client_timeout(),
        }
    }
}

impl fmt::Debug for S3ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("tls", &matches!(self.tls, TlsMode::Verify(_)))
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SigV4-signing object-storage client.
#[derive(Debug)]
pub struct S3Client {
    http: reqwest::Client,
    scheme: String,
    host: String,
    base_path: String,
    signer: SigV4Signer,
}

impl S3Client {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or not a URL with a host,
    /// if either key is empty, or if the TLS client cannot be built.
    pub fn new(config: S3ClientConfig) -> S3Result<Self> {
        if config.endpoint.is_empty() {
            return Err(S3ClientError::EmptyEndpoint);
        }
        let url =
            reqwest::Url::parse(&config.endpoint).map_err(|e| S3ClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        let Some(hostname) = url.host_str() else {
            return Err(S3ClientError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "missing host".to_owned(),
            });
        };
        if config.access_key.is_empty() {
            return Err(S3ClientError::EmptyAccessKey);
        }
        if config.secret_key.is_empty() {
            return Err(S3ClientError::EmptySecretKey);
        }

        let host = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.to_owned(),
        };
        let http = build_http_client(&config.tls, config.timeout)?;

        Ok(Self {
            http,
            scheme: url.scheme().to_owned(),
            host,
            base_path: url.path().trim_end_matches('/').to_owned(),
            signer: SigV4Signer::new(config.access_key, config.secret_key, config.region, "s3"),
        })
    }

    /// Sign and send one request, mapping error statuses to
    /// [`S3ClientError::Backend`].
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        bucket: &str,
        query: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> S3Result<Response> {
        let path = build_canonical_uri(&format!("{}/{bucket}", self.base_path));
        let signed = self
            .signer
            .sign(method.as_str(), &self.host, &path, query, headers, &body);

        let mut url = format!("{}://{}{path}", self.scheme, self.host);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        debug!(operation, bucket, %method, url = %url, "sending object-storage request");

        let mut request = self
            .http
            .request(method, url)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .header(AUTHORIZATION, signed.authorization);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| S3ClientError::Transport {
                operation,
                bucket: bucket.to_owned(),
                source,
            })?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(backend_error(operation, bucket, response).await)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3Client {
    async fn create_bucket(
        &self,
        bucket: &str,
        acl: Option<&str>,
        location: Option<&str>,
    ) -> S3Result<()> {
        info!(bucket, acl = ?acl, location = ?location, "start to create bucket");

        let mut headers = Vec::new();
        if let Some(acl) = acl.filter(|a| !a.is_empty()) {
            headers.push(("x-amz-acl", acl));
        }
        let body = match location.filter(|l| !l.is_empty()) {
            Some(location) => to_xml(
                CreateBucketConfiguration::ELEMENT,
                &CreateBucketConfiguration {
                    location_constraint: Some(location.to_owned()),
                },
            )?,
            None => Vec::new(),
        };

        let response = self
            .send("CreateBucket", Method::PUT, bucket, "", &headers, body)
            .await?;
        info!(bucket, request_id = %request_id(&response), "create bucket successfully");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> S3Result<()> {
        info!(bucket, "start to delete bucket");
        let result = self
            .send("DeleteBucket", Method::DELETE, bucket, "", &[], Vec::new())
            .await;
        if let Some(response) = tolerate(result, Tolerance::MISSING_BUCKET, bucket)? {
            info!(bucket, request_id = %request_id(&response), "delete bucket successfully");
        }
        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> S3Result<()> {
        info!(bucket, "start to check bucket existence");
        let response = self
            .send("HeadBucket", Method::HEAD, bucket, "", &[], Vec::new())
            .await?;
        info!(bucket, request_id = %request_id(&response), "check bucket existence successfully");
        Ok(())
    }

    async fn get_bucket_policy(
        &self,
        bucket: &str,
        tolerance: Tolerance,
    ) -> S3Result<Option<PolicyDocument>> {
        info!(bucket, "start to get bucket policy");
        let result = self
            .send("GetBucketPolicy", Method::GET, bucket, POLICY_QUERY, &[], Vec::new())
            .await;
        let Some(response) = tolerate(result, tolerance, bucket)? else {
            return Ok(None);
        };

        let request_id = request_id(&response);
        let body = response
            .text()
            .await
            .map_err(|source| S3ClientError::Transport {
                operation: "GetBucketPolicy",
                bucket: bucket.to_owned(),
                source,
            })?;
        let policy = PolicyDocument::from_json(&body).map_err(|source| S3ClientError::Policy {
            bucket: bucket.to_owned(),
            source,
        })?;

        info!(bucket, request_id = %request_id, statements = policy.statement.len(), "get bucket policy successfully");
        Ok(Some(policy))
    }

    async fn put_bucket_policy(
        &self,
        bucket: &str,
        policy: &PolicyDocument,
        tolerance: Tolerance,
    ) -> S3Result<()> {
        let json = policy.to_json().map_err(|source| S3ClientError::Policy {
            bucket: bucket.to_owned(),
            source,
        })?;
        info!(bucket, policy = %json, "start to put bucket policy");

        let result = self
            .send(
                "PutBucketPolicy",
                Method::PUT,
                bucket,
                POLICY_QUERY,
                &[(CONTENT_TYPE.as_str(), "application/json")],
                json.into_bytes(),
            )
            .await;
        if let Some(response) = tolerate(result, tolerance, bucket)? {
            info!(bucket, request_id = %request_id(&response), "put bucket policy successfully");
        }
        Ok(())
    }

    async fn delete_bucket_policy(&self, bucket: &str, tolerance: Tolerance) -> S3Result<()> {
        info!(bucket, "start to delete bucket policy");
        let result = self
            .send("DeleteBucketPolicy", Method::DELETE, bucket, POLICY_QUERY, &[], Vec::new())
            .await;
        if let Some(response) = tolerate(result, tolerance, bucket)? {
            info!(bucket, request_id = %request_id(&response), "delete bucket policy successfully");
        }
        Ok(())
    }
}

/// Turn an error the tolerance covers into `Ok(None)`.
fn tolerate<T>(result: S3Result<T>, tolerance: Tolerance, bucket: &str) -> S3Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) => match err.missing_resource().filter(|r| tolerance.tolerates(*r)) {
            Some(resource) => {
                info!(bucket, code = %resource, error = %err, "tolerated missing resource");
                Ok(None)
            }
            None => Err(err),
        },
    }
}

fn request_id(response: &Response) -> String {
    response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Build the error for a non-success response from its `<Error>` body, or
/// from the status alone when the body is empty or not XML.
async fn backend_error(operation: &'static str, bucket: &str, response: Response) -> S3ClientError {
    let status = response.status();
    let header_request_id = request_id(&response);
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(source) => {
            return S3ClientError::Transport {
                operation,
                bucket: bucket.to_owned(),
                source,
            };
        }
    };

    let parsed = if body.is_empty() {
        None
    } else {
        from_xml::<S3Error>(&body).ok()
    };

    match parsed {
        Some(err) => S3ClientError::Backend {
            operation,
            bucket: bucket.to_owned(),
            status: status.as_u16(),
            code: err.code,
            message: err.message,
            request_id: if err.request_id.is_empty() {
                header_request_id
            } else {
                err.request_id
            },
        },
        None => S3ClientError::Backend {
            operation,
            bucket: bucket.to_owned(),
            status: status.as_u16(),
            code: code_for_status(status).to_owned(),
            message: String::from_utf8_lossy(&body).into_owned(),
            request_id: header_request_id,
        },
    }
}

/// Error code for a response without an error body.
fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "NoSuchBucket",
        StatusCode::FORBIDDEN => "AccessDenied",
        StatusCode::MOVED_PERMANENTLY => "PermanentRedirect",
        _ => status.canonical_reason().unwrap_or("UnknownError"),
    }
}
