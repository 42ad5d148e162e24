//! AWS Signature Version 4 signing for outgoing object-storage requests.
//!
//! The signing flow:
//!
//! 1. Hash the payload and stamp the request with `x-amz-date`.
//! 2. Build the canonical request over `host`, `x-amz-content-sha256`,
//!    `x-amz-date` and any extra headers the caller signs.
//! 3. Build the string to sign from the timestamp, credential scope and
//!    canonical request hash.
//! 4. Derive the signing key and compute the hex signature.
//! 5. Assemble the `Authorization` header.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::canonical::{build_canonical_request, build_signed_headers_string};

/// The signing algorithm.
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Headers produced by [`SigV4Signer::sign_at`] that the caller must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestHeaders {
    /// Value of `x-amz-date`.
    pub amz_date: String,
    /// Value of `x-amz-content-sha256`.
    pub content_sha256: String,
    /// Value of `Authorization`.
    pub authorization: String,
}

/// Signs requests for one key pair, region and service.
#[derive(Clone)]
pub struct SigV4Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

impl SigV4Signer {
    /// Create a signer.
    #[must_use]
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign a request at the current time. See [`SigV4Signer::sign_at`].
    #[must_use]
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        query: &str,
        extra_headers: &[(&str, &str)],
        payload: &[u8],
    ) -> SignedRequestHeaders {
        self.sign_at(method, host, path, query, extra_headers, payload, Utc::now())
    }

    /// Sign a request as of `at`.
    ///
    /// `extra_headers` are signed in addition to `host`,
    /// `x-amz-content-sha256` and `x-amz-date`, and must be sent unchanged.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn sign_at(
        &self,
        method: &str,
        host: &str,
        path: &str,
        query: &str,
        extra_headers: &[(&str, &str)],
        payload: &[u8],
        at: DateTime<Utc>,
    ) -> SignedRequestHeaders {
        let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
        let date = at.format("%Y%m%d").to_string();
        let content_sha256 = hash_payload(payload);

        let lowered: Vec<(String, &str)> = extra_headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), *value))
            .collect();

        let mut headers: Vec<(&str, &str)> = vec![
            ("host", host),
            ("x-amz-content-sha256", &content_sha256),
            ("x-amz-date", &amz_date),
        ];
        headers.extend(lowered.iter().map(|(name, value)| (name.as_str(), *value)));

        let mut signed: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
        signed.sort_unstable();
        signed.dedup();

        let canonical =
            build_canonical_request(method, path, query, &headers, &signed, &content_sha256);
        trace!(canonical_request = %canonical, "built canonical request");

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = build_string_to_sign(&amz_date, &scope, &hash_payload(canonical.as_bytes()));
        let signing_key = derive_signing_key(&self.secret_key, &date, &self.region, &self.service);
        let signature = compute_signature(&signing_key, &string_to_sign);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.access_key,
            build_signed_headers_string(&signed),
        );

        SignedRequestHeaders {
            amz_date,
            content_sha256,
            authorization,
        }
    }
}

impl fmt::Debug for SigV4Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigV4Signer")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use cosi_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Hex HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Hex SHA-256 of `payload`, the `x-amz-content-sha256` value.
///
/// # Examples
///
/// ```
/// use cosi_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
