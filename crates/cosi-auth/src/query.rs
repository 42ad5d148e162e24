//! Query-parameter signing for the user-management API.
//!
//! Every call carries its authentication in the query string:
//!
//! 1. Add `AWSAccessKeyId`, `SignatureMethod`, `SignatureVersion` and `Timestamp`.
//! 2. Sort and escape all parameters into the canonical query string.
//! 3. Sign `METHOD\nhost\nuri\nquery` with HMAC-SHA256 keyed by the secret key.
//! 4. Add the base64 signature as `Signature`.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Timelike, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;
use tracing::trace;

use crate::canonical::{build_query_string_to_sign, build_sorted_query_string};

/// Parameter naming the caller's access key.
pub const ACCESS_KEY_ID_PARAM: &str = "AWSAccessKeyId";
/// Parameter naming the signature algorithm.
pub const SIGNATURE_METHOD_PARAM: &str = "SignatureMethod";
/// Parameter naming the signature version.
pub const SIGNATURE_VERSION_PARAM: &str = "SignatureVersion";
/// Parameter carrying the request timestamp.
pub const TIMESTAMP_PARAM: &str = "Timestamp";
/// Parameter carrying the computed signature.
pub const SIGNATURE_PARAM: &str = "Signature";

/// Value of [`SIGNATURE_METHOD_PARAM`].
pub const SIGNATURE_METHOD: &str = "HmacSHA256";
/// Value of [`SIGNATURE_VERSION_PARAM`].
pub const SIGNATURE_VERSION: &str = "4";

type HmacSha256 = Hmac<Sha256>;

/// Signs user-management requests with a fixed key pair.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use chrono::{TimeZone, Utc};
/// use cosi_auth::QuerySigner;
///
/// let signer = QuerySigner::new("AK", "SK");
/// let mut params = BTreeMap::from([("Action".to_owned(), "GetUser".to_owned())]);
/// let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
/// let query = signer.sign_at("GET", "10.0.0.1:9443", "/poe/rest", &mut params, at);
/// assert!(query.contains("Signature="));
/// assert_eq!(params["Timestamp"], "2024-05-06T07:08:09.0Z");
/// ```
#[derive(Clone)]
pub struct QuerySigner {
    access_key: String,
    secret_key: String,
}

impl QuerySigner {
    /// Create a signer for the given key pair.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Access key the signer adds to each request.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// Sign `params` with the current time. See [`QuerySigner::sign_at`].
    pub fn sign(
        &self,
        method: &str,
        host: &str,
        uri: &str,
        params: &mut BTreeMap<String, String>,
    ) -> String {
        self.sign_at(method, host, uri, params, Utc::now())
    }

    /// Add the authentication parameters and signature to `params`, using
    /// `timestamp` as the request time.
    ///
    /// Returns the final sorted query string, `Signature` included.
    pub fn sign_at(
        &self,
        method: &str,
        host: &str,
        uri: &str,
        params: &mut BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) -> String {
        params.insert(ACCESS_KEY_ID_PARAM.to_owned(), self.access_key.clone());
        params.insert(SIGNATURE_METHOD_PARAM.to_owned(), SIGNATURE_METHOD.to_owned());
        params.insert(SIGNATURE_VERSION_PARAM.to_owned(), SIGNATURE_VERSION.to_owned());
        params.insert(TIMESTAMP_PARAM.to_owned(), format_timestamp(timestamp));
        params.remove(SIGNATURE_PARAM);

        let string_to_sign =
            build_query_string_to_sign(method, host, uri, &build_sorted_query_string(params));
        trace!(string_to_sign = %string_to_sign, "computed string to sign");

        let signature = compute_signature(&self.secret_key, &string_to_sign);
        params.insert(SIGNATURE_PARAM.to_owned(), signature);

        build_sorted_query_string(params)
    }
}

impl fmt::Debug for QuerySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Format a timestamp as `YYYY-MM-DDThh:mm:ss.sZ` with tenths of a second.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use cosi_auth::query::format_timestamp;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(format_timestamp(at), "2024-01-02T03:04:05.0Z");
/// ```
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    // Leap seconds report nanos above 1e9; clamp to a single digit.
    let tenths = (timestamp.nanosecond() / 100_000_000).min(9);
    format!("{}.{tenths}Z", timestamp.format("%Y-%m-%dT%H:%M:%S"))
}

/// Base64 HMAC-SHA256 of `data` keyed by `secret_key`.
#[must_use]
pub fn compute_signature(secret_key: &str, data: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept keys of any length");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
