//! Request and response messages of the driver operations.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Parameter naming the credential secret of the account.
pub const ACCOUNT_SECRET_NAME: &str = "accountSecretName";
/// Parameter naming the namespace of the account's credential secret.
pub const ACCOUNT_SECRET_NAMESPACE: &str = "accountSecretNamespace";
/// Optional grant parameter selecting the access model, `rw` or `ro`.
pub const BUCKET_POLICY_MODEL: &str = "bucketPolicyModel";
/// Optional create parameter holding a canned bucket ACL.
pub const BUCKET_ACL: &str = "bucketACL";
/// Optional create parameter holding the bucket location constraint.
pub const BUCKET_LOCATION: &str = "bucketLocation";

/// Protocol key of the credentials returned by a grant.
pub const S3_PROTOCOL: &str = "s3";
/// Credential entry holding the minted access key id.
pub const ACCESS_KEY_ID: &str = "accessKeyID";
/// Credential entry holding the minted secret.
pub const ACCESS_SECRET_KEY: &str = "accessSecretKey";
/// Credential entry holding the object-storage endpoint.
pub const ENDPOINT: &str = "endpoint";

/// How a grantee authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthenticationType {
    /// Not set by the caller.
    #[default]
    Unknown,
    /// Access key pair.
    Key,
    /// Identity federation; not supported.
    Iam,
}

/// Create a bucket.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketRequest {
    /// Bucket name.
    pub name: String,
    /// Bucket class parameters.
    pub parameters: HashMap<String, String>,
}

/// Result of creating a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketResponse {
    /// Encoded `namespace/secret/bucket` id.
    pub bucket_id: String,
}

/// Delete a bucket.
#[derive(Debug, Clone, Default)]
pub struct DeleteBucketRequest {
    /// Id returned by create-bucket.
    pub bucket_id: String,
}

/// Grant a principal access to a bucket.
#[derive(Debug, Clone, Default)]
pub struct GrantBucketAccessRequest {
    /// Id returned by create-bucket.
    pub bucket_id: String,
    /// Principal name; also the statement id and backend user name.
    pub name: String,
    /// Requested authentication type.
    pub authentication_type: AuthenticationType,
    /// Bucket access class parameters.
    pub parameters: HashMap<String, String>,
}

/// Credentials for one protocol.
///
/// The `Debug` output lists the entry names only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialDetails {
    /// Credential entries.
    pub secrets: BTreeMap<String, String>,
}

impl fmt::Debug for CredentialDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDetails")
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Result of a grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantBucketAccessResponse {
    /// Encoded `namespace/secret/principal` id, passed back on revoke.
    pub account_id: String,
    /// Credentials by protocol.
    pub credentials: HashMap<String, CredentialDetails>,
}

/// Revoke a principal's access to a bucket.
#[derive(Debug, Clone, Default)]
pub struct RevokeBucketAccessRequest {
    /// Id returned by create-bucket.
    pub bucket_id: String,
    /// Id returned by grant.
    pub account_id: String,
}
