//! The object-storage seam used by the provisioner.

use crate::error::S3Result;
use crate::policy::PolicyDocument;
use crate::tolerance::Tolerance;

/// Bucket and bucket-policy operations against an object-storage backend.
///
/// [`crate::S3Client`] is the HTTP implementation; tests substitute
/// in-memory fakes.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Create `bucket` with an optional canned ACL and location constraint.
    async fn create_bucket(
        &self,
        bucket: &str,
        acl: Option<&str>,
        location: Option<&str>,
    ) -> S3Result<()>;

    /// Delete `bucket`; a bucket that does not exist is not an error.
    async fn delete_bucket(&self, bucket: &str) -> S3Result<()>;

    /// Succeed if `bucket` exists and is accessible.
    async fn head_bucket(&self, bucket: &str) -> S3Result<()>;

    /// Fetch the policy of `bucket`.
    ///
    /// Returns `Ok(None)` when the backend reports a missing resource that
    /// `tolerance` covers.
    async fn get_bucket_policy(
        &self,
        bucket: &str,
        tolerance: Tolerance,
    ) -> S3Result<Option<PolicyDocument>>;

    /// Replace the policy of `bucket`.
    ///
    /// A tolerated missing resource is logged and treated as success.
    async fn put_bucket_policy(
        &self,
        bucket: &str,
        policy: &PolicyDocument,
        tolerance: Tolerance,
    ) -> S3Result<()>;

    /// Delete the policy of `bucket`.
    ///
    /// A tolerated missing resource is logged and treated as success.
    async fn delete_bucket_policy(&self, bucket: &str, tolerance: Tolerance) -> S3Result<()>;
}
