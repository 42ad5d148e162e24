//! Typed not-found tolerance for object-storage calls.
//!
//! Callers pass a [`Tolerance`] naming which missing resources count as a
//! benign "already absent" outcome for that call. A tolerated error turns
//! into a successful `None`/no-op result; every other error propagates.

use std::fmt;

/// A resource whose absence a call may tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissingResource {
    /// The bucket does not exist (`NoSuchBucket`).
    Bucket,
    /// The bucket has no policy (`NoSuchBucketPolicy`).
    BucketPolicy,
}

impl MissingResource {
    /// Backend error code reporting this absence.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Bucket => "NoSuchBucket",
            Self::BucketPolicy => "NoSuchBucketPolicy",
        }
    }

    /// Classify a backend error code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NoSuchBucket" => Some(Self::Bucket),
            "NoSuchBucketPolicy" => Some(Self::BucketPolicy),
            _ => None,
        }
    }
}

impl fmt::Display for MissingResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Set of tolerated missing resources.
///
/// # Examples
///
/// ```
/// use cosi_s3::{MissingResource, Tolerance};
///
/// assert!(Tolerance::MISSING_POLICY.tolerates(MissingResource::BucketPolicy));
/// assert!(!Tolerance::MISSING_POLICY.tolerates(MissingResource::Bucket));
/// assert!(!Tolerance::NONE.tolerates(MissingResource::BucketPolicy));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tolerance {
    bucket: bool,
    bucket_policy: bool,
}

impl Tolerance {
    /// Tolerate nothing.
    pub const NONE: Self = Self {
        bucket: false,
        bucket_policy: false,
    };

    /// Tolerate a bucket without a policy.
    pub const MISSING_POLICY: Self = Self {
        bucket: false,
        bucket_policy: true,
    };

    /// Tolerate a missing bucket.
    pub const MISSING_BUCKET: Self = Self {
        bucket: true,
        bucket_policy: false,
    };

    /// Tolerate a missing bucket or a bucket without a policy.
    pub const MISSING_BUCKET_OR_POLICY: Self = Self {
        bucket: true,
        bucket_policy: true,
    };

    /// Whether `resource` is tolerated.
    #[must_use]
    pub fn tolerates(self, resource: MissingResource) -> bool {
        match resource {
            MissingResource::Bucket => self.bucket,
            MissingResource::BucketPolicy => self.bucket_policy,
        }
    }

    /// The tolerated resource reported by `code`, if any.
    #[must_use]
    pub fn tolerated_code(self, code: &str) -> Option<MissingResource> {
        MissingResource::from_code(code).filter(|r| self.tolerates(*r))
    }
}
