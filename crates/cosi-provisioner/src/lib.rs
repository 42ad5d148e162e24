//! Bucket lifecycle and access grant orchestration for the COSI driver.
//!
//! [`Provisioner`] implements the four driver operations: create-bucket,
//! delete-bucket, grant-access and revoke-access. Grant and revoke are
//! read-modify-write transactions on a bucket policy and run inside the
//! bucket's slot of a [`cosi_core::KeyLock`].
//!
//! Backend clients are obtained per call through the [`BackendConnector`]
//! seam; [`HttpConnector`] builds the real HTTP clients.

mod connector;
mod error;
pub mod model;
mod provisioner;
mod validation;

pub use connector::{BackendConnector, HttpConnector};
pub use error::{Code, ProvisionerError, ProvisionerResult, Status};
pub use model::{
    AuthenticationType, CreateBucketRequest, CreateBucketResponse, CredentialDetails,
    DeleteBucketRequest, GrantBucketAccessRequest, GrantBucketAccessResponse,
    RevokeBucketAccessRequest,
};
pub use provisioner::Provisioner;
