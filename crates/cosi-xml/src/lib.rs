//! XML bodies exchanged with the COSI driver's backends.
//!
//! The user-management API answers every call with an XML document such as
//! `<CreateUserResponse>` or, on failure, an `<ErrorResponse>` envelope. The
//! object-storage API reports failures as a flat `<Error>` element and takes
//! a `<CreateBucketConfiguration>` body when creating a bucket.
//!
//! # Key components
//!
//! - [`XmlDeserialize`] trait and [`from_xml`] for parsing response bodies
//! - [`XmlSerialize`] trait and [`to_xml`] for building request bodies
//! - [`types`] with the concrete document shapes

pub mod deserialize;
pub mod error;
pub mod serialize;
pub mod types;

pub use deserialize::{XmlDeserialize, from_xml};
pub use error::XmlError;
pub use serialize::{S3_NAMESPACE, XmlSerialize, to_xml};
pub use types::{
    AccessKey, AccessKeyMetadata, CreateAccessKeyResponse, CreateBucketConfiguration,
    CreateUserResponse, DeleteAccessKeyResponse, DeleteUserResponse, ErrorResponse,
    GetUserResponse, ListAccessKeysResponse, S3Error, User,
};
