//! Bucket policy model and object-storage client for the COSI driver.
//!
//! - [`policy`] holds the [`PolicyDocument`] model with merge-by-sid and
//!   remove-by-sid, and the statement builder used for grants
//! - [`Tolerance`] names the missing resources a call treats as benign
//! - [`ObjectStorage`] is the bucket and bucket-policy seam, implemented over
//!   HTTP by [`S3Client`]

mod client;
mod error;
pub mod policy;
mod storage;
mod tolerance;

pub use client::{S3Client, S3ClientConfig};
pub use error::{S3ClientError, S3Result};
pub use policy::{AccessModel, Effect, InvalidAccessModel, PolicyDocument, PolicyStatement, Principal};
pub use storage::ObjectStorage;
pub use tolerance::{MissingResource, Tolerance};
