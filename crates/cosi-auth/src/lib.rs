//! Request signing for the COSI driver's backend clients.
//!
//! Two schemes are supported:
//!
//! - [`QuerySigner`] signs user-management calls by adding the key id,
//!   signature method and version, a timestamp and a base64 HMAC-SHA256
//!   `Signature` to the query string.
//! - [`SigV4Signer`] signs object-storage requests with AWS Signature
//!   Version 4 (`AWS4-HMAC-SHA256`) headers.
//!
//! # Modules
//!
//! - [`canonical`] - Canonical strings and query escaping for both schemes
//! - [`query`] - Query-parameter signing
//! - [`sigv4`] - SigV4 header signing

pub mod canonical;
pub mod query;
pub mod sigv4;

pub use query::QuerySigner;
pub use sigv4::{SigV4Signer, SignedRequestHeaders, hash_payload};
