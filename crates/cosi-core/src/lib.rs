//! Core types, configuration, and shared plumbing for the COSI driver.
//!
//! This crate provides the building blocks used by both backend clients and
//! the provisioner:
//!
//! - [`ResourceId`], the composite `namespace/name/resource` identifier
//!   exchanged with the control plane as an opaque bucket or account id
//! - [`BackendCredentials`] and the [`CredentialSource`] seam that resolves them
//! - [`KeyLock`], a fixed-size pool of mutexes selected by key hash
//! - [`TlsMode`] and [`build_http_client`] for the backend HTTP clients
//! - [`DriverConfig`], environment-driven configuration

mod config;
mod credentials;
mod error;
mod keylock;
mod tls;
mod types;

pub use config::DriverConfig;
pub use credentials::{BackendCredentials, CredentialSource, SecretData, StaticCredentialSource};
pub use error::{CoreError, CoreResult};
pub use keylock::{KeyGuard, KeyLock, slot_for};
pub use tls::{TlsMode, build_http_client};
pub use types::ResourceId;
