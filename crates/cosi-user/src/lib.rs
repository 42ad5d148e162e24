//! User-management client for the COSI driver.
//!
//! The user-management backend only accepts signed GET calls whose
//! parameters, signature included, travel in the query string. This crate
//! provides:
//!
//! - [`SignedClient`], which signs and sends those calls
//! - [`UserApi`], the user and access-key operations built on top of it
//! - [`ensure_user`] and [`remove_user`], the provisioning and
//!   deprovisioning workflows used by grant and revoke

mod api;
mod client;
mod error;
mod workflow;

pub use api::UserApi;
pub use client::{SignedClient, SignedClientConfig};
pub use error::{RemovalError, RemovalStep, Sentinel, UserClientError, UserResult};
pub use workflow::{UserInfo, ensure_user, remove_user};
