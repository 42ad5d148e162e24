//! Driver configuration.
//!
//! Provides [`DriverConfig`] for the provisioner and its backend clients.
//! Values are loaded from environment variables by [`DriverConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// COSI driver configuration.
///
/// # Examples
///
/// ```
/// use cosi_core::DriverConfig;
///
/// let config = DriverConfig::default();
/// assert_eq!(config.key_lock_size, 100);
/// assert_eq!(config.user_admin_port, 9443);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Number of slots in the per-bucket key lock pool.
    #[builder(default = 100)]
    pub key_lock_size: usize,

    /// Port the user-management endpoint is always addressed on.
    #[builder(default = 9443)]
    pub user_admin_port: u16,

    /// Request timeout of the user-management client, in seconds.
    #[builder(default = 60)]
    pub user_client_timeout_secs: u64,

    /// Request timeout of the object-storage client, in seconds.
    #[builder(default = 200)]
    pub s3_client_timeout_secs: u64,

    /// Signing region of the object-storage client.
    #[builder(default = String::from("us-east-1"))]
    pub s3_region: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            key_lock_size: 100,
            user_admin_port: 9443,
            user_client_timeout_secs: 60,
            s3_client_timeout_secs: 200,
            s3_region: String::from("us-east-1"),
        }
    }
}

impl DriverConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults
    /// when unset or unparseable):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `LOG_LEVEL` | `info` |
    /// | `KEY_LOCK_SIZE` | `100` |
    /// | `USER_ADMIN_PORT` | `9443` |
    /// | `USER_CLIENT_TIMEOUT_SECS` | `60` |
    /// | `S3_CLIENT_TIMEOUT_SECS` | `200` |
    /// | `S3_REGION` | `us-east-1` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(n) = parse_env("KEY_LOCK_SIZE") {
            config.key_lock_size = n;
        }
        if let Some(n) = parse_env("USER_ADMIN_PORT") {
            config.user_admin_port = n;
        }
        if let Some(n) = parse_env("USER_CLIENT_TIMEOUT_SECS") {
            config.user_client_timeout_secs = n;
        }
        if let Some(n) = parse_env("S3_CLIENT_TIMEOUT_SECS") {
            config.s3_client_timeout_secs = n;
        }
        if let Ok(v) = std::env::var("S3_REGION") {
            config.s3_region = v;
        }

        config
    }

    /// User-management client timeout as a [`Duration`].
    #[must_use]
    pub fn user_client_timeout(&self) -> Duration {
        Duration::from_secs(self.user_client_timeout_secs)
    }

    /// Object-storage client timeout as a [`Duration`].
    #[must_use]
    pub fn s3_client_timeout(&self) -> Duration {
        Duration::from_secs(self.s3_client_timeout_secs)
    }
}

/// Read and parse an environment variable, ignoring unset or malformed values.
fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.key_lock_size, 100);
        assert_eq!(config.user_admin_port, 9443);
        assert_eq!(config.user_client_timeout(), Duration::from_secs(60));
        assert_eq!(config.s3_client_timeout(), Duration::from_secs(200));
        assert_eq!(config.s3_region, "us-east-1");
    }

    #[test]
    fn test_should_match_builder_defaults() {
        assert_eq!(DriverConfig::builder().build(), DriverConfig::default());
    }

    #[test]
    fn test_should_load_from_env() {
        let config = DriverConfig::from_env();
        assert!(config.key_lock_size > 0);
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = DriverConfig::builder()
            .log_level("debug".into())
            .key_lock_size(16)
            .user_admin_port(19443)
            .user_client_timeout_secs(5)
            .s3_client_timeout_secs(10)
            .s3_region("eu-west-1".into())
            .build();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.key_lock_size, 16);
        assert_eq!(config.user_admin_port, 19443);
        assert_eq!(config.user_client_timeout_secs, 5);
        assert_eq!(config.s3_client_timeout_secs, 10);
        assert_eq!(config.s3_region, "eu-west-1");
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = DriverConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("keyLockSize"));
        assert!(json.contains("userAdminPort"));
        assert!(json.contains("s3ClientTimeoutSecs"));
    }
}
