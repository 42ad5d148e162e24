//! End-to-end tests for the COSI driver.
//!
//! Each test starts two mock servers, one for object storage and one for
//! user management, and drives a [`Provisioner`] built on the real HTTP
//! clients against them.
//!
//! Run them with:
//! ```text
//! cargo test -p cosi-integration
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Once};

use cosi_core::{DriverConfig, StaticCredentialSource};
use cosi_provisioner::model::{ACCOUNT_SECRET_NAME, ACCOUNT_SECRET_NAMESPACE};
use cosi_provisioner::{AuthenticationType, GrantBucketAccessRequest, Provisioner};
use tracing_subscriber::EnvFilter;
use wiremock::MockServer;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

static INIT: Once = Once::new();

/// Namespace of both credential secrets.
pub const NAMESPACE: &str = "cosi";
/// Secret of the bucket owner account.
pub const OWNER_SECRET: &str = "bucket-owner";
/// Secret of the user-management account.
pub const GRANTEE_SECRET: &str = "user-admin";
/// Path of every user-management call.
pub const USER_API_PATH: &str = "/poe/rest";

/// Initialize tracing (once).
///
/// Uses `RUST_LOG` if set, otherwise the `LOG_LEVEL` of [`DriverConfig::from_env`].
fn init_tracing() {
    INIT.call_once(|| {
        let filter = log_filter(
            std::env::var("RUST_LOG").ok(),
            &DriverConfig::from_env().log_level,
        );
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Filter from `rust_log` when present, else from `log_level`; `warn` if
/// neither parses.
fn log_filter(rust_log: Option<String>, log_level: &str) -> EnvFilter {
    let directives = rust_log.as_deref().unwrap_or(log_level);
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// The two mocked backends of a test.
#[derive(Debug)]
pub struct Backends {
    /// Object-storage mock.
    pub s3: MockServer,
    /// User-management mock.
    pub users: MockServer,
}

impl Backends {
    /// Start both mock servers.
    pub async fn start() -> Self {
        init_tracing();
        Self {
            s3: MockServer::start().await,
            users: MockServer::start().await,
        }
    }

    /// A provisioner whose owner secret points at the object-storage mock
    /// and whose grantee secret points at the user-management mock.
    #[must_use]
    pub fn provisioner(&self) -> Provisioner {
        let credentials = StaticCredentialSource::new()
            .with_credentials(NAMESPACE, OWNER_SECRET, "OWNERAK", "OWNERSK", &self.s3.uri(), None)
            .with_credentials(
                NAMESPACE,
                GRANTEE_SECRET,
                "ADMINAK",
                "ADMINSK",
                &self.users.uri(),
                None,
            );
        let config = DriverConfig::builder()
            .user_admin_port(self.users.address().port())
            .user_client_timeout_secs(5)
            .s3_client_timeout_secs(5)
            .build();
        Provisioner::with_http(Arc::new(credentials), config)
    }

    /// Answer user-management `action` with `status` and `body`.
    pub async fn mock_user_action(&self, action: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(USER_API_PATH))
            .and(query_param("Action", action))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.users)
            .await;
    }

    /// Bodies of the requests the object-storage mock received with `verb`.
    pub async fn s3_bodies(&self, verb: &str) -> Vec<Vec<u8>> {
        self.s3
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == verb)
            .map(|r| r.body)
            .collect()
    }
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Bucket id handed out for `bucket` by create-bucket.
#[must_use]
pub fn bucket_id(bucket: &str) -> String {
    format!("{NAMESPACE}/{OWNER_SECRET}/{bucket}")
}

/// Key-authenticated grant of `user` on `bucket`.
#[must_use]
pub fn grant_request(bucket: &str, user: &str) -> GrantBucketAccessRequest {
    GrantBucketAccessRequest {
        bucket_id: bucket_id(bucket),
        name: user.to_owned(),
        authentication_type: AuthenticationType::Key,
        parameters: HashMap::from([
            (ACCOUNT_SECRET_NAME.to_owned(), GRANTEE_SECRET.to_owned()),
            (ACCOUNT_SECRET_NAMESPACE.to_owned(), NAMESPACE.to_owned()),
        ]),
    }
}

/// `<ErrorResponse>` envelope with `code`.
#[must_use]
pub fn user_error(code: &str) -> String {
    format!(
        "<ErrorResponse><Error><Code>{code}</Code><Message>{code}</Message></Error>\
         <RequestId>req-err</RequestId></ErrorResponse>"
    )
}

/// Success body of `GetUser` or `CreateUser` for `user`.
#[must_use]
pub fn user_body(action: &str, user: &str) -> String {
    format!(
        "<{action}Response><{action}Result><User><UserName>{user}</UserName>\
         <UserId>id-{user}</UserId><Arn>arn:aws:iam::100:user/{user}</Arn>\
         </User></{action}Result><ResponseMetadata><RequestId>req-user</RequestId>\
         </ResponseMetadata></{action}Response>"
    )
}

/// Success body of `CreateAccessKey`.
#[must_use]
pub fn access_key_body(user: &str, key_id: &str, secret: &str) -> String {
    format!(
        "<CreateAccessKeyResponse><CreateAccessKeyResult><AccessKey>\
         <UserName>{user}</UserName><AccessKeyId>{key_id}</AccessKeyId>\
         <Status>Active</Status><SecretAccessKey>{secret}</SecretAccessKey>\
         </AccessKey></CreateAccessKeyResult><ResponseMetadata>\
         <RequestId>req-key</RequestId></ResponseMetadata></CreateAccessKeyResponse>"
    )
}

/// S3 `<Error>` body with `code`.
#[must_use]
pub fn s3_error(code: &str) -> String {
    format!("<Error><Code>{code}</Code><Message>{code}</Message><RequestId>req-s3</RequestId></Error>")
}

mod test_bucket;
mod test_grant;
mod test_revoke;

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::log_filter;

    #[test]
    fn test_should_use_configured_log_level_without_rust_log() {
        let filter = log_filter(None, "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_should_let_rust_log_override_configured_level() {
        let filter = log_filter(Some("error".to_owned()), "debug");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_should_fall_back_to_warn_on_invalid_level() {
        let filter = log_filter(None, "cosi=loud");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }
}
