//! The driver operations.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use cosi_core::{BackendCredentials, CredentialSource, DriverConfig, KeyLock, ResourceId};
use cosi_s3::{PolicyDocument, PolicyStatement, Tolerance};
use cosi_user::{ensure_user, remove_user};
use tracing::{error, info};

use crate::connector::{BackendConnector, HttpConnector};
use crate::error::{ProvisionerError, ProvisionerResult};
use crate::model::{
    ACCESS_KEY_ID, ACCESS_SECRET_KEY, ACCOUNT_SECRET_NAME, ACCOUNT_SECRET_NAMESPACE, BUCKET_ACL,
    BUCKET_LOCATION, CreateBucketRequest, CreateBucketResponse, CredentialDetails,
    DeleteBucketRequest, ENDPOINT, GrantBucketAccessRequest, GrantBucketAccessResponse,
    RevokeBucketAccessRequest, S3_PROTOCOL,
};
use crate::validation::{
    check_create_bucket, check_delete_bucket, check_grant_access, check_revoke_access,
};

/// Implements create-bucket, delete-bucket, grant-access and revoke-access.
///
/// Grant and revoke on the same bucket id are serialized through the
/// provisioner's [`KeyLock`]; the lock is held across every backend call of
/// the operation. Nothing is cached between calls.
pub struct Provisioner {
    credentials: Arc<dyn CredentialSource>,
    connector: Arc<dyn BackendConnector>,
    key_lock: KeyLock,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("key_lock_slots", &self.key_lock.len())
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Create a provisioner with a custom backend connector.
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn BackendConnector>,
        config: &DriverConfig,
    ) -> Self {
        Self {
            credentials,
            connector,
            key_lock: KeyLock::new(config.key_lock_size),
        }
    }

    /// Create a provisioner talking to the backends over HTTP.
    #[must_use]
    pub fn with_http(credentials: Arc<dyn CredentialSource>, config: DriverConfig) -> Self {
        let key_lock = KeyLock::new(config.key_lock_size);
        Self {
            credentials,
            connector: Arc::new(HttpConnector::new(config)),
            key_lock,
        }
    }

    /// Create a bucket owned by the account named in the parameters.
    ///
    /// Returns the bucket id `namespace/secret/bucket`.
    pub async fn create_bucket(
        &self,
        req: CreateBucketRequest,
    ) -> ProvisionerResult<CreateBucketResponse> {
        info!(bucket = %req.name, "handle DriverCreateBucket request");
        let result = self.do_create_bucket(&req).await;
        log_outcome("DriverCreateBucket", &result);
        result
    }

    /// Delete a bucket; a bucket that is already gone is not an error.
    pub async fn delete_bucket(&self, req: DeleteBucketRequest) -> ProvisionerResult<()> {
        info!(bucket_id = %req.bucket_id, "handle DriverDeleteBucket request");
        let result = self.do_delete_bucket(&req).await;
        log_outcome("DriverDeleteBucket", &result);
        result
    }

    /// Grant a principal access to a bucket and return fresh credentials.
    ///
    /// Granting twice leaves a single policy statement for the principal and
    /// mints a new key pair each time.
    pub async fn grant_bucket_access(
        &self,
        req: GrantBucketAccessRequest,
    ) -> ProvisionerResult<GrantBucketAccessResponse> {
        info!(
            bucket_id = %req.bucket_id,
            user = %req.name,
            authentication_type = ?req.authentication_type,
            "handle DriverGrantBucketAccess request"
        );
        let result = self.do_grant_bucket_access(&req).await;
        log_outcome("DriverGrantBucketAccess", &result);
        result
    }

    /// Revoke a principal's access: remove its backend user and its policy
    /// statement. Revoking an absent grant succeeds without writing.
    pub async fn revoke_bucket_access(
        &self,
        req: RevokeBucketAccessRequest,
    ) -> ProvisionerResult<()> {
        info!(
            bucket_id = %req.bucket_id,
            account_id = %req.account_id,
            "handle DriverRevokeBucketAccess request"
        );
        let result = self.do_revoke_bucket_access(&req).await;
        log_outcome("DriverRevokeBucketAccess", &result);
        result
    }
}

impl Provisioner {
    async fn do_create_bucket(
        &self,
        req: &CreateBucketRequest,
    ) -> ProvisionerResult<CreateBucketResponse> {
        check_create_bucket(req)?;
        let namespace = param(&req.parameters, ACCOUNT_SECRET_NAMESPACE);
        let name = param(&req.parameters, ACCOUNT_SECRET_NAME);

        let owner = self.resolve(namespace, name).await?;
        let storage = self
            .connector
            .object_storage(&owner)
            .map_err(ProvisionerError::storage("new s3 client"))?;

        let acl = optional_param(&req.parameters, BUCKET_ACL);
        let location = optional_param(&req.parameters, BUCKET_LOCATION);
        storage
            .create_bucket(&req.name, acl, location)
            .await
            .map_err(ProvisionerError::storage(format!("create bucket [{}]", req.name)))?;

        Ok(CreateBucketResponse {
            bucket_id: ResourceId::new(namespace, name, req.name.as_str()).encode(),
        })
    }

    async fn do_delete_bucket(&self, req: &DeleteBucketRequest) -> ProvisionerResult<()> {
        check_delete_bucket(&req.bucket_id)?;
        let bucket_id = decode(&req.bucket_id)?;
        let bucket = bucket_id.resource_name();

        let owner = self.resolve_id(&bucket_id).await?;
        let storage = self
            .connector
            .object_storage(&owner)
            .map_err(ProvisionerError::storage("new s3 client"))?;
        storage
            .delete_bucket(bucket)
            .await
            .map_err(ProvisionerError::storage(format!("delete bucket [{bucket}]")))
    }

    async fn do_grant_bucket_access(
        &self,
        req: &GrantBucketAccessRequest,
    ) -> ProvisionerResult<GrantBucketAccessResponse> {
        let model = check_grant_access(req)?;
        let _guard = self.key_lock.lock(&req.bucket_id).await;

        let bucket_id = decode(&req.bucket_id)?;
        let bucket = bucket_id.resource_name();
        let owner = self.resolve_id(&bucket_id).await?;
        let storage = self
            .connector
            .object_storage(&owner)
            .map_err(ProvisionerError::storage("new s3 client"))?;
        storage
            .head_bucket(bucket)
            .await
            .map_err(ProvisionerError::storage(format!("check bucket [{bucket}] existence")))?;

        let grantee_namespace = param(&req.parameters, ACCOUNT_SECRET_NAMESPACE);
        let grantee_name = param(&req.parameters, ACCOUNT_SECRET_NAME);
        let grantee = self.resolve(grantee_namespace, grantee_name).await?;
        let users = self
            .connector
            .user_api(&grantee)
            .map_err(ProvisionerError::user("new user client"))?;
        let user = ensure_user(users.as_ref(), &req.name)
            .await
            .map_err(ProvisionerError::user(format!("register user [{}]", req.name)))?;

        let statement =
            PolicyStatement::grant(req.name.as_str(), user.principal_arn.as_str(), model, bucket);
        let policy = match storage
            .get_bucket_policy(bucket, Tolerance::MISSING_POLICY)
            .await
            .map_err(ProvisionerError::storage(format!("get bucket [{bucket}] policy")))?
        {
            Some(mut policy) => {
                policy.merge(statement);
                policy
            }
            None => PolicyDocument::new(vec![statement]),
        };
        storage
            .put_bucket_policy(bucket, &policy, Tolerance::NONE)
            .await
            .map_err(ProvisionerError::storage(format!(
                "put bucket [{bucket}] policy about user [{}]",
                req.name
            )))?;
        info!(bucket, user = %req.name, model = %model, "granted bucket access");

        let secrets = BTreeMap::from([
            (ACCESS_KEY_ID.to_owned(), user.access_key_id),
            (ACCESS_SECRET_KEY.to_owned(), user.access_secret_key),
            (ENDPOINT.to_owned(), owner.endpoint),
        ]);
        Ok(GrantBucketAccessResponse {
            account_id: ResourceId::new(grantee_namespace, grantee_name, req.name.as_str())
                .encode(),
            credentials: HashMap::from([(S3_PROTOCOL.to_owned(), CredentialDetails { secrets })]),
        })
    }

    async fn do_revoke_bucket_access(
        &self,
        req: &RevokeBucketAccessRequest,
    ) -> ProvisionerResult<()> {
        check_revoke_access(req)?;
        let _guard = self.key_lock.lock(&req.bucket_id).await;

        let account_id = decode(&req.account_id)?;
        let bucket_id = decode(&req.bucket_id)?;
        let user_name = account_id.resource_name();
        let bucket = bucket_id.resource_name();

        let grantee = self.resolve_id(&account_id).await?;
        let users = self
            .connector
            .user_api(&grantee)
            .map_err(ProvisionerError::user("new user client"))?;
        remove_user(users.as_ref(), user_name).await?;

        let owner = self.resolve_id(&bucket_id).await?;
        let storage = self
            .connector
            .object_storage(&owner)
            .map_err(ProvisionerError::storage("new s3 client"))?;

        let tolerance = Tolerance::MISSING_BUCKET_OR_POLICY;
        let Some(policy) = storage
            .get_bucket_policy(bucket, tolerance)
            .await
            .map_err(ProvisionerError::storage(format!("get bucket [{bucket}] policy")))?
        else {
            info!(bucket, "bucket has no policy, skip remove policy operation");
            return Ok(());
        };

        let edited = policy.remove(user_name);
        if edited == policy {
            info!(
                bucket,
                user = user_name,
                "bucket policy has no statement about user, skip remove policy operation"
            );
            return Ok(());
        }

        // An empty statement list is rejected by the backend; drop the policy instead.
        if edited.is_empty() {
            info!(bucket, "bucket policy statement is empty, delete bucket policy directly");
            storage
                .delete_bucket_policy(bucket, tolerance)
                .await
                .map_err(ProvisionerError::storage(format!(
                    "delete bucket [{bucket}] entire policy"
                )))
        } else {
            storage
                .put_bucket_policy(bucket, &edited, tolerance)
                .await
                .map_err(ProvisionerError::storage(format!(
                    "remove bucket [{bucket}] policy about user [{user_name}]"
                )))
        }
    }

    async fn resolve(&self, namespace: &str, name: &str) -> ProvisionerResult<BackendCredentials> {
        self.credentials
            .credentials(namespace, name)
            .await
            .map_err(|source| ProvisionerError::Credentials {
                secret: format!("{namespace}/{name}"),
                source,
            })
    }

    async fn resolve_id(&self, id: &ResourceId) -> ProvisionerResult<BackendCredentials> {
        self.resolve(id.secret_namespace(), id.secret_name()).await
    }
}

fn decode(id: &str) -> ProvisionerResult<ResourceId> {
    ResourceId::decode(id).map_err(|source| ProvisionerError::ResourceId {
        id: id.to_owned(),
        source,
    })
}

fn param<'a>(parameters: &'a HashMap<String, String>, key: &str) -> &'a str {
    parameters.get(key).map_or("", String::as_str)
}

fn optional_param<'a>(parameters: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn log_outcome<T>(operation: &'static str, result: &ProvisionerResult<T>) {
    match result {
        Ok(_) => info!(operation, "handle request successfully"),
        Err(err) => error!(operation, error = %err, "handle request failed"),
    }
}
