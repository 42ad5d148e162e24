//! User and access-key operations of the user-management backend.

use std::collections::BTreeMap;

use cosi_xml::{
    AccessKey, AccessKeyMetadata, CreateAccessKeyResponse, CreateUserResponse,
    DeleteAccessKeyResponse, DeleteUserResponse, GetUserResponse, ListAccessKeysResponse, User,
    XmlDeserialize, from_xml,
};
use tracing::info;

use crate::client::{ACTION_PARAM, SignedClient};
use crate::error::{Sentinel, UserClientError, UserResult};

const USER_NAME_PARAM: &str = "UserName";
const ACCESS_KEY_ID_PARAM: &str = "AccessKeyId";

/// User lifecycle operations.
///
/// [`SignedClient`] is the HTTP implementation; tests substitute in-memory
/// fakes. Lookups and deletions report an absent user or key as
/// `None`, an empty list, or success rather than as an error.
#[async_trait::async_trait]
pub trait UserApi: Send + Sync {
    /// Create `user_name`.
    async fn create_user(&self, user_name: &str) -> UserResult<User>;

    /// Fetch `user_name`; `None` if it does not exist.
    async fn get_user(&self, user_name: &str) -> UserResult<Option<User>>;

    /// Delete `user_name`; an absent user is not an error.
    async fn delete_user(&self, user_name: &str) -> UserResult<()>;

    /// Mint a new access key for `user_name`.
    async fn create_access_key(&self, user_name: &str) -> UserResult<AccessKey>;

    /// Delete one access key; an absent key is not an error.
    async fn delete_access_key(&self, user_name: &str, access_key_id: &str) -> UserResult<()>;

    /// List the access keys of `user_name`; empty if the user does not exist.
    async fn list_access_keys(&self, user_name: &str) -> UserResult<Vec<AccessKeyMetadata>>;
}

impl SignedClient {
    /// Run `action` with the given parameters and decode the success body.
    async fn invoke<T: XmlDeserialize>(
        &self,
        action: &'static str,
        extra: &[(&str, &str)],
    ) -> UserResult<T> {
        let mut params = BTreeMap::from([(ACTION_PARAM.to_owned(), action.to_owned())]);
        for (key, value) in extra {
            params.insert((*key).to_owned(), (*value).to_owned());
        }
        let body = self.call(params).await?;
        from_xml(&body).map_err(|source| UserClientError::Xml {
            action: action.to_owned(),
            source,
        })
    }
}

/// Turn a `NoSuchEntity` error into `Ok(None)`.
fn absent_as_none<T>(result: UserResult<T>) -> UserResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_sentinel(Sentinel::NoSuchEntity) => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait::async_trait]
impl UserApi for SignedClient {
    async fn create_user(&self, user_name: &str) -> UserResult<User> {
        info!(user = user_name, "start to create user");
        let resp: CreateUserResponse = self
            .invoke("CreateUser", &[(USER_NAME_PARAM, user_name)])
            .await?;
        info!(user = user_name, request_id = %resp.request_id, "create user success");
        Ok(resp.user)
    }

    async fn get_user(&self, user_name: &str) -> UserResult<Option<User>> {
        info!(user = user_name, "start to get user");
        let result = self
            .invoke::<GetUserResponse>("GetUser", &[(USER_NAME_PARAM, user_name)])
            .await;
        match absent_as_none(result)? {
            Some(resp) => {
                info!(user = user_name, request_id = %resp.request_id, "get user success");
                Ok(Some(resp.user))
            }
            None => {
                info!(user = user_name, "user not exist");
                Ok(None)
            }
        }
    }

    async fn delete_user(&self, user_name: &str) -> UserResult<()> {
        info!(user = user_name, "start to delete user");
        let result = self
            .invoke::<DeleteUserResponse>("DeleteUser", &[(USER_NAME_PARAM, user_name)])
            .await;
        match absent_as_none(result)? {
            Some(resp) => {
                info!(user = user_name, request_id = %resp.request_id, "delete user success");
            }
            None => info!(user = user_name, "user is not exist"),
        }
        Ok(())
    }

    async fn create_access_key(&self, user_name: &str) -> UserResult<AccessKey> {
        info!(user = user_name, "start to create user access key");
        let resp: CreateAccessKeyResponse = self
            .invoke("CreateAccessKey", &[(USER_NAME_PARAM, user_name)])
            .await?;
        info!(
            user = user_name,
            access_key_id = %resp.access_key.access_key_id,
            request_id = %resp.request_id,
            "create user access key success"
        );
        Ok(resp.access_key)
    }

    async fn delete_access_key(&self, user_name: &str, access_key_id: &str) -> UserResult<()> {
        info!(user = user_name, access_key_id, "start to delete user access key");
        let result = self
            .invoke::<DeleteAccessKeyResponse>(
                "DeleteAccessKey",
                &[(USER_NAME_PARAM, user_name), (ACCESS_KEY_ID_PARAM, access_key_id)],
            )
            .await;
        match absent_as_none(result)? {
            Some(resp) => info!(
                user = user_name,
                access_key_id,
                request_id = %resp.request_id,
                "delete user access key success"
            ),
            None => info!(user = user_name, access_key_id, "user access key is not exist"),
        }
        Ok(())
    }

    async fn list_access_keys(&self, user_name: &str) -> UserResult<Vec<AccessKeyMetadata>> {
        info!(user = user_name, "start to list user access keys");
        let result = self
            .invoke::<ListAccessKeysResponse>("ListAccessKeys", &[(USER_NAME_PARAM, user_name)])
            .await;
        match absent_as_none(result)? {
            Some(resp) => {
                info!(
                    user = user_name,
                    count = resp.access_keys.len(),
                    request_id = %resp.request_id,
                    "list user access keys success"
                );
                Ok(resp.access_keys)
            }
            None => {
                info!(user = user_name, "user is not exist, no access keys");
                Ok(Vec::new())
            }
        }
    }
}
