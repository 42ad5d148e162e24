//! Provisioning and deprovisioning of backend users.

use std::fmt;

use tracing::{info, warn};

use crate::api::UserApi;
use crate::error::{RemovalError, RemovalStep, UserResult};

/// Credentials minted for a principal by [`ensure_user`].
///
/// The `Debug` output never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// Principal locator of the user, used in bucket policies.
    pub principal_arn: String,
    /// Newly minted access key id.
    pub access_key_id: String,
    /// Newly minted secret access key.
    pub access_secret_key: String,
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("principal_arn", &self.principal_arn)
            .field("access_key_id", &self.access_key_id)
            .field("access_secret_key", &"<redacted>")
            .finish()
    }
}

/// Make sure `user_name` exists and mint a fresh access key for it.
///
/// An existing user is reused; a missing one is created. A new key is
/// minted on every call, so a lost secret is replaced by granting again.
///
/// # Errors
///
/// Any backend error other than "user not found" aborts the workflow.
pub async fn ensure_user(api: &dyn UserApi, user_name: &str) -> UserResult<UserInfo> {
    let principal_arn = match api.get_user(user_name).await? {
        Some(user) => {
            info!(user = user_name, arn = %user.arn, "reuse existing user");
            user.arn
        }
        None => api.create_user(user_name).await?.arn,
    };

    let key = api.create_access_key(user_name).await?;
    Ok(UserInfo {
        principal_arn,
        access_key_id: key.access_key_id,
        access_secret_key: key.secret_access_key,
    })
}

/// Delete every access key of `user_name`, then the user itself.
///
/// Absent keys and an absent user count as already deleted, so a retry after
/// a partial failure resumes where the previous attempt stopped.
///
/// # Errors
///
/// Returns a [`RemovalError`] naming the failed step and the keys deleted
/// and remaining at that point.
pub async fn remove_user(api: &dyn UserApi, user_name: &str) -> Result<(), RemovalError> {
    let keys: Vec<String> = api
        .list_access_keys(user_name)
        .await
        .map_err(|source| RemovalError {
            user: user_name.to_owned(),
            step: RemovalStep::ListAccessKeys,
            deleted_keys: Vec::new(),
            remaining_keys: Vec::new(),
            source,
        })?
        .into_iter()
        .map(|k| k.access_key_id)
        .collect();

    for (index, key) in keys.iter().enumerate() {
        if let Err(source) = api.delete_access_key(user_name, key).await {
            warn!(user = user_name, access_key_id = %key, error = %source, "delete access key failed");
            return Err(RemovalError {
                user: user_name.to_owned(),
                step: RemovalStep::DeleteAccessKey,
                deleted_keys: keys[..index].to_vec(),
                remaining_keys: keys[index..].to_vec(),
                source,
            });
        }
    }

    api.delete_user(user_name)
        .await
        .map_err(|source| RemovalError {
            user: user_name.to_owned(),
            step: RemovalStep::DeleteUser,
            deleted_keys: keys.clone(),
            remaining_keys: Vec::new(),
            source,
        })?;
    info!(user = user_name, deleted_keys = keys.len(), "remove user success");
    Ok(())
}
