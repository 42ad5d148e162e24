//! Request shape checks, run before any backend call.

use std::collections::HashMap;

use cosi_s3::AccessModel;

use crate::error::{ProvisionerError, ProvisionerResult};
use crate::model::{
    ACCOUNT_SECRET_NAME, ACCOUNT_SECRET_NAMESPACE, AuthenticationType, BUCKET_POLICY_MODEL,
    CreateBucketRequest, GrantBucketAccessRequest, RevokeBucketAccessRequest,
};

const CREATE_BUCKET: &str = "DriverCreateBucket";
const DELETE_BUCKET: &str = "DriverDeleteBucket";
const GRANT_ACCESS: &str = "DriverGrantBucketAccess";
const REVOKE_ACCESS: &str = "DriverRevokeBucketAccess";

/// Require a non-empty value for `key`.
fn require_param<'a>(
    request: &'static str,
    parameters: &'a HashMap<String, String>,
    key: &str,
) -> ProvisionerResult<&'a str> {
    match parameters.get(key).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ProvisionerError::validation(request, format!("{key} value is empty"))),
    }
}

pub(crate) fn check_create_bucket(req: &CreateBucketRequest) -> ProvisionerResult<()> {
    if req.name.is_empty() {
        return Err(ProvisionerError::validation(CREATE_BUCKET, "empty bucket name"));
    }
    if req.parameters.is_empty() {
        return Err(ProvisionerError::validation(CREATE_BUCKET, "empty bucket parameters"));
    }
    require_param(CREATE_BUCKET, &req.parameters, ACCOUNT_SECRET_NAME)?;
    require_param(CREATE_BUCKET, &req.parameters, ACCOUNT_SECRET_NAMESPACE)?;
    Ok(())
}

pub(crate) fn check_delete_bucket(bucket_id: &str) -> ProvisionerResult<()> {
    if bucket_id.is_empty() {
        return Err(ProvisionerError::validation(DELETE_BUCKET, "empty bucket id"));
    }
    Ok(())
}

/// Check a grant and return the requested access model.
pub(crate) fn check_grant_access(req: &GrantBucketAccessRequest) -> ProvisionerResult<AccessModel> {
    if req.bucket_id.is_empty() {
        return Err(ProvisionerError::validation(GRANT_ACCESS, "empty bucket id"));
    }
    if req.name.is_empty() {
        return Err(ProvisionerError::validation(GRANT_ACCESS, "empty user name"));
    }
    match req.authentication_type {
        AuthenticationType::Key => {}
        AuthenticationType::Iam => {
            return Err(ProvisionerError::validation(
                GRANT_ACCESS,
                "IAM authentication type not implemented",
            ));
        }
        AuthenticationType::Unknown => {
            return Err(ProvisionerError::validation(
                GRANT_ACCESS,
                "unknown authentication type",
            ));
        }
    }
    require_param(GRANT_ACCESS, &req.parameters, ACCOUNT_SECRET_NAME)?;
    require_param(GRANT_ACCESS, &req.parameters, ACCOUNT_SECRET_NAMESPACE)?;

    match req.parameters.get(BUCKET_POLICY_MODEL) {
        None => Ok(AccessModel::default()),
        Some(model) => model
            .parse()
            .map_err(|e: cosi_s3::InvalidAccessModel| {
                ProvisionerError::validation(GRANT_ACCESS, e.to_string())
            }),
    }
}

pub(crate) fn check_revoke_access(req: &RevokeBucketAccessRequest) -> ProvisionerResult<()> {
    if req.bucket_id.is_empty() {
        return Err(ProvisionerError::validation(REVOKE_ACCESS, "empty bucket id"));
    }
    if req.account_id.is_empty() {
        return Err(ProvisionerError::validation(REVOKE_ACCESS, "empty account id"));
    }
    Ok(())
}
