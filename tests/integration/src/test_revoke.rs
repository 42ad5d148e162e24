//! Revoke flows through both HTTP clients.

#[cfg(test)]
mod tests {
    use cosi_provisioner::RevokeBucketAccessRequest;
    use cosi_s3::{AccessModel, PolicyDocument, PolicyStatement};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use crate::{
        Backends, GRANTEE_SECRET, NAMESPACE, bucket_id, s3_error, test_bucket_name, user_error,
    };

    const LIST_TWO_KEYS: &str = "<ListAccessKeysResponse><ListAccessKeysResult>\
        <AccessKeyMetadata><member><AccessKeyId>AK1</AccessKeyId></member>\
        <member><AccessKeyId>AK2</AccessKeyId></member></AccessKeyMetadata>\
        </ListAccessKeysResult><ResponseMetadata><RequestId>req-list</RequestId>\
        </ResponseMetadata></ListAccessKeysResponse>";

    const DELETE_KEY_OK: &str = "<DeleteAccessKeyResponse><ResponseMetadata>\
        <RequestId>req-del-key</RequestId></ResponseMetadata></DeleteAccessKeyResponse>";

    const DELETE_USER_OK: &str = "<DeleteUserResponse><ResponseMetadata>\
        <RequestId>req-del-user</RequestId></ResponseMetadata></DeleteUserResponse>";

    fn revoke_request(bucket: &str, user: &str) -> RevokeBucketAccessRequest {
        RevokeBucketAccessRequest {
            bucket_id: bucket_id(bucket),
            account_id: format!("{NAMESPACE}/{GRANTEE_SECRET}/{user}"),
        }
    }

    async fn mock_user_removal(backends: &Backends) {
        backends.mock_user_action("ListAccessKeys", 200, LIST_TWO_KEYS.to_owned()).await;
        Mock::given(method("GET"))
            .and(query_param("Action", "DeleteAccessKey"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DELETE_KEY_OK))
            .expect(2)
            .mount(&backends.users)
            .await;
        Mock::given(method("GET"))
            .and(query_param("Action", "DeleteUser"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DELETE_USER_OK))
            .expect(1)
            .mount(&backends.users)
            .await;
    }

    async fn mock_policy(backends: &Backends, bucket: &str, policy: &PolicyDocument) -> anyhow::Result<()> {
        Mock::given(method("GET"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string(policy.to_json()?))
            .mount(&backends.s3)
            .await;
        Ok(())
    }

    fn statement(user: &str, bucket: &str) -> PolicyStatement {
        PolicyStatement::grant(user, format!("arn:aws:iam::100:user/{user}"), AccessModel::ReadWrite, bucket)
    }

    #[tokio::test]
    async fn test_should_remove_user_and_rewrite_policy() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("revoke");
        mock_user_removal(&backends).await;
        mock_policy(
            &backends,
            &bucket,
            &PolicyDocument::new(vec![statement("alice", &bucket), statement("bob", &bucket)]),
        )
        .await?;
        Mock::given(method("PUT"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&backends.s3)
            .await;

        backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await?;

        let bodies = backends.s3_bodies("PUT").await;
        let written: PolicyDocument = serde_json::from_slice(&bodies[0])?;
        assert_eq!(written, PolicyDocument::new(vec![statement("bob", &bucket)]));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_delete_policy_when_last_statement_goes() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("last");
        mock_user_removal(&backends).await;
        mock_policy(&backends, &bucket, &PolicyDocument::new(vec![statement("alice", &bucket)])).await?;
        Mock::given(method("DELETE"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&backends.s3)
            .await;

        backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await?;

        assert!(backends.s3_bodies("PUT").await.is_empty(), "an empty policy is never put");
        Ok(())
    }

    #[tokio::test]
    async fn test_should_not_write_when_principal_has_no_statement() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("absent");
        backends.mock_user_action("ListAccessKeys", 404, user_error("NoSuchEntity")).await;
        backends.mock_user_action("DeleteUser", 404, user_error("NoSuchEntity")).await;
        mock_policy(&backends, &bucket, &PolicyDocument::new(vec![statement("bob", &bucket)])).await?;

        backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await?;

        assert!(backends.s3_bodies("PUT").await.is_empty());
        assert!(backends.s3_bodies("DELETE").await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_succeed_without_writes_when_bucket_has_no_policy() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("nopolicy");
        backends.mock_user_action("ListAccessKeys", 404, user_error("NoSuchEntity")).await;
        backends.mock_user_action("DeleteUser", 404, user_error("NoSuchEntity")).await;
        Mock::given(method("GET"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(404).set_body_string(s3_error("NoSuchBucketPolicy")))
            .expect(1)
            .mount(&backends.s3)
            .await;

        backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await?;

        assert!(backends.s3_bodies("PUT").await.is_empty());
        assert!(backends.s3_bodies("DELETE").await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_succeed_when_bucket_is_gone() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("gone");
        backends.mock_user_action("ListAccessKeys", 404, user_error("NoSuchEntity")).await;
        backends.mock_user_action("DeleteUser", 404, user_error("NoSuchEntity")).await;
        Mock::given(method("GET"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(404).set_body_string(s3_error("NoSuchBucket")))
            .mount(&backends.s3)
            .await;

        backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_should_stop_before_policy_when_key_deletion_fails() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("partial");
        backends.mock_user_action("ListAccessKeys", 200, LIST_TWO_KEYS.to_owned()).await;
        backends.mock_user_action("DeleteAccessKey", 500, user_error("InternalError")).await;

        let err = backends
            .provisioner()
            .revoke_bucket_access(revoke_request(&bucket, "alice"))
            .await
            .unwrap_err();

        let message = err.to_status().message;
        assert!(message.contains("delete access key"), "{message}");
        assert!(message.contains("AK1"), "{message}");
        let s3_calls = backends.s3.received_requests().await.unwrap_or_default();
        assert!(s3_calls.is_empty(), "policy is untouched after a failed user removal");
        Ok(())
    }
}
