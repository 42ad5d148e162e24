//! Grant flows through both HTTP clients.

#[cfg(test)]
mod tests {
    use cosi_provisioner::model::{ACCESS_KEY_ID, ACCESS_SECRET_KEY, ENDPOINT, S3_PROTOCOL};
    use cosi_provisioner::ProvisionerError;
    use cosi_s3::{AccessModel, PolicyDocument, PolicyStatement};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    use crate::{
        Backends, GRANTEE_SECRET, NAMESPACE, access_key_body, grant_request, s3_error,
        test_bucket_name, user_body, user_error,
    };

    async fn mock_bucket_exists(backends: &Backends, bucket: &str) {
        Mock::given(method("HEAD"))
            .and(path(format!("/{bucket}")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&backends.s3)
            .await;
    }

    async fn mock_policy_put(backends: &Backends, bucket: &str) {
        Mock::given(method("PUT"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&backends.s3)
            .await;
    }

    async fn written_policy(backends: &Backends) -> anyhow::Result<PolicyDocument> {
        let bodies = backends.s3_bodies("PUT").await;
        assert_eq!(bodies.len(), 1, "exactly one policy write");
        Ok(serde_json::from_slice(&bodies[0])?)
    }

    #[tokio::test]
    async fn test_should_create_user_and_policy_for_new_grant() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("grant");
        mock_bucket_exists(&backends, &bucket).await;
        Mock::given(method("GET"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(404).set_body_string(s3_error("NoSuchBucketPolicy")))
            .mount(&backends.s3)
            .await;
        mock_policy_put(&backends, &bucket).await;
        backends.mock_user_action("GetUser", 404, user_error("NoSuchEntity")).await;
        backends.mock_user_action("CreateUser", 200, user_body("CreateUser", "alice")).await;
        backends
            .mock_user_action("CreateAccessKey", 200, access_key_body("alice", "AKALICE", "SKALICE"))
            .await;

        let resp = backends
            .provisioner()
            .grant_bucket_access(grant_request(&bucket, "alice"))
            .await?;

        assert_eq!(resp.account_id, format!("{NAMESPACE}/{GRANTEE_SECRET}/alice"));
        let secrets = &resp.credentials[S3_PROTOCOL].secrets;
        assert_eq!(secrets[ACCESS_KEY_ID], "AKALICE");
        assert_eq!(secrets[ACCESS_SECRET_KEY], "SKALICE");
        assert_eq!(secrets[ENDPOINT], backends.s3.uri());

        let policy = written_policy(&backends).await?;
        assert_eq!(policy.statement.len(), 1);
        assert_eq!(policy.statement[0].sid, "alice");
        assert_eq!(
            policy.statement[0],
            PolicyStatement::grant("alice", "arn:aws:iam::100:user/alice", AccessModel::ReadWrite, &bucket)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_should_replace_existing_statement_in_place() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("regrant");
        let existing = PolicyDocument::new(vec![
            PolicyStatement::grant("alice", "arn:aws:iam::100:user/alice", AccessModel::ReadWrite, &bucket),
            PolicyStatement::grant("bob", "arn:aws:iam::100:user/bob", AccessModel::ReadWrite, &bucket),
        ]);
        mock_bucket_exists(&backends, &bucket).await;
        Mock::given(method("GET"))
            .and(path(format!("/{bucket}")))
            .and(query_param("policy", ""))
            .respond_with(ResponseTemplate::new(200).set_body_string(existing.to_json()?))
            .mount(&backends.s3)
            .await;
        mock_policy_put(&backends, &bucket).await;
        backends.mock_user_action("GetUser", 200, user_body("GetUser", "alice")).await;
        Mock::given(method("GET"))
            .and(query_param("Action", "CreateUser"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&backends.users)
            .await;
        backends
            .mock_user_action("CreateAccessKey", 200, access_key_body("alice", "AKNEW", "SKNEW"))
            .await;

        let mut req = grant_request(&bucket, "alice");
        req.parameters
            .insert("bucketPolicyModel".to_owned(), "ro".to_owned());
        backends.provisioner().grant_bucket_access(req).await?;

        let policy = written_policy(&backends).await?;
        let sids: Vec<_> = policy.statement.iter().map(|s| s.sid.as_str()).collect();
        assert_eq!(sids, ["alice", "bob"]);
        assert_eq!(policy.statement[0].action, AccessModel::ReadOnly.actions());
        Ok(())
    }

    #[tokio::test]
    async fn test_should_fail_grant_when_bucket_is_missing() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("missing");
        Mock::given(method("HEAD"))
            .and(path(format!("/{bucket}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&backends.s3)
            .await;

        let err = backends
            .provisioner()
            .grant_bucket_access(grant_request(&bucket, "alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionerError::Storage { .. }));
        assert!(err.to_string().contains("NoSuchBucket"));
        let user_calls = backends.users.received_requests().await.unwrap_or_default();
        assert!(user_calls.is_empty(), "no user is provisioned for a missing bucket");
        Ok(())
    }
}
