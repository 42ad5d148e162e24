//! Bucket create/delete through the HTTP object-storage client.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use cosi_provisioner::model::{
        ACCOUNT_SECRET_NAME, ACCOUNT_SECRET_NAMESPACE, BUCKET_ACL, BUCKET_LOCATION,
    };
    use cosi_provisioner::{CreateBucketRequest, DeleteBucketRequest, ProvisionerError};
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, ResponseTemplate};

    use crate::{Backends, NAMESPACE, OWNER_SECRET, bucket_id, s3_error, test_bucket_name};

    #[tokio::test]
    async fn test_should_create_bucket_with_acl_and_location() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("create");
        Mock::given(method("PUT"))
            .and(path(format!("/{bucket}")))
            .and(header("x-amz-acl", "private"))
            .and(header_exists("authorization"))
            .and(body_string_contains("<LocationConstraint>eu-1</LocationConstraint>"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&backends.s3)
            .await;

        let resp = backends
            .provisioner()
            .create_bucket(CreateBucketRequest {
                name: bucket.clone(),
                parameters: HashMap::from([
                    (ACCOUNT_SECRET_NAME.to_owned(), OWNER_SECRET.to_owned()),
                    (ACCOUNT_SECRET_NAMESPACE.to_owned(), NAMESPACE.to_owned()),
                    (BUCKET_ACL.to_owned(), "private".to_owned()),
                    (BUCKET_LOCATION.to_owned(), "eu-1".to_owned()),
                ]),
            })
            .await?;

        assert_eq!(resp.bucket_id, bucket_id(&bucket));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_surface_create_conflict_as_internal() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("conflict");
        Mock::given(method("PUT"))
            .and(path(format!("/{bucket}")))
            .respond_with(ResponseTemplate::new(409).set_body_string(s3_error("BucketAlreadyExists")))
            .mount(&backends.s3)
            .await;

        let err = backends
            .provisioner()
            .create_bucket(CreateBucketRequest {
                name: bucket.clone(),
                parameters: HashMap::from([
                    (ACCOUNT_SECRET_NAME.to_owned(), OWNER_SECRET.to_owned()),
                    (ACCOUNT_SECRET_NAMESPACE.to_owned(), NAMESPACE.to_owned()),
                ]),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionerError::Storage { .. }));
        let status = err.to_status();
        assert_eq!(status.code.as_str(), "Internal");
        assert!(status.message.contains("BucketAlreadyExists"));
        Ok(())
    }

    #[tokio::test]
    async fn test_should_treat_deleting_missing_bucket_as_success() -> anyhow::Result<()> {
        let backends = Backends::start().await;
        let bucket = test_bucket_name("gone");
        Mock::given(method("DELETE"))
            .and(path(format!("/{bucket}")))
            .respond_with(ResponseTemplate::new(404).set_body_string(s3_error("NoSuchBucket")))
            .expect(1)
            .mount(&backends.s3)
            .await;

        backends
            .provisioner()
            .delete_bucket(DeleteBucketRequest {
                bucket_id: bucket_id(&bucket),
            })
            .await?;
        Ok(())
    }
}
