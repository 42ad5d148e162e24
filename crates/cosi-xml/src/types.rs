//! Document shapes of the user-management and object-storage APIs.

use std::fmt;
use std::io::{self, Write};

use quick_xml::{Reader, Writer};

use crate::deserialize::{
    XmlDeserialize, for_each_child, read_request_id, read_text_content, skip_element,
};
use crate::error::XmlError;
use crate::serialize::{XmlSerialize, write_text_element};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// User-management error envelope.
///
/// ```xml
/// <ErrorResponse>
///   <Error><Code>NoSuchEntity</Code><Message>...</Message></Error>
///   <RequestId>...</RequestId>
/// </ErrorResponse>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Backend error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for ErrorResponse {
    const ELEMENT: &'static str = "ErrorResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "Error" => for_each_child(reader, "Error", |reader, tag| {
                    match tag {
                        "Code" => out.code = read_text_content(reader)?,
                        "Message" => out.message = read_text_content(reader)?,
                        _ => skip_element(reader)?,
                    }
                    Ok(())
                })?,
                "RequestId" => out.request_id = read_text_content(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

/// Object-storage error body, a flat `<Error>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Error {
    /// S3 error code, e.g. `NoSuchBucketPolicy`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Resource the error refers to, if reported.
    pub resource: Option<String>,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for S3Error {
    const ELEMENT: &'static str = "Error";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "Code" => out.code = read_text_content(reader)?,
                "Message" => out.message = read_text_content(reader)?,
                "Resource" => out.resource = Some(read_text_content(reader)?),
                "RequestId" => out.request_id = read_text_content(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A backend user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// User name.
    pub user_name: String,
    /// User path.
    pub path: String,
    /// Backend user id.
    pub user_id: String,
    /// Principal locator used in bucket policies.
    pub arn: String,
    /// Creation time as reported by the backend.
    pub create_date: String,
}

impl XmlDeserialize for User {
    const ELEMENT: &'static str = "User";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "UserName" => out.user_name = read_text_content(reader)?,
                "Path" => out.path = read_text_content(reader)?,
                "UserId" => out.user_id = read_text_content(reader)?,
                "Arn" => out.arn = read_text_content(reader)?,
                "CreateDate" => out.create_date = read_text_content(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

/// Read `<{Action}Response><{Action}Result><User/></...><ResponseMetadata/>`.
fn read_user_response(
    reader: &mut Reader<&[u8]>,
    response: &str,
    result: &str,
) -> Result<(User, String), XmlError> {
    let mut user = None;
    let mut request_id = String::new();
    for_each_child(reader, response, |reader, tag| {
        if tag == result {
            for_each_child(reader, result, |reader, tag| {
                match tag {
                    "User" => user = Some(User::deserialize_xml(reader)?),
                    _ => skip_element(reader)?,
                }
                Ok(())
            })?;
        } else if tag == "ResponseMetadata" {
            request_id = read_request_id(reader)?;
        } else {
            skip_element(reader)?;
        }
        Ok(())
    })?;
    let user = user.ok_or_else(|| XmlError::MissingElement(format!("{result}/User")))?;
    Ok((user, request_id))
}

/// Body of a successful `CreateUser` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserResponse {
    /// The created user.
    pub user: User,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for CreateUserResponse {
    const ELEMENT: &'static str = "CreateUserResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let (user, request_id) = read_user_response(reader, Self::ELEMENT, "CreateUserResult")?;
        Ok(Self { user, request_id })
    }
}

/// Body of a successful `GetUser` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserResponse {
    /// The requested user.
    pub user: User,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for GetUserResponse {
    const ELEMENT: &'static str = "GetUserResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let (user, request_id) = read_user_response(reader, Self::ELEMENT, "GetUserResult")?;
        Ok(Self { user, request_id })
    }
}

/// Read a response that carries only `ResponseMetadata`.
fn read_metadata_only(reader: &mut Reader<&[u8]>, response: &str) -> Result<String, XmlError> {
    let mut request_id = String::new();
    for_each_child(reader, response, |reader, tag| {
        match tag {
            "ResponseMetadata" => request_id = read_request_id(reader)?,
            _ => skip_element(reader)?,
        }
        Ok(())
    })?;
    Ok(request_id)
}

/// Body of a successful `DeleteUser` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteUserResponse {
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for DeleteUserResponse {
    const ELEMENT: &'static str = "DeleteUserResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        Ok(Self {
            request_id: read_metadata_only(reader, Self::ELEMENT)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Access keys
// ---------------------------------------------------------------------------

/// A freshly created access key, including its secret.
///
/// The `Debug` output never includes the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessKey {
    /// Owning account id.
    pub account_id: String,
    /// Access key id.
    pub access_key_id: String,
    /// Key status, e.g. `Active`.
    pub status: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Creation time as reported by the backend.
    pub create_date: String,
    /// Owning user.
    pub user_name: String,
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessKey")
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("status", &self.status)
            .field("secret_access_key", &"<redacted>")
            .field("create_date", &self.create_date)
            .field("user_name", &self.user_name)
            .finish()
    }
}

impl XmlDeserialize for AccessKey {
    const ELEMENT: &'static str = "AccessKey";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "AccountId" => out.account_id = read_text_content(reader)?,
                "AccessKeyId" => out.access_key_id = read_text_content(reader)?,
                "Status" => out.status = read_text_content(reader)?,
                "SecretAccessKey" => out.secret_access_key = read_text_content(reader)?,
                "CreateDate" => out.create_date = read_text_content(reader)?,
                "UserName" => out.user_name = read_text_content(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

/// Body of a successful `CreateAccessKey` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccessKeyResponse {
    /// The created key.
    pub access_key: AccessKey,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for CreateAccessKeyResponse {
    const ELEMENT: &'static str = "CreateAccessKeyResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut access_key = None;
        let mut request_id = String::new();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "CreateAccessKeyResult" => {
                    for_each_child(reader, "CreateAccessKeyResult", |reader, tag| {
                        match tag {
                            "AccessKey" => access_key = Some(AccessKey::deserialize_xml(reader)?),
                            _ => skip_element(reader)?,
                        }
                        Ok(())
                    })?;
                }
                "ResponseMetadata" => request_id = read_request_id(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        let access_key = access_key.ok_or_else(|| {
            XmlError::MissingElement("CreateAccessKeyResult/AccessKey".to_owned())
        })?;
        Ok(Self {
            access_key,
            request_id,
        })
    }
}

/// Listing entry for an access key; carries no secret.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessKeyMetadata {
    /// Owning account id.
    pub account_id: String,
    /// Access key id.
    pub access_key_id: String,
    /// Key status.
    pub status: String,
    /// Creation time as reported by the backend.
    pub create_date: String,
    /// Owning user.
    pub user_name: String,
}

impl XmlDeserialize for AccessKeyMetadata {
    const ELEMENT: &'static str = "member";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "AccountId" => out.account_id = read_text_content(reader)?,
                "AccessKeyId" => out.access_key_id = read_text_content(reader)?,
                "Status" => out.status = read_text_content(reader)?,
                "CreateDate" => out.create_date = read_text_content(reader)?,
                "UserName" => out.user_name = read_text_content(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

/// Body of a successful `ListAccessKeys` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListAccessKeysResponse {
    /// Keys of the user, in backend order.
    pub access_keys: Vec<AccessKeyMetadata>,
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for ListAccessKeysResponse {
    const ELEMENT: &'static str = "ListAccessKeysResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        let mut out = Self::default();
        for_each_child(reader, Self::ELEMENT, |reader, tag| {
            match tag {
                "ListAccessKeysResult" => {
                    for_each_child(reader, "ListAccessKeysResult", |reader, tag| {
                        match tag {
                            "AccessKeyMetadata" => {
                                for_each_child(reader, "AccessKeyMetadata", |reader, tag| {
                                    match tag {
                                        "member" => out
                                            .access_keys
                                            .push(AccessKeyMetadata::deserialize_xml(reader)?),
                                        _ => skip_element(reader)?,
                                    }
                                    Ok(())
                                })?;
                            }
                            _ => skip_element(reader)?,
                        }
                        Ok(())
                    })?;
                }
                "ResponseMetadata" => out.request_id = read_request_id(reader)?,
                _ => skip_element(reader)?,
            }
            Ok(())
        })?;
        Ok(out)
    }
}

/// Body of a successful `DeleteAccessKey` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteAccessKeyResponse {
    /// Backend request id.
    pub request_id: String,
}

impl XmlDeserialize for DeleteAccessKeyResponse {
    const ELEMENT: &'static str = "DeleteAccessKeyResponse";

    fn deserialize_xml(reader: &mut Reader<&[u8]>) -> Result<Self, XmlError> {
        Ok(Self {
            request_id: read_metadata_only(reader, Self::ELEMENT)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Object-storage request bodies
// ---------------------------------------------------------------------------

/// Body of a create-bucket request that pins the bucket location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateBucketConfiguration {
    /// Location constraint, e.g. a region name.
    pub location_constraint: Option<String>,
}

impl CreateBucketConfiguration {
    /// Root element name.
    pub const ELEMENT: &'static str = "CreateBucketConfiguration";
}

impl XmlSerialize for CreateBucketConfiguration {
    fn serialize_xml<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        if let Some(location) = &self.location_constraint {
            write_text_element(writer, "LocationConstraint", location)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserialize::from_xml;
    use crate::serialize::to_xml;

    #[test]
    fn test_should_parse_error_envelope() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<ErrorResponse>
  <Error>
    <Code>NoSuchEntity</Code>
    <Message>The user with name alice cannot be found.</Message>
  </Error>
  <RequestId>req-1</RequestId>
</ErrorResponse>"#;
        let err: ErrorResponse = from_xml(xml).unwrap();
        assert_eq!(err.code, "NoSuchEntity");
        assert_eq!(err.message, "The user with name alice cannot be found.");
        assert_eq!(err.request_id, "req-1");
    }

    #[test]
    fn test_should_parse_s3_error() {
        let xml = b"<Error><Code>NoSuchBucketPolicy</Code><Message>none</Message>\
                    <Resource>/bucket</Resource><RequestId>r</RequestId></Error>";
        let err: S3Error = from_xml(xml).unwrap();
        assert_eq!(err.code, "NoSuchBucketPolicy");
        assert_eq!(err.resource.as_deref(), Some("/bucket"));
    }

    #[test]
    fn test_should_parse_create_user_response() {
        let xml = br#"<CreateUserResponse>
  <CreateUserResult>
    <User>
      <UserName>alice</UserName>
      <Path>/</Path>
      <UserId>u-1</UserId>
      <Arn>arn:aws:iam::123:user/alice</Arn>
      <CreateDate>2024-01-01T00:00:00Z</CreateDate>
    </User>
  </CreateUserResult>
  <ResponseMetadata><RequestId>req-2</RequestId></ResponseMetadata>
</CreateUserResponse>"#;
        let resp: CreateUserResponse = from_xml(xml).unwrap();
        assert_eq!(resp.user.user_name, "alice");
        assert_eq!(resp.user.arn, "arn:aws:iam::123:user/alice");
        assert_eq!(resp.user.user_id, "u-1");
        assert_eq!(resp.request_id, "req-2");
    }

    #[test]
    fn test_should_require_user_in_get_user_response() {
        let xml = b"<GetUserResponse><GetUserResult/></GetUserResponse>";
        let result = from_xml::<GetUserResponse>(xml);
        assert!(matches!(result, Err(XmlError::MissingElement(_))));
    }

    #[test]
    fn test_should_not_accept_create_response_as_get_response() {
        let xml = b"<CreateUserResponse><CreateUserResult><User/></CreateUserResult></CreateUserResponse>";
        let result = from_xml::<GetUserResponse>(xml);
        assert!(matches!(result, Err(XmlError::UnexpectedElement(_))));
    }

    #[test]
    fn test_should_parse_create_access_key_response() {
        let xml = b"<CreateAccessKeyResponse><CreateAccessKeyResult><AccessKey>\
                    <AccountId>123</AccountId><AccessKeyId>AKID</AccessKeyId>\
                    <Status>Active</Status><SecretAccessKey>s3cr3t/+x</SecretAccessKey>\
                    <UserName>alice</UserName></AccessKey></CreateAccessKeyResult>\
                    <ResponseMetadata><RequestId>req-3</RequestId></ResponseMetadata>\
                    </CreateAccessKeyResponse>";
        let resp: CreateAccessKeyResponse = from_xml(xml).unwrap();
        assert_eq!(resp.access_key.access_key_id, "AKID");
        assert_eq!(resp.access_key.secret_access_key, "s3cr3t/+x");
        assert_eq!(resp.request_id, "req-3");
        assert!(!format!("{:?}", resp.access_key).contains("s3cr3t"));
    }

    #[test]
    fn test_should_parse_list_access_keys_response() {
        let xml = b"<ListAccessKeysResponse><ListAccessKeysResult><AccessKeyMetadata>\
                    <member><AccessKeyId>K1</AccessKeyId><Status>Active</Status></member>\
                    <member><AccessKeyId>K2</AccessKeyId><Status>Inactive</Status></member>\
                    </AccessKeyMetadata></ListAccessKeysResult>\
                    <ResponseMetadata><RequestId>req-4</RequestId></ResponseMetadata>\
                    </ListAccessKeysResponse>";
        let resp: ListAccessKeysResponse = from_xml(xml).unwrap();
        let ids: Vec<&str> = resp.access_keys.iter().map(|k| k.access_key_id.as_str()).collect();
        assert_eq!(ids, ["K1", "K2"]);
        assert_eq!(resp.request_id, "req-4");
    }

    #[test]
    fn test_should_parse_empty_key_listing() {
        let xml = b"<ListAccessKeysResponse><ListAccessKeysResult><AccessKeyMetadata/>\
                    </ListAccessKeysResult></ListAccessKeysResponse>";
        let resp: ListAccessKeysResponse = from_xml(xml).unwrap();
        assert!(resp.access_keys.is_empty());
    }

    #[test]
    fn test_should_parse_delete_responses() {
        let user: DeleteUserResponse = from_xml(
            b"<DeleteUserResponse><ResponseMetadata><RequestId>d1</RequestId></ResponseMetadata></DeleteUserResponse>",
        )
        .unwrap();
        assert_eq!(user.request_id, "d1");

        let key: DeleteAccessKeyResponse = from_xml(
            b"<DeleteAccessKeyResponse><ResponseMetadata><RequestId>d2</RequestId></ResponseMetadata></DeleteAccessKeyResponse>",
        )
        .unwrap();
        assert_eq!(key.request_id, "d2");
    }

    #[test]
    fn test_should_serialize_location_constraint() {
        let config = CreateBucketConfiguration {
            location_constraint: Some("eu-west-1".to_owned()),
        };
        let xml = to_xml(CreateBucketConfiguration::ELEMENT, &config).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">"));
        assert!(xml.contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
    }
}
