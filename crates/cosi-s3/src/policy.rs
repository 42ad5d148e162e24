//! Bucket policy documents.
//!
//! A [`PolicyDocument`] is an ordered list of [`PolicyStatement`]s keyed by
//! their `Sid`. Grants are added with [`PolicyDocument::merge`] and revoked
//! with [`PolicyDocument::remove`]; both preserve the relative order of the
//! other statements.
//!
//! Backends emit `Action`, `Resource` and principal values either as a single
//! string or as a list; both shapes are accepted and lists are always written.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use typed_builder::TypedBuilder;

/// Policy language version written into every new document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Principal map key for backend users.
pub const AWS_PRINCIPAL: &str = "AWS";

/// Actions granted by [`AccessModel::ReadOnly`].
pub const READ_ONLY_ACTIONS: &[&str] = &[
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:ListMultipartUploadParts",
    "s3:GetObjectAcl",
    "s3:GetObjectVersionAcl",
    "s3:ListBucketVersions",
    "s3:ListBucket",
    "s3:ListBucketMultiPartUploads",
];

/// Actions granted by [`AccessModel::ReadWrite`].
pub const READ_WRITE_ACTIONS: &[&str] = &[
    "s3:GetObject",
    "s3:GetObjectVersion",
    "s3:ListMultipartUploadParts",
    "s3:GetObjectAcl",
    "s3:GetObjectVersionAcl",
    "s3:ListBucketVersions",
    "s3:ListBucket",
    "s3:ListBucketMultiPartUploads",
    "s3:AbortMultipartUpload",
    "s3:PutObjectAcl",
    "s3:DeleteObjectVersion",
    "s3:PutObjectVersionAcl",
    "s3:PutObject",
    "s3:DeleteObject",
];

/// Resource locator of a bucket.
///
/// # Examples
///
/// ```
/// assert_eq!(cosi_s3::policy::bucket_arn("photos"), "arn:aws:s3:::photos");
/// ```
#[must_use]
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}")
}

/// Resource locator of every object in a bucket.
///
/// # Examples
///
/// ```
/// assert_eq!(cosi_s3::policy::objects_arn("photos"), "arn:aws:s3:::photos/*");
/// ```
#[must_use]
pub fn objects_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}/*")
}

/// Access level requested for a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessModel {
    /// Read and write objects (`rw`).
    #[default]
    ReadWrite,
    /// Read objects only (`ro`).
    ReadOnly,
}

impl AccessModel {
    /// Actions a statement of this model allows, in a fixed order.
    #[must_use]
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            Self::ReadWrite => READ_WRITE_ACTIONS,
            Self::ReadOnly => READ_ONLY_ACTIONS,
        }
    }

    /// Parameter value naming this model.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWrite => "rw",
            Self::ReadOnly => "ro",
        }
    }
}

impl fmt::Display for AccessModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an access model parameter is neither `rw` nor `ro`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bucket policy model [{0}], must be one of [rw, ro]")]
pub struct InvalidAccessModel(pub String);

impl FromStr for AccessModel {
    type Err = InvalidAccessModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rw" => Ok(Self::ReadWrite),
            "ro" => Ok(Self::ReadOnly),
            other => Err(InvalidAccessModel(other.to_owned())),
        }
    }
}

/// Whether a statement allows or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Allow the actions.
    Allow,
    /// Deny the actions.
    Deny,
}

/// Who a statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, from = "RawPrincipal")]
pub enum Principal {
    /// A bare string principal, typically `"*"`.
    Any(String),
    /// Principal kind (e.g. `AWS`) to locators.
    Map(BTreeMap<String, Vec<String>>),
}

impl Principal {
    /// Principal naming backend users by locator.
    #[must_use]
    pub fn aws<I, S>(locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Map(BTreeMap::from([(
            AWS_PRINCIPAL.to_owned(),
            locators.into_iter().map(Into::into).collect(),
        )]))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrincipal {
    Any(String),
    Map(BTreeMap<String, OneOrMany>),
}

impl From<RawPrincipal> for Principal {
    fn from(raw: RawPrincipal) -> Self {
        match raw {
            RawPrincipal::Any(s) => Self::Any(s),
            RawPrincipal::Map(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into_vec())).collect())
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::deserialize(deserializer).map(OneOrMany::into_vec)
}

/// One statement of a bucket policy.
///
/// # Examples
///
/// ```
/// use cosi_s3::policy::{AccessModel, PolicyStatement};
///
/// let stmt = PolicyStatement::grant("alice", "arn:aws:iam::1:user/alice", AccessModel::ReadOnly, "photos");
/// assert_eq!(stmt.resource, ["arn:aws:s3:::photos", "arn:aws:s3:::photos/*"]);
/// assert_eq!(stmt.action.len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Statement id; the join key within a document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    #[builder(setter(into))]
    pub sid: String,

    /// Allow or deny.
    #[builder(default = Effect::Allow)]
    pub effect: Effect,

    /// Who the statement applies to.
    pub principal: Principal,

    /// Allowed or denied actions, in order.
    #[serde(deserialize_with = "one_or_many")]
    #[builder(default)]
    pub action: Vec<String>,

    /// Resource locators, in order.
    #[serde(deserialize_with = "one_or_many")]
    #[builder(default)]
    pub resource: Vec<String>,

    /// Condition block, carried through unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub condition: Option<serde_json::Value>,
}

impl PolicyStatement {
    /// Allow statement granting `model` on `bucket` and its objects to the
    /// user at `principal_arn`, keyed by `sid`.
    #[must_use]
    pub fn grant(
        sid: impl Into<String>,
        principal_arn: impl Into<String>,
        model: AccessModel,
        bucket: &str,
    ) -> Self {
        Self::builder()
            .sid(sid)
            .principal(Principal::aws([principal_arn.into()]))
            .action(model.actions().iter().map(|a| (*a).to_owned()).collect())
            .resource(vec![bucket_arn(bucket), objects_arn(bucket)])
            .build()
    }
}

/// A bucket policy.
///
/// Equality is structural over the ordered statement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Optional document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Policy language version.
    pub version: String,

    /// Statements, in order.
    #[serde(default)]
    pub statement: Vec<PolicyStatement>,
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl PolicyDocument {
    /// New document at [`POLICY_VERSION`] with the given statements.
    #[must_use]
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            id: None,
            version: POLICY_VERSION.to_owned(),
            statement: statements,
        }
    }

    /// Insert `statement`, replacing in place every statement with the same
    /// `sid`, or appending it if none matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use cosi_s3::policy::{AccessModel, PolicyDocument, PolicyStatement};
    ///
    /// let mut doc = PolicyDocument::default();
    /// let stmt = PolicyStatement::grant("alice", "arn:a", AccessModel::ReadWrite, "b");
    /// doc.merge(stmt.clone());
    /// doc.merge(stmt);
    /// assert_eq!(doc.statement.len(), 1);
    /// ```
    pub fn merge(&mut self, statement: PolicyStatement) {
        let mut matched = false;
        for existing in self.statement.iter_mut().filter(|s| s.sid == statement.sid) {
            existing.clone_from(&statement);
            matched = true;
        }
        if !matched {
            self.statement.push(statement);
        }
    }

    /// New document without the statements whose `sid` equals `sid`.
    ///
    /// The id and version are kept; an absent `sid` yields an equal document.
    #[must_use]
    pub fn remove(&self, sid: &str) -> Self {
        Self {
            id: self.id.clone(),
            version: self.version.clone(),
            statement: self
                .statement
                .iter()
                .filter(|s| s.sid != sid)
                .cloned()
                .collect(),
        }
    }

    /// Whether a statement with this `sid` exists.
    #[must_use]
    pub fn contains(&self, sid: &str) -> bool {
        self.statement.iter().any(|s| s.sid == sid)
    }

    /// Whether the document has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statement.is_empty()
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON policy.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the input is not a valid policy.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
