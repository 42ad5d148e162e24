//! The composite resource identifier handed back to the control plane.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Separator between the three identifier segments.
const SEPARATOR: char = '/';

/// Number of segments in an encoded identifier.
const SEGMENTS: usize = 3;

/// Composite identifier of a bucket or an account grant.
///
/// Encoded as `secretNamespace/secretName/resourceName`. Segments are not
/// escaped, so a segment that itself contains `/` cannot be decoded back.
///
/// # Examples
///
/// ```
/// use cosi_core::ResourceId;
///
/// let id = ResourceId::new("ns", "secret", "bucket-a");
/// assert_eq!(id.encode(), "ns/secret/bucket-a");
///
/// let decoded: ResourceId = "ns/secret/bucket-a".parse().unwrap();
/// assert_eq!(decoded, id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    secret_namespace: String,
    secret_name: String,
    resource_name: String,
}

impl ResourceId {
    /// Create an identifier from its three segments.
    #[must_use]
    pub fn new(
        secret_namespace: impl Into<String>,
        secret_name: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            secret_namespace: secret_namespace.into(),
            secret_name: secret_name.into(),
            resource_name: resource_name.into(),
        }
    }

    /// Encode the identifier as `namespace/name/resource`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decode an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFormat`] if the input does not split into
    /// exactly three segments, and [`CoreError::InvalidValue`] if any segment
    /// is empty.
    pub fn decode(input: &str) -> Result<Self, CoreError> {
        let segments: Vec<&str> = input.split(SEPARATOR).collect();
        if segments.len() != SEGMENTS {
            return Err(CoreError::InvalidFormat(input.to_owned()));
        }

        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::InvalidValue(input.to_owned()));
        }

        Ok(Self::new(segments[0], segments[1], segments[2]))
    }

    /// Namespace of the credential secret.
    #[must_use]
    pub fn secret_namespace(&self) -> &str {
        &self.secret_namespace
    }

    /// Name of the credential secret.
    #[must_use]
    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Name of the bucket or the principal.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.secret_namespace, self.secret_name, self.resource_name
        )
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
