//! Identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const MAX_PROVIDER_LEN: usize = 64;
const MAX_USER_LEN: usize = 256;

/// Identifier of an external integration, e.g. `github` or `google_drive`.
///
/// Provider ids prefix generated tool names, so they are restricted to
/// lowercase ASCII letters, digits, and underscores, starting with a letter.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a new provider identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProviderId`] if the supplied identifier is empty,
    /// too long, or contains unsupported characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_provider(&id)?;
        Ok(Self(id))
    }

    /// Returns the provider identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ProviderId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_provider(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidProviderId {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_PROVIDER_LEN {
        return Err(Error::InvalidProviderId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_PROVIDER_LEN}"),
        });
    }

    if !id.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(Error::InvalidProviderId {
            id: id.into(),
            reason: "identifier must start with a lowercase letter".into(),
        });
    }

    if !id
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
    {
        return Err(Error::InvalidProviderId {
            id: id.into(),
            reason: "identifier must contain lowercase alphanumeric or underscore".into(),
        });
    }

    Ok(())
}

/// Opaque identifier of the end user a session acts for.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUserId`] if the identifier is blank or too long.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidUserId {
                reason: "identifier cannot be empty".into(),
            });
        }
        if id.len() > MAX_USER_LEN {
            return Err(Error::InvalidUserId {
                reason: format!("identifier length must be <= {MAX_USER_LEN}"),
            });
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

/// Stable identifier of an asynchronous, externally fulfilled task.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a random task identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s.trim()).map_err(Error::from)?;
        Ok(Self::from_uuid(uuid))
    }
}
