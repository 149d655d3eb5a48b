//! Operation access classes and user grants.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Access class declared by a manifest operation.
///
/// Variants are ordered `Read < Write < Delete`; a grant covers an operation
/// when the granted access is greater than or equal to the declared one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Side-effect free reads.
    Read,
    /// Creates or modifies data.
    Write,
    /// Removes data.
    Delete,
}

impl Access {
    /// Returns the lowercase label used in manifests and tool descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    /// Returns `true` when a caller granted `self` may invoke an operation
    /// declaring `required`.
    #[must_use]
    pub fn covers(self, required: Access) -> bool {
        self >= required
    }
}

impl Display for Access {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level a user granted to one connected integration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// Connected but no operations are permitted.
    None,
    /// Only [`Access::Read`] operations.
    ReadOnly,
    /// Every operation, including deletes.
    #[default]
    ReadWrite,
}

impl AccessLevel {
    /// Returns the highest [`Access`] class this level grants, if any.
    #[must_use]
    pub const fn ceiling(self) -> Option<Access> {
        match self {
            Self::None => None,
            Self::ReadOnly => Some(Access::Read),
            Self::ReadWrite => Some(Access::Delete),
        }
    }
}
