//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Component bucket used for entries whose issue carries no component.
pub const UNASSIGNED_COMPONENT: &str = "Unassigned";

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid work type value.
    #[error("invalid work type: {value}")]
    InvalidWorkType { value: String },
}

/// The Development/Maintenance classification bucket used for reporting.
///
/// Every entry holds exactly one work type after classification; there is no
/// unclassified state because classification always falls through to
/// [`WorkType::Development`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkType {
    Development,
    Maintenance,
}

impl WorkType {
    /// All work types in report row order.
    pub const ALL: [Self; 2] = [Self::Development, Self::Maintenance];

    /// String representation used in report rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "Development",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Development" => Ok(Self::Development),
            "Maintenance" => Ok(Self::Maintenance),
            _ => Err(ValidationError::InvalidWorkType {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated issue key.
    ///
    /// Issue keys must be non-empty strings. They are unique upstream
    /// (e.g., "ERP-1042").
    IssueKey, "issue key"
);

define_string_id!(
    /// A validated project key.
    ///
    /// Project keys must be non-empty strings (e.g., "ERP").
    ProjectKey, "project key"
);

/// A person who logged time against an issue.
///
/// Identity follows the upstream account ID when present; contributors
/// without an account ID are compared by display name. The `active` flag
/// mirrors the upstream user record and lets exporters hide departed
/// team members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    /// Stable upstream account identifier, when known.
    pub account_id: Option<String>,

    /// Human-readable name used as the report column header.
    pub display_name: String,

    /// Whether the upstream user record is active.
    pub active: bool,
}

impl Contributor {
    /// Creates a contributor with the given display name and no account ID.
    #[must_use]
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            account_id: None,
            display_name: display_name.into(),
            active: true,
        }
    }

    /// The identity key used for grouping.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.account_id.as_deref().unwrap_or(&self.display_name)
    }
}

impl PartialEq for Contributor {
    fn eq(&self, other: &Self) -> bool {
        // Identity-based so Eq stays consistent with Hash.
        self.identity() == other.identity()
    }
}

impl Eq for Contributor {}

impl std::hash::Hash for Contributor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
