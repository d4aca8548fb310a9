//! Core identifier types and charge classes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
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
    /// A validated visit identifier.
    ///
    /// A visit is one continuous telescope-operation session for an
    /// observation. IDs are minted by the persistence layer and treated here
    /// as opaque comparable keys.
    VisitId, "visit ID"
);

define_string_id!(
    /// A validated atom identifier.
    ///
    /// An atom is a grouped unit of steps executed together as a sequence
    /// element.
    AtomId, "atom ID"
);

define_string_id!(
    /// A validated step identifier.
    ///
    /// A step is the smallest individually-recorded unit of instrument
    /// configuration and exposure.
    StepId, "step ID"
);

/// The billing category elapsed time is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChargeClass {
    /// Time not billed to anyone (e.g., weather loss already credited).
    NonCharged,
    /// Time billed to the partner allocation.
    Partner,
    /// Time billed to the science program.
    Program,
}

impl ChargeClass {
    /// All charge classes, in ascending order.
    pub const ALL: [Self; 3] = [Self::NonCharged, Self::Partner, Self::Program];

    /// String representation for database storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCharged => "non_charged",
            Self::Partner => "partner",
            Self::Program => "program",
        }
    }
}

impl fmt::Display for ChargeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChargeClass {
    type Err = UnknownChargeClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "non_charged" | "noncharged" => Ok(Self::NonCharged),
            "partner" => Ok(Self::Partner),
            "program" => Ok(Self::Program),
            _ => Err(UnknownChargeClass(s.to_string())),
        }
    }
}

impl Serialize for ChargeClass {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChargeClass {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown charge class strings.
#[derive(Debug, Clone)]
pub struct UnknownChargeClass(String);

impl fmt::Display for UnknownChargeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown charge class: {}", self.0)
    }
}

impl std::error::Error for UnknownChargeClass {}
