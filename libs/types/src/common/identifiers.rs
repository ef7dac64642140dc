//! # Typed Identifiers
//!
//! Regions, nodes and services are named by strings in configuration and on
//! the wire. Each kind gets its own wrapper so a node name can never be passed
//! where a region is expected.

use crate::common::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates a string-backed identifier newtype.
///
/// The generated type is ordered and hashed by its inner string and
/// serializes transparently, so `"east"` in a TOML file or a bincode stream is
/// the identifier itself.
macro_rules! define_identifier {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Create an identifier, rejecting blank names
            pub fn new_validated(name: impl Into<String>) -> Result<Self, ValidationError> {
                let name = name.into();
                if name.trim().is_empty() {
                    return Err(ValidationError::EmptyIdentifier { kind: $kind });
                }
                Ok(Self(name))
            }

            /// Borrow the underlying name
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier, returning its name
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_identifier!(
    /// Identity of a region (a group of nodes run by one leader)
    RegionIdentifier, "region"
);

define_identifier!(
    /// Identity of a single machine in the overlay network
    NodeIdentifier, "node"
);

define_identifier!(
    /// Identity of an application service whose demand is being placed
    ServiceIdentifier, "service"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_equality() {
        let a = RegionIdentifier::new("east");
        let b = RegionIdentifier::from(String::from("east"));
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_ordering_follows_name() {
        let mut ids = vec![
            NodeIdentifier::new("c"),
            NodeIdentifier::new("a"),
            NodeIdentifier::new("b"),
        ];
        ids.sort();
        let names: Vec<_> = ids.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert_eq!(
            ServiceIdentifier::new_validated("  "),
            Err(ValidationError::EmptyIdentifier { kind: "service" })
        );
        assert!(ServiceIdentifier::new_validated("web").is_ok());
    }

    #[test]
    fn test_serializes_transparently() {
        let id = RegionIdentifier::new("west");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"west\"");
        let back: RegionIdentifier = serde_json::from_str("\"west\"").unwrap();
        assert_eq!(back, id);
    }
}
