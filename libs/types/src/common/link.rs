//! Undirected links between two vertices

use crate::common::errors::ValidationError;
use crate::common::identifiers::{NodeIdentifier, RegionIdentifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An unordered pair of vertex identifiers.
///
/// Endpoints are kept in construction order for display, but equality and
/// hashing ignore that order: `Link::new(a, b) == Link::new(b, a)` and both
/// produce the same hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link<T> {
    left: T,
    right: T,
}

/// Link between two regions
pub type RegionalLink = Link<RegionIdentifier>;

/// Link between two nodes of the overlay network
pub type OverlayLink = Link<NodeIdentifier>;

impl<T: Ord> Link<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    /// Build a link, rejecting a vertex linked to itself
    pub fn try_new(left: T, right: T) -> Result<Self, ValidationError>
    where
        T: fmt::Display,
    {
        if left == right {
            return Err(ValidationError::SelfLink {
                endpoint: left.to_string(),
            });
        }
        Ok(Self { left, right })
    }

    pub fn left(&self) -> &T {
        &self.left
    }

    pub fn right(&self) -> &T {
        &self.right
    }

    /// Endpoints in canonical (ascending) order
    pub fn ordered(&self) -> (&T, &T) {
        if self.left <= self.right {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        }
    }

    pub fn contains(&self, vertex: &T) -> bool {
        &self.left == vertex || &self.right == vertex
    }

    /// The endpoint opposite `vertex`, or `None` if `vertex` is not on this link
    pub fn other(&self, vertex: &T) -> Option<&T> {
        if &self.left == vertex {
            Some(&self.right)
        } else if &self.right == vertex {
            Some(&self.left)
        } else {
            None
        }
    }
}

impl<T: Ord> PartialEq for Link<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl<T: Ord> Eq for Link<T> {}

impl<T: Ord + Hash> Hash for Link<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

impl<T: fmt::Display> fmt::Display for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_reversed_links_collapse_in_set() {
        let a = RegionIdentifier::new("A");
        let b = RegionIdentifier::new("B");
        let set: HashSet<_> = [
            RegionalLink::new(a.clone(), b.clone()),
            RegionalLink::new(b.clone(), a.clone()),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_other_endpoint() {
        let link = OverlayLink::new(NodeIdentifier::new("n1"), NodeIdentifier::new("n2"));
        assert_eq!(link.other(&NodeIdentifier::new("n1")), Some(&NodeIdentifier::new("n2")));
        assert_eq!(link.other(&NodeIdentifier::new("n3")), None);
        assert!(link.contains(&NodeIdentifier::new("n2")));
    }

    #[test]
    fn test_self_link_rejected() {
        let a = RegionIdentifier::new("A");
        assert!(RegionalLink::try_new(a.clone(), a).is_err());
    }

    proptest! {
        #[test]
        fn prop_link_equality_and_hash_are_symmetric(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let ab = RegionalLink::new(RegionIdentifier::new(a.clone()), RegionIdentifier::new(b.clone()));
            let ba = RegionalLink::new(RegionIdentifier::new(b), RegionIdentifier::new(a));
            prop_assert_eq!(&ab, &ba);
            prop_assert_eq!(hash_of(&ab), hash_of(&ba));
        }
    }
}
