//! # Control-Plane Types
//!
//! Identity and edge types shared by every crate of the region-leader
//! control plane.
//!
//! - [`RegionIdentifier`], [`NodeIdentifier`], [`ServiceIdentifier`]: opaque,
//!   totally ordered, hashable identity values. Equality is value equality.
//! - [`Link`]: an unordered pair of identifiers. `Link::new(a, b)` and
//!   `Link::new(b, a)` are equal and hash identically.
//! - [`compare_double`]: tolerant floating-point comparison used by the load
//!   model and the algorithms.
//!
//! ```rust
//! use types::{RegionIdentifier, RegionalLink};
//!
//! let a = RegionIdentifier::new("A");
//! let b = RegionIdentifier::new("B");
//! assert_eq!(RegionalLink::new(a.clone(), b.clone()), RegionalLink::new(b, a));
//! ```

pub mod common;

pub use common::errors::ValidationError;
pub use common::identifiers::{NodeIdentifier, RegionIdentifier, ServiceIdentifier};
pub use common::link::{Link, OverlayLink, RegionalLink};
pub use common::tolerance::{approx_eq, approx_zero, compare_double, DOUBLE_TOLERANCE};
