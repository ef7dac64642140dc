pub mod errors;
pub mod identifiers;
pub mod link;
pub mod tolerance;
