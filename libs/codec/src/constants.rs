//! Framing constants

/// Smallest legal value of a field length prefix
pub const MINIMUM_FIELD_SIZE: i32 = 1;

/// Default upper bound on a single field, guarding against allocating on a
/// garbage length prefix
pub const DEFAULT_MAX_FIELD_SIZE: usize = 16 * 1024 * 1024;
