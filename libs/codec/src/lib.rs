//! # Region-Leader Wire Codec
//!
//! ## Purpose
//!
//! Encoding rules for the byte stream between two region leaders. The
//! transport itself (sockets, tasks, reconnects) lives in `network`; this
//! crate only knows how bytes are laid out.
//!
//! ## Wire Format
//!
//! ```text
//! message  := type:u8 body
//! HELLO    := nonce:u32be field(node identifier)
//! CLOSE    := (empty)
//! SHARE    := field(region identifier) field(shared information)
//! field    := len:i32be bytes[len]        len >= 1
//! ```
//!
//! Field contents are bincode-encoded values. A length below one means the
//! reader is no longer aligned with message boundaries; it is reported as
//! [`ProtocolError::SyncLost`] and the connection must be discarded.

pub mod constants;
pub mod error;
pub mod frame;
pub mod hello;
pub mod message_type;
pub mod share;

pub use constants::{DEFAULT_MAX_FIELD_SIZE, MINIMUM_FIELD_SIZE};
pub use error::{ProtocolError, Result};
pub use frame::{decode_object, encode_object, read_field, read_message_type, write_close, write_field};
pub use hello::HelloMessage;
pub use message_type::MessageType;
pub use share::ShareMessage;
