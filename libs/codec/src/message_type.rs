//! Message type tags

use num_enum::TryFromPrimitive;
use std::fmt;

/// One-byte tag that opens every message on a peer link.
///
/// Values up to [`MessageType::Close`] belong to the transport; tag 2 is
/// unassigned. Application messages start above that range.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum MessageType {
    /// Handshake: nonce plus sender node identifier
    Hello = 1,

    /// Orderly shutdown of the link
    Close = 3,

    /// DCOP shared-information update
    DcopShare = 4,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Hello => "HELLO",
            MessageType::Close => "CLOSE",
            MessageType::DcopShare => "DCOP_SHARE",
        };
        f.write_str(name)
    }
}
