//! Protocol-level errors for the peer-link codec
//!
//! The important split is between errors that leave the stream usable and
//! errors that mean the reader has lost track of message boundaries. The
//! latter are reported by [`ProtocolError::is_desync`] and require the
//! connection to be torn down.

use crate::message_type::MessageType;
use std::io;
use thiserror::Error;

/// Result alias for codec operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A field length prefix was below the minimum; framing is corrupt
    #[error("Stream sync lost: field length {length} below minimum {minimum} (reading {context})")]
    SyncLost {
        length: i32,
        minimum: i32,
        context: &'static str,
    },

    /// A field length prefix exceeded the configured maximum
    #[error("Field too large: {length} bytes exceeds maximum {max} (reading {context})")]
    FieldTooLarge {
        length: usize,
        max: usize,
        context: &'static str,
    },

    /// Type tag is not a known message type
    #[error("Unknown message type tag {tag}")]
    UnknownMessageType { tag: u8 },

    /// Known message type arrived where another was required
    #[error("Unexpected message type: expected {expected}, got {actual}")]
    UnexpectedMessageType {
        expected: MessageType,
        actual: MessageType,
    },

    /// Value could not be serialized; nothing was written
    #[error("Encoding failed for {context}: {message}")]
    Encoding {
        context: &'static str,
        message: String,
    },

    /// Field bytes did not decode to the expected value
    #[error("Decoding failed for {context}: {message}")]
    Decoding {
        context: &'static str,
        message: String,
    },

    /// Underlying stream failure
    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: io::ErrorKind, message: String },
}

impl ProtocolError {
    pub fn sync_lost(length: i32, context: &'static str) -> Self {
        Self::SyncLost {
            length,
            minimum: crate::constants::MINIMUM_FIELD_SIZE,
            context,
        }
    }

    pub fn encoding(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Encoding {
            context,
            message: err.to_string(),
        }
    }

    pub fn decoding(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decoding {
            context,
            message: err.to_string(),
        }
    }

    /// True only for the distinguished undersized-length condition
    pub fn is_sync_lost(&self) -> bool {
        matches!(self, Self::SyncLost { .. })
    }

    /// True when the stream can no longer be parsed and must be discarded
    pub fn is_desync(&self) -> bool {
        matches!(
            self,
            Self::SyncLost { .. }
                | Self::FieldTooLarge { .. }
                | Self::UnknownMessageType { .. }
                | Self::UnexpectedMessageType { .. }
                | Self::Decoding { .. }
        )
    }

    /// True when the peer closed the stream without a CLOSE message
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Io { kind: io::ErrorKind::UnexpectedEof, .. })
    }
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let lost = ProtocolError::sync_lost(0, "region");
        assert!(lost.is_sync_lost());
        assert!(lost.is_desync());

        let enc = ProtocolError::encoding("payload", "boom");
        assert!(!enc.is_desync());

        let eof: ProtocolError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(eof.is_eof());
        assert!(!eof.is_desync());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ProtocolError::sync_lost(-4, "shared information");
        let text = err.to_string();
        assert!(text.contains("-4"));
        assert!(text.contains("shared information"));
    }
}
