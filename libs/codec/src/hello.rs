//! Handshake message

use crate::error::Result;
use crate::frame::{decode_object, encode_object, read_field, write_field};
use crate::message_type::MessageType;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use types::NodeIdentifier;

/// First message each side writes on a fresh connection.
///
/// The nonce decides which of two racing connections between the same pair
/// of leaders survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    pub nonce: u32,
    pub node: NodeIdentifier,
}

impl HelloMessage {
    pub fn new(nonce: u32, node: NodeIdentifier) -> Self {
        Self { nonce, node }
    }

    /// Write tag, nonce and node identifier, then flush
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let node = encode_object(&self.node, "hello node identifier")?;
        writer.write_u8(MessageType::Hello as u8).await?;
        writer.write_u32(self.nonce).await?;
        write_field(writer, &node, "hello node identifier").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read the body of a HELLO whose tag has already been consumed
    pub async fn read_body<R: AsyncRead + Unpin>(reader: &mut R, max_field: usize) -> Result<Self> {
        let nonce = reader.read_u32().await?;
        let bytes = read_field(reader, max_field, "hello node identifier").await?;
        let node = decode_object(&bytes, "hello node identifier")?;
        Ok(Self { nonce, node })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MAX_FIELD_SIZE;
    use crate::frame::read_message_type;

    #[tokio::test]
    async fn test_hello_layout() {
        let hello = HelloMessage::new(0x0102_0304, NodeIdentifier::new("leader-a"));
        let mut buffer = Vec::new();
        hello.write_to(&mut buffer).await.unwrap();

        assert_eq!(buffer[0], MessageType::Hello as u8);
        assert_eq!(&buffer[1..5], &[1, 2, 3, 4]);

        let mut reader = &buffer[..];
        assert_eq!(read_message_type(&mut reader).await.unwrap(), MessageType::Hello);
        let back = HelloMessage::read_body(&mut reader, DEFAULT_MAX_FIELD_SIZE).await.unwrap();
        assert_eq!(back, hello);
    }
}
