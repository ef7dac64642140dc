//! Field framing over async byte streams
//!
//! Every function here works on any `AsyncRead`/`AsyncWrite`, so the same code
//! serves TCP halves in production and in-memory buffers in tests.

use crate::constants::MINIMUM_FIELD_SIZE;
use crate::error::{ProtocolError, Result};
use crate::message_type::MessageType;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Serialize a value into field bytes
pub fn encode_object<T: Serialize + ?Sized>(value: &T, context: &'static str) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| ProtocolError::encoding(context, e))
}

/// Deserialize field bytes into a value
pub fn decode_object<T: DeserializeOwned>(bytes: &[u8], context: &'static str) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| ProtocolError::decoding(context, e))
}

/// Read the one-byte tag that opens a message
pub async fn read_message_type<R: AsyncRead + Unpin>(reader: &mut R) -> Result<MessageType> {
    let tag = reader.read_u8().await?;
    MessageType::try_from(tag).map_err(|_| ProtocolError::UnknownMessageType { tag })
}

/// Write a length-prefixed field. Empty fields are refused since the reader
/// would treat their zero prefix as lost sync.
pub async fn write_field<W: AsyncWrite + Unpin>(
    writer: &mut W,
    bytes: &[u8],
    context: &'static str,
) -> Result<()> {
    let length = i32::try_from(bytes.len())
        .map_err(|_| ProtocolError::encoding(context, "field exceeds i32 length prefix"))?;
    if length < MINIMUM_FIELD_SIZE {
        return Err(ProtocolError::encoding(context, "field is empty"));
    }
    writer.write_i32(length).await?;
    writer.write_all(bytes).await?;
    Ok(())
}

/// Read a length-prefixed field.
///
/// A prefix below [`MINIMUM_FIELD_SIZE`] yields [`ProtocolError::SyncLost`].
/// Any other prefix up to `max_size` is read in full before returning.
pub async fn read_field<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: usize,
    context: &'static str,
) -> Result<Vec<u8>> {
    let length = reader.read_i32().await?;
    if length < MINIMUM_FIELD_SIZE {
        return Err(ProtocolError::sync_lost(length, context));
    }
    let length = length as usize;
    if length > max_size {
        return Err(ProtocolError::FieldTooLarge {
            length,
            max: max_size,
            context,
        });
    }

    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer).await?;
    trace!(context, bytes = length, "read field");
    Ok(buffer)
}

/// Write a CLOSE message and flush
pub async fn write_close<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer.write_u8(MessageType::Close as u8).await?;
    writer.flush().await?;
    Ok(())
}
