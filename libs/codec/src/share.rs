//! DCOP shared-information message

use crate::error::{ProtocolError, Result};
use crate::frame::{decode_object, encode_object, read_field, write_field};
use crate::message_type::MessageType;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use types::RegionIdentifier;

const REGION_CONTEXT: &str = "share region identifier";
const DATA_CONTEXT: &str = "share information";

/// A region's shared DCOP information, encoded once and sent to many peers.
///
/// Encoding happens in [`ShareMessage::encode`], so a payload that cannot be
/// serialized is reported before any connection is touched. Cloning shares
/// the encoded buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareMessage {
    region: RegionIdentifier,
    region_bytes: Bytes,
    data_bytes: Bytes,
}

impl ShareMessage {
    pub fn encode<P: Serialize>(region: RegionIdentifier, payload: &P) -> Result<Self> {
        let region_bytes = encode_object(&region, REGION_CONTEXT)?;
        let data_bytes = encode_object(payload, DATA_CONTEXT)?;
        if data_bytes.is_empty() {
            return Err(ProtocolError::encoding(DATA_CONTEXT, "payload encodes to zero bytes"));
        }
        Ok(Self {
            region,
            region_bytes: Bytes::from(region_bytes),
            data_bytes: Bytes::from(data_bytes),
        })
    }

    pub fn region(&self) -> &RegionIdentifier {
        &self.region
    }

    /// Number of bytes this message occupies on the wire
    pub fn wire_len(&self) -> usize {
        1 + 4 + self.region_bytes.len() + 4 + self.data_bytes.len()
    }

    /// Write tag, region field and data field, then flush
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(MessageType::DcopShare as u8).await?;
        write_field(writer, &self.region_bytes, REGION_CONTEXT).await?;
        write_field(writer, &self.data_bytes, DATA_CONTEXT).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read the body of a DCOP_SHARE whose tag has already been consumed.
    ///
    /// The region is decoded before the data field is read.
    pub async fn read_body<R, P>(reader: &mut R, max_field: usize) -> Result<(RegionIdentifier, P)>
    where
        R: AsyncRead + Unpin,
        P: DeserializeOwned,
    {
        let region_bytes = read_field(reader, max_field, REGION_CONTEXT).await?;
        let region: RegionIdentifier = decode_object(&region_bytes, REGION_CONTEXT)?;
        let data_bytes = read_field(reader, max_field, DATA_CONTEXT).await?;
        let payload: P = decode_object(&data_bytes, DATA_CONTEXT)?;
        Ok((region, payload))
    }
}
