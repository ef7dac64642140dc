//! Hello exchange on a freshly opened stream

use super::settings::PeerSettings;
use crate::{Result, TransportError};
use codec::{read_message_type, HelloMessage, MessageType, ProtocolError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use types::NodeIdentifier;

/// Dial `addr`, send our hello with `nonce`, and wait for the peer's hello
pub(crate) async fn dial(
    addr: SocketAddr,
    own: &NodeIdentifier,
    nonce: u32,
    settings: &PeerSettings,
) -> Result<(TcpStream, HelloMessage)> {
    debug!(peer = %addr, state = "CONNECTING", "dialing neighbor");
    let mut stream = timeout(settings.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| TransportError::timeout(format!("connect to {addr}"), millis(settings.connect_timeout)))?
        .map_err(|e| TransportError::connection_with_source("failed to connect", Some(addr), e))?;
    stream.set_nodelay(true)?;

    let hello = exchange(&mut stream, own, nonce, settings).await?;
    Ok((stream, hello))
}

/// Answer an inbound connection with our hello and wait for the peer's
pub(crate) async fn accept(
    stream: &mut TcpStream,
    own: &NodeIdentifier,
    nonce: u32,
    settings: &PeerSettings,
) -> Result<HelloMessage> {
    stream.set_nodelay(true)?;
    exchange(stream, own, nonce, settings).await
}

async fn exchange(
    stream: &mut TcpStream,
    own: &NodeIdentifier,
    nonce: u32,
    settings: &PeerSettings,
) -> Result<HelloMessage> {
    let remote = stream.peer_addr().ok();
    debug!(peer = ?remote, state = "HANDSHAKING", nonce, "sending hello");
    HelloMessage::new(nonce, own.clone()).write_to(stream).await?;

    let read_hello = async {
        match read_message_type(&mut *stream).await? {
            MessageType::Hello => HelloMessage::read_body(&mut *stream, settings.max_field_size).await,
            other => Err(ProtocolError::UnexpectedMessageType {
                expected: MessageType::Hello,
                actual: other,
            }),
        }
    };

    let hello = timeout(settings.handshake_timeout, read_hello)
        .await
        .map_err(|_| TransportError::timeout("handshake", millis(settings.handshake_timeout)))??;
    debug!(peer = ?remote, node = %hello.node, remote_nonce = hello.nonce, "hello received");
    Ok(hello)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
