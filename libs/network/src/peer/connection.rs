//! One established link to a neighboring leader

use super::settings::PeerSettings;
use super::SharedPayload;
use crate::{Result, TransportError};
use codec::{read_message_type, write_close, MessageType, ProtocolError, ShareMessage};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use types::{NodeIdentifier, RegionIdentifier};

enum Incoming<P> {
    Share(RegionIdentifier, P),
    Close,
}

enum LoopExit {
    Cancelled,
    PeerClosed,
    Failed(ProtocolError),
}

/// A handshaken TCP link to one neighbor leader.
///
/// Writes are serialized through an async mutex around the write half. The
/// most recent `(region, payload)` received from the peer sits behind its own
/// lock, which only the receive task writes.
pub struct PeerConnection<P> {
    peer: NodeIdentifier,
    nonce: u32,
    remote_addr: Option<SocketAddr>,
    settings: PeerSettings,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    shared: Mutex<Option<(RegionIdentifier, P)>>,
    running: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<P: SharedPayload> PeerConnection<P> {
    /// Wrap a stream whose handshake has completed
    pub(crate) fn new(
        stream: TcpStream,
        peer: NodeIdentifier,
        nonce: u32,
        settings: PeerSettings,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let remote_addr = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        Arc::new(Self {
            peer,
            nonce,
            remote_addr,
            settings,
            writer: tokio::sync::Mutex::new(Some(write_half)),
            reader: Mutex::new(Some(read_half)),
            shared: Mutex::new(None),
            running: AtomicBool::new(true),
            cancel,
            task: Mutex::new(None),
        })
    }

    pub fn peer(&self) -> &NodeIdentifier {
        &self.peer
    }

    /// Dialer nonce this connection was installed under
    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Latest state if the peer has sent at least one update
    pub fn received_information(&self) -> Option<(RegionIdentifier, P)> {
        self.shared.lock().clone()
    }

    /// Spawn the receive loop. Does nothing if already started or terminated.
    pub(crate) fn start(self: &Arc<Self>) {
        if !self.is_running() {
            return;
        }
        let Some(read_half) = self.reader.lock().take() else {
            return;
        };
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.receive_loop(read_half).await });
        *self.task.lock() = Some(handle);
        info!(peer = %self.peer, nonce = self.nonce, remote = ?self.remote_addr, "neighbor connection established");
    }

    /// Send a share message. A no-op once the connection stopped running.
    pub async fn send(&self, message: &ShareMessage) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        let Some(half) = writer.as_mut() else {
            return Ok(());
        };
        match tokio::time::timeout(self.settings.write_timeout, message.write_to(half)).await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::timeout(
                format!("send to {}", self.peer),
                u64::try_from(self.settings.write_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Stop the receive loop and wait for it to release the socket.
    ///
    /// Safe to call more than once and from several tasks.
    pub async fn terminate(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    warn!(peer = %self.peer, error = %e, "receive task did not exit cleanly");
                }
            }
            None => self.close_stream().await,
        }
    }

    async fn receive_loop(self: Arc<Self>, read_half: OwnedReadHalf) {
        let mut reader = BufReader::new(read_half);
        let exit = loop {
            let incoming = tokio::select! {
                () = self.cancel.cancelled() => break LoopExit::Cancelled,
                incoming = Self::read_one(&mut reader, self.settings.max_field_size) => incoming,
            };
            match incoming {
                Ok(Incoming::Share(region, payload)) => {
                    debug!(peer = %self.peer, region = %region, "shared information received");
                    *self.shared.lock() = Some((region, payload));
                }
                Ok(Incoming::Close) => break LoopExit::PeerClosed,
                Err(e) => break LoopExit::Failed(e),
            }
        };

        match &exit {
            LoopExit::Cancelled => debug!(peer = %self.peer, "receive loop cancelled"),
            LoopExit::PeerClosed => info!(peer = %self.peer, "neighbor closed connection"),
            LoopExit::Failed(e) if e.is_desync() => {
                error!(peer = %self.peer, error = %e, "stream corrupt, dropping connection")
            }
            LoopExit::Failed(e) if self.cancel.is_cancelled() => {
                debug!(peer = %self.peer, error = %e, "read failed during shutdown")
            }
            LoopExit::Failed(e) => warn!(peer = %self.peer, error = %e, "read from neighbor failed"),
        }

        drop(reader);
        self.close_stream().await;
    }

    async fn read_one(
        reader: &mut BufReader<OwnedReadHalf>,
        max_field: usize,
    ) -> std::result::Result<Incoming<P>, ProtocolError> {
        match read_message_type(reader).await? {
            MessageType::DcopShare => {
                let (region, payload) = ShareMessage::read_body(reader, max_field).await?;
                Ok(Incoming::Share(region, payload))
            }
            MessageType::Close => Ok(Incoming::Close),
            other => Err(ProtocolError::UnexpectedMessageType {
                expected: MessageType::DcopShare,
                actual: other,
            }),
        }
    }

    /// Best-effort CLOSE, release the write half, then mark not running
    async fn close_stream(&self) {
        {
            let mut writer = self.writer.lock().await;
            if let Some(mut half) = writer.take() {
                if let Err(e) = write_close(&mut half).await {
                    debug!(peer = %self.peer, error = %e, "close notification not delivered");
                }
                let _ = half.shutdown().await;
            }
        }
        self.reader.lock().take();
        self.running.store(false, Ordering::SeqCst);
    }
}

impl<P> std::fmt::Debug for PeerConnection<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("peer", &self.peer)
            .field("nonce", &self.nonce)
            .field("remote_addr", &self.remote_addr)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}
