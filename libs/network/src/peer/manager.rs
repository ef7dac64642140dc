//! Neighbor table, listener and broadcast fan-out

use super::connection::PeerConnection;
use super::handshake;
use super::nonce::{NonceSource, RandomNonces};
use super::settings::PeerSettings;
use super::SharedPayload;
use crate::discovery::{LeaderOracle, NodeLookupService};
use crate::topology::TopologyService;
use crate::{Result, TransportError};
use codec::{write_close, ShareMessage};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use types::{NodeIdentifier, RegionIdentifier};

/// Snapshot of one neighbor table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborInfo {
    pub node: NodeIdentifier,
    pub nonce: u32,
    pub running: bool,
}

/// Outcome of one [`PeerManager::broadcast`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<NodeIdentifier>,
    pub removed: Vec<NodeIdentifier>,
}

/// Decide whether an incoming connection displaces the table entry.
///
/// Both ends key a connection by the nonce its dialer chose, so both ends
/// reach the same verdict. Equal nonces keep the existing connection.
pub(crate) fn should_replace(existing: Option<(u32, bool)>, incoming_nonce: u32) -> bool {
    match existing {
        None => true,
        Some((_, false)) => true,
        Some((nonce, true)) => nonce < incoming_nonce,
    }
}

#[derive(Default)]
struct Lifecycle {
    cancel: CancellationToken,
    listener: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

struct Inner<P> {
    region: RegionIdentifier,
    node: NodeIdentifier,
    topology: Arc<TopologyService<RegionIdentifier>>,
    leaders: Arc<dyn LeaderOracle>,
    lookup: Arc<dyn NodeLookupService>,
    settings: PeerSettings,
    nonces: Box<dyn NonceSource>,
    running: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    neighbors: Mutex<HashMap<NodeIdentifier, Arc<PeerConnection<P>>>>,
    own_state: Mutex<Option<P>>,
}

/// Maintains direct connections to the DCOP leaders of neighboring regions.
///
/// The neighbor table is guarded by one manager-wide mutex that is never held
/// across an await; connections are terminated only after they have been
/// taken out of (or replaced in) the table.
///
/// ### Symmetry break
///
/// When leaders A and B dial each other at once, each side ends up with two
/// candidate connections, keyed by the nonce of whichever side dialed. The
/// connection with the larger dialer nonce survives on both sides; the loser
/// receives CLOSE and is dropped.
pub struct PeerManager<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for PeerManager<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: SharedPayload> PeerManager<P> {
    pub fn new(
        region: RegionIdentifier,
        node: NodeIdentifier,
        topology: Arc<TopologyService<RegionIdentifier>>,
        leaders: Arc<dyn LeaderOracle>,
        lookup: Arc<dyn NodeLookupService>,
        settings: PeerSettings,
    ) -> Self {
        Self::with_nonce_source(region, node, topology, leaders, lookup, settings, RandomNonces)
    }

    pub fn with_nonce_source(
        region: RegionIdentifier,
        node: NodeIdentifier,
        topology: Arc<TopologyService<RegionIdentifier>>,
        leaders: Arc<dyn LeaderOracle>,
        lookup: Arc<dyn NodeLookupService>,
        settings: PeerSettings,
        nonces: impl NonceSource + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                region,
                node,
                topology,
                leaders,
                lookup,
                settings,
                nonces: Box::new(nonces),
                running: AtomicBool::new(false),
                lifecycle: Mutex::new(Lifecycle::default()),
                neighbors: Mutex::new(HashMap::new()),
                own_state: Mutex::new(None),
            }),
        }
    }

    pub fn region(&self) -> &RegionIdentifier {
        &self.inner.region
    }

    pub fn node(&self) -> &NodeIdentifier {
        &self.inner.node
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lifecycle.lock().local_addr
    }

    /// Bind the listener on this node's resolved address and start accepting.
    ///
    /// Returns the bound address. Fails if the manager is already running,
    /// the address cannot be resolved, or the first bind fails.
    pub async fn start(&self) -> Result<SocketAddr> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(TransportError::lifecycle("peer manager already started"));
        }

        let bound = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                self.inner.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        let local_addr = bound.local_addr()?;

        let cancel = CancellationToken::new();
        let listener = tokio::spawn(listen_loop(Arc::clone(&self.inner), bound, local_addr, cancel.clone()));
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.cancel = cancel;
            lifecycle.listener = Some(listener);
            lifecycle.local_addr = Some(local_addr);
        }
        info!(region = %self.inner.region, node = %self.inner.node, addr = %local_addr, "peer manager started");
        Ok(local_addr)
    }

    async fn bind(&self) -> Result<TcpListener> {
        let addr = self.inner.lookup.resolve(&self.inner.node).ok_or_else(|| {
            TransportError::discovery(format!("no listen address for own node {}", self.inner.node))
        })?;
        TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::network_with_source(format!("failed to bind {addr}"), e))
    }

    /// Drop dead entries and dial every expected neighbor leader not yet
    /// connected. Failed dials are logged and retried on the next refresh.
    pub async fn refresh_neighbors(&self) {
        if !self.is_running() {
            return;
        }

        let present: Vec<NodeIdentifier> = {
            let mut table = self.inner.neighbors.lock();
            table.retain(|node, conn| {
                let alive = conn.is_running();
                if !alive {
                    debug!(peer = %node, "pruning stopped neighbor connection");
                }
                alive
            });
            table.keys().cloned().collect()
        };

        let topology = self.inner.topology.snapshot();
        let mut expected: Vec<(RegionIdentifier, NodeIdentifier)> = Vec::new();
        for region in topology.neighbors(&self.inner.region) {
            match self.inner.leaders.dcop_leader(&region) {
                Some(leader) if leader == self.inner.node => {}
                Some(leader) => {
                    if !present.contains(&leader) && !expected.iter().any(|(_, n)| n == &leader) {
                        expected.push((region, leader));
                    }
                }
                None => warn!(region = %region, "no DCOP leader known for neighboring region"),
            }
        }

        join_all(
            expected
                .into_iter()
                .map(|(region, leader)| connect_to_neighbor(Arc::clone(&self.inner), region, leader)),
        )
        .await;
    }

    /// Refresh neighbors, then send `payload` to every live connection.
    ///
    /// The payload is recorded as this region's own state first, so it shows
    /// up in [`inbox`](Self::inbox) even when no neighbor is reachable.
    /// Connections that fail or have stopped are removed after the fan-out.
    /// Only an encoding failure is returned as an error; the connections are
    /// left untouched in that case.
    pub async fn broadcast(&self, payload: &P) -> Result<BroadcastReport> {
        self.refresh_neighbors().await;
        *self.inner.own_state.lock() = Some(payload.clone());

        let message = ShareMessage::encode(self.inner.region.clone(), payload).map_err(|e| {
            error!(region = %self.inner.region, error = %e, "failed to encode shared information, nothing sent");
            TransportError::from(e)
        })?;

        let peers: Vec<Arc<PeerConnection<P>>> = self.inner.neighbors.lock().values().cloned().collect();
        let results = join_all(peers.into_iter().map(|peer| {
            let message = &message;
            async move {
                let outcome = peer.send(message).await;
                (peer, outcome)
            }
        }))
        .await;

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (peer, outcome) in results {
            match outcome {
                Ok(()) if peer.is_running() => report.delivered.push(peer.peer().clone()),
                Ok(()) => failed.push(peer),
                Err(e) => {
                    warn!(
                        peer = %peer.peer(),
                        category = e.category(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "send to neighbor failed"
                    );
                    failed.push(peer);
                }
            }
        }

        for peer in &failed {
            peer.terminate().await;
        }
        if !failed.is_empty() {
            let mut table = self.inner.neighbors.lock();
            for peer in &failed {
                // a newer connection may have replaced this one meanwhile
                if table.get(peer.peer()).is_some_and(|current| Arc::ptr_eq(current, peer)) {
                    table.remove(peer.peer());
                }
            }
        }
        report.removed = failed.iter().map(|p| p.peer().clone()).collect();

        debug!(
            delivered = report.delivered.len(),
            removed = report.removed.len(),
            bytes = message.wire_len(),
            "broadcast complete"
        );
        Ok(report)
    }

    /// Last state received from every neighbor that has sent one, plus this
    /// region's own last broadcast
    pub fn inbox(&self) -> HashMap<RegionIdentifier, P> {
        let peers: Vec<Arc<PeerConnection<P>>> = self.inner.neighbors.lock().values().cloned().collect();
        let mut inbox: HashMap<RegionIdentifier, P> = peers
            .iter()
            .filter_map(|peer| peer.received_information())
            .collect();
        if let Some(own) = self.inner.own_state.lock().clone() {
            inbox.insert(self.inner.region.clone(), own);
        }
        inbox
    }

    pub fn neighbors(&self) -> Vec<NeighborInfo> {
        let table = self.inner.neighbors.lock();
        let mut infos: Vec<NeighborInfo> = table
            .values()
            .map(|conn| NeighborInfo {
                node: conn.peer().clone(),
                nonce: conn.nonce(),
                running: conn.is_running(),
            })
            .collect();
        infos.sort_by(|a, b| a.node.cmp(&b.node));
        infos
    }

    pub fn connection(&self, node: &NodeIdentifier) -> Option<Arc<PeerConnection<P>>> {
        self.inner.neighbors.lock().get(node).cloned()
    }

    /// Close the listener and every connection. Idempotent.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let (cancel, listener) = {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.local_addr = None;
            (lifecycle.cancel.clone(), lifecycle.listener.take())
        };
        cancel.cancel();
        if let Some(listener) = listener {
            if let Err(e) = listener.await {
                warn!(error = %e, "listener task did not exit cleanly");
            }
        }

        let drained: Vec<Arc<PeerConnection<P>>> = self.inner.neighbors.lock().drain().map(|(_, c)| c).collect();
        join_all(drained.iter().map(|conn| conn.terminate())).await;
        info!(region = %self.inner.region, closed = drained.len(), "peer manager stopped");
    }
}

#[instrument(skip_all, fields(region = %inner.region, addr = %addr))]
async fn listen_loop<P: SharedPayload>(
    inner: Arc<Inner<P>>,
    listener: TcpListener,
    addr: SocketAddr,
    cancel: CancellationToken,
) {
    let mut listener = Some(listener);
    while !cancel.is_cancelled() {
        let Some(active) = listener.as_ref() else {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(inner.settings.listen_retry_delay) => {}
            }
            match TcpListener::bind(addr).await {
                Ok(rebound) => {
                    info!("listener re-created");
                    listener = Some(rebound);
                }
                Err(e) => warn!(error = %e, "failed to re-create listener, will retry"),
            }
            continue;
        };

        let accepted = tokio::select! {
            () = cancel.cancelled() => break,
            accepted = active.accept() => accepted,
        };
        match accepted {
            Ok((stream, remote)) => {
                debug!(remote = %remote, "inbound connection");
                tokio::spawn(handle_inbound(Arc::clone(&inner), stream, cancel.child_token()));
            }
            Err(e) => {
                warn!(error = %e, "accept failed, re-creating listener");
                listener = None;
            }
        }
    }
    debug!("listener stopped");
}

async fn handle_inbound<P: SharedPayload>(inner: Arc<Inner<P>>, mut stream: TcpStream, cancel: CancellationToken) {
    let nonce = inner.nonces.next_nonce();
    let hello = tokio::select! {
        () = cancel.cancelled() => return,
        hello = handshake::accept(&mut stream, &inner.node, nonce, &inner.settings) => hello,
    };
    match hello {
        // the dialer's nonce keys an inbound connection
        Ok(hello) => install(&inner, stream, hello.node.clone(), hello.nonce).await,
        Err(e) if e.is_desync() => warn!(category = e.category(), error = %e, "inbound peer sent a corrupt hello"),
        Err(e) => debug!(category = e.category(), error = %e, "inbound handshake failed"),
    }
}

async fn connect_to_neighbor<P: SharedPayload>(inner: Arc<Inner<P>>, region: RegionIdentifier, leader: NodeIdentifier) {
    let Some(addr) = inner.lookup.resolve(&leader) else {
        warn!(region = %region, leader = %leader, "no address for neighbor leader");
        return;
    };

    let nonce = inner.nonces.next_nonce();
    match handshake::dial(addr, &inner.node, nonce, &inner.settings).await {
        Ok((stream, hello)) => {
            if hello.node != leader {
                warn!(expected = %leader, actual = %hello.node, "neighbor answered with a different node identifier");
            }
            // our own nonce keys an outbound connection
            install(&inner, stream, hello.node, nonce).await;
        }
        Err(e) if e.is_retryable() => debug!(
            region = %region,
            leader = %leader,
            category = e.category(),
            error = %e,
            "unable to connect to neighbor, will try again later"
        ),
        Err(e) => warn!(
            region = %region,
            leader = %leader,
            category = e.category(),
            error = %e,
            "neighbor handshake failed with a non-transient error"
        ),
    }
}

/// Apply the symmetry-break rule and either install and start the new
/// connection or close its stream
async fn install<P: SharedPayload>(inner: &Arc<Inner<P>>, stream: TcpStream, peer: NodeIdentifier, nonce: u32) {
    let parent = inner.lifecycle.lock().cancel.clone();
    let decision = {
        let mut table = inner.neighbors.lock();
        let existing = table.get(&peer).map(|c| (c.nonce(), c.is_running()));
        if inner.running.load(Ordering::SeqCst) && should_replace(existing, nonce) {
            let conn = PeerConnection::new(
                stream,
                peer.clone(),
                nonce,
                inner.settings.clone(),
                parent.child_token(),
            );
            let replaced = table.insert(peer.clone(), Arc::clone(&conn));
            Ok((conn, replaced))
        } else {
            Err((stream, existing.map(|(n, _)| n)))
        }
    };

    match decision {
        Ok((conn, replaced)) => {
            if let Some(old) = replaced {
                debug!(peer = %peer, old_nonce = old.nonce(), new_nonce = nonce, "replacing neighbor connection");
                old.terminate().await;
            }
            conn.start();
        }
        Err((mut loser, kept)) => {
            debug!(peer = %peer, nonce, kept_nonce = ?kept, "duplicate connection lost the nonce race, closing");
            let _ = write_close(&mut loser).await;
        }
    }
}

impl<P> std::fmt::Debug for PeerManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerManager")
            .field("region", &self.inner.region)
            .field("node", &self.inner.node)
            .field("running", &self.inner.running.load(Ordering::SeqCst))
            .finish()
    }
}
