//! Peer Manager Integration Tests
//!
//! Two leaders on loopback sockets, plus a hand-driven raw socket for the
//! corruption cases. Real connections, no mocks.

use codec::{read_message_type, HelloMessage, MessageType, DEFAULT_MAX_FIELD_SIZE};
use network::{
    PeerManager, PeerSettings, StaticLeaderOracle, StaticNodeLookup, Topology, TopologyService,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use types::{NodeIdentifier, RegionIdentifier, RegionalLink};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Load {
    round: i64,
    amount: f64,
}

fn region(name: &str) -> RegionIdentifier {
    RegionIdentifier::new(name)
}

fn node(name: &str) -> NodeIdentifier {
    NodeIdentifier::new(name)
}

struct Directory {
    topology: Arc<TopologyService<RegionIdentifier>>,
    leaders: Arc<StaticLeaderOracle>,
    lookup: Arc<StaticNodeLookup>,
}

impl Directory {
    /// Regions A and B linked, led by a1 and b1
    fn pair() -> Self {
        let topology = Topology::from_links([], [RegionalLink::new(region("A"), region("B"))]).unwrap();
        let unbound: SocketAddr = "127.0.0.1:0".parse().unwrap();
        Self {
            topology: Arc::new(TopologyService::new(topology)),
            leaders: Arc::new(StaticLeaderOracle::new([
                (region("A"), node("a1")),
                (region("B"), node("b1")),
            ])),
            lookup: Arc::new(StaticNodeLookup::new([(node("a1"), unbound), (node("b1"), unbound)])),
        }
    }

    fn settings() -> PeerSettings {
        PeerSettings {
            connect_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            listen_retry_delay: Duration::from_millis(50),
            ..PeerSettings::default()
        }
    }

    fn leader(&self, region_name: &str, node_name: &str) -> PeerManager<Load> {
        PeerManager::new(
            region(region_name),
            node(node_name),
            Arc::clone(&self.topology),
            self.leaders.clone(),
            self.lookup.clone(),
            Self::settings(),
        )
    }

    fn leader_with_nonce(&self, region_name: &str, node_name: &str, nonce: u32) -> PeerManager<Load> {
        PeerManager::with_nonce_source(
            region(region_name),
            node(node_name),
            Arc::clone(&self.topology),
            self.leaders.clone(),
            self.lookup.clone(),
            Self::settings(),
            move || nonce,
        )
    }

    /// Start a manager and publish its real port
    async fn start(&self, manager: &PeerManager<Load>) -> SocketAddr {
        let addr = manager.start().await.unwrap();
        self.lookup.set_address(manager.node().clone(), addr);
        addr
    }
}

async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

fn live_nonce(manager: &PeerManager<Load>, peer: &str) -> Option<u32> {
    manager
        .neighbors()
        .into_iter()
        .find(|n| n.node == node(peer) && n.running)
        .map(|n| n.nonce)
}

/// Connect a raw socket to `addr` and complete the handshake as `as_node`
async fn raw_peer(addr: SocketAddr, as_node: &str, nonce: u32) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    HelloMessage::new(nonce, node(as_node)).write_to(&mut stream).await.unwrap();
    assert_eq!(read_message_type(&mut stream).await.unwrap(), MessageType::Hello);
    HelloMessage::read_body(&mut stream, DEFAULT_MAX_FIELD_SIZE).await.unwrap();
    stream
}

#[test_log::test(tokio::test)]
async fn test_broadcast_reaches_neighbor_inbox() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let b = dir.leader("B", "b1");
    dir.start(&a).await;
    dir.start(&b).await;

    let report = a.broadcast(&Load { round: 1, amount: 2.5 }).await.unwrap();
    assert_eq!(report.delivered, vec![node("b1")]);
    assert!(report.removed.is_empty());

    assert!(eventually(|| b.inbox().get(&region("A")) == Some(&Load { round: 1, amount: 2.5 })).await);
    assert_eq!(a.inbox().get(&region("A")), Some(&Load { round: 1, amount: 2.5 }));

    // B already holds the inbound connection from A, no second dial
    b.broadcast(&Load { round: 1, amount: 0.5 }).await.unwrap();
    assert!(eventually(|| a.inbox().get(&region("B")) == Some(&Load { round: 1, amount: 0.5 })).await);
    assert_eq!(a.neighbors().len(), 1);
    assert_eq!(b.neighbors().len(), 1);

    a.stop().await;
    b.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_inbox_holds_only_latest_state() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let b = dir.leader("B", "b1");
    dir.start(&a).await;
    dir.start(&b).await;

    for round in 0..5 {
        a.broadcast(&Load { round, amount: 1.0 }).await.unwrap();
    }
    assert!(eventually(|| b.inbox().get(&region("A")).map(|l| l.round) == Some(4)).await);

    a.stop().await;
    b.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_simultaneous_dial_keeps_larger_nonce() {
    let dir = Directory::pair();
    let a = dir.leader_with_nonce("A", "a1", 10);
    let b = dir.leader_with_nonce("B", "b1", 20);
    dir.start(&a).await;
    dir.start(&b).await;

    tokio::join!(a.refresh_neighbors(), b.refresh_neighbors());

    assert!(eventually(|| live_nonce(&a, "b1") == Some(20) && live_nonce(&b, "a1") == Some(20)).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(live_nonce(&a, "b1"), Some(20));
    assert_eq!(live_nonce(&b, "a1"), Some(20));

    // the survivor carries traffic
    a.broadcast(&Load { round: 3, amount: 1.0 }).await.unwrap();
    assert!(eventually(|| b.inbox().contains_key(&region("A"))).await);

    a.stop().await;
    b.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_start_twice_fails_and_stop_is_idempotent() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    dir.start(&a).await;

    let err = a.start().await.unwrap_err();
    assert_eq!(err.category(), "lifecycle");

    a.stop().await;
    a.stop().await;
    assert!(!a.is_running());
    assert!(a.local_addr().is_none());
}

#[test_log::test(tokio::test)]
async fn test_unresolvable_neighbor_is_not_fatal() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    dir.start(&a).await;
    // b1 still maps to port 0, which refuses connections

    let report = a.broadcast(&Load::default()).await.unwrap();
    assert!(report.delivered.is_empty());
    assert!(a.neighbors().is_empty());
    assert!(a.inbox().contains_key(&region("A")));

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_sync_lost_tears_down_connection() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let addr = dir.start(&a).await;

    let mut raw = raw_peer(addr, "b1", 5).await;
    assert!(eventually(|| live_nonce(&a, "b1") == Some(5)).await);

    raw.write_u8(MessageType::DcopShare as u8).await.unwrap();
    raw.write_i32(0).await.unwrap();
    raw.flush().await.unwrap();

    // best-effort CLOSE, then the socket is released
    assert_eq!(raw.read_u8().await.unwrap(), MessageType::Close as u8);
    let mut rest = Vec::new();
    raw.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());

    assert!(eventually(|| live_nonce(&a, "b1").is_none()).await);
    assert!(!a.inbox().contains_key(&region("B")));

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_unexpected_tag_tears_down_connection() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let addr = dir.start(&a).await;

    let mut raw = raw_peer(addr, "b1", 5).await;
    assert!(eventually(|| live_nonce(&a, "b1") == Some(5)).await);

    HelloMessage::new(6, node("b1")).write_to(&mut raw).await.unwrap();
    assert!(eventually(|| live_nonce(&a, "b1").is_none()).await);

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_corrupt_hello_is_dropped_and_listener_survives() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let addr = dir.start(&a).await;

    let mut bad = TcpStream::connect(addr).await.unwrap();
    bad.write_u8(MessageType::Hello as u8).await.unwrap();
    bad.write_u32(5).await.unwrap();
    bad.write_i32(0).await.unwrap();
    bad.flush().await.unwrap();

    // the manager answers with its own hello, then gives up on the stream
    assert_eq!(read_message_type(&mut bad).await.unwrap(), MessageType::Hello);
    HelloMessage::read_body(&mut bad, DEFAULT_MAX_FIELD_SIZE).await.unwrap();
    let mut rest = Vec::new();
    bad.read_to_end(&mut rest).await.unwrap();
    assert!(a.neighbors().is_empty());

    let _good = raw_peer(addr, "b1", 7).await;
    assert!(eventually(|| live_nonce(&a, "b1") == Some(7)).await);

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_unassigned_tag_tears_down_connection() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let addr = dir.start(&a).await;

    let mut raw = raw_peer(addr, "b1", 5).await;
    assert!(eventually(|| live_nonce(&a, "b1") == Some(5)).await);

    raw.write_u8(2).await.unwrap();
    raw.flush().await.unwrap();
    assert!(eventually(|| live_nonce(&a, "b1").is_none()).await);

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_peer_close_ends_connection() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let addr = dir.start(&a).await;

    let mut raw = raw_peer(addr, "b1", 5).await;
    assert!(eventually(|| live_nonce(&a, "b1") == Some(5)).await);

    codec::write_close(&mut raw).await.unwrap();
    assert!(eventually(|| live_nonce(&a, "b1").is_none()).await);

    a.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_stop_notifies_neighbors() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let b = dir.leader("B", "b1");
    dir.start(&a).await;
    dir.start(&b).await;

    a.refresh_neighbors().await;
    assert!(eventually(|| live_nonce(&b, "a1").is_some()).await);

    a.stop().await;
    assert!(a.neighbors().is_empty());
    assert!(eventually(|| live_nonce(&b, "a1").is_none()).await);

    // A is gone, so B's next broadcast finds nobody to talk to
    let report = b.broadcast(&Load::default()).await.unwrap();
    assert!(report.delivered.is_empty());
    assert!(b.neighbors().iter().all(|n| !n.running));

    b.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_restart_after_stop() {
    let dir = Directory::pair();
    let a = dir.leader("A", "a1");
    let b = dir.leader("B", "b1");
    dir.start(&a).await;
    dir.start(&b).await;
    a.refresh_neighbors().await;
    assert!(eventually(|| live_nonce(&b, "a1").is_some()).await);

    b.stop().await;
    dir.start(&b).await;
    a.broadcast(&Load { round: 9, amount: 1.0 }).await.unwrap();
    assert!(eventually(|| b.inbox().get(&region("A")).map(|l| l.round) == Some(9)).await);

    a.stop().await;
    b.stop().await;
}
