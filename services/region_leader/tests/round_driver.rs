//! Round driver over real loopback peer links

use dcop::{
    ApplicationCatalog, ApplicationSpec, BaselineAlgorithm, CapacitySettings, DcopError, DcopSharedInformation,
    LinkAttribute, NodeAttribute, RegionNetworkFlow, RegionPlan, ResourceSummary, ResourceSummaryProvider, ServicePlan,
};
use network::{PeerManager, PeerSettings, StaticLeaderOracle, StaticNodeLookup, Topology, TopologyService};
use parking_lot::Mutex;
use region_leader::{PlanSink, RoundDriver};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use types::{approx_eq, NodeIdentifier, RegionIdentifier, RegionalLink, ServiceIdentifier};

fn region(name: &str) -> RegionIdentifier {
    RegionIdentifier::new(name)
}

fn node(name: &str) -> NodeIdentifier {
    NodeIdentifier::new(name)
}

/// Summary that can be swapped between rounds
struct SharedSummary(Mutex<ResourceSummary>);

impl ResourceSummaryProvider for SharedSummary {
    fn region_summary(&self) -> dcop::Result<ResourceSummary> {
        Ok(self.0.lock().clone())
    }
}

/// Fails the first `failures` rounds
struct FlakySummary {
    failures: usize,
    calls: AtomicUsize,
    summary: ResourceSummary,
}

impl ResourceSummaryProvider for FlakySummary {
    fn region_summary(&self) -> dcop::Result<ResourceSummary> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(DcopError::summary_unavailable("not yet written"));
        }
        Ok(self.summary.clone())
    }
}

/// Counts publications on top of the watch channel
struct CountingSink {
    count: AtomicUsize,
    latest: watch::Sender<Option<RegionPlan>>,
}

impl PlanSink for CountingSink {
    fn publish(&self, plan: &RegionPlan) -> anyhow::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.latest.publish(plan)
    }
}

/// A with capacity 2 serving demand 3 of S to client region X
fn overloaded_a() -> ResourceSummary {
    ResourceSummary::new(region("A"))
        .with_capacity(NodeAttribute::TaskContainers, 2.0)
        .with_server_demand("S".into(), region("X"), NodeAttribute::TaskContainers, 3.0)
        .with_flow(
            region("X"),
            RegionNetworkFlow::new(region("A"), region("X"), region("A")),
            "S".into(),
            [(LinkAttribute::DatarateRx, 4.0), (LinkAttribute::DatarateTx, 1.0)],
        )
}

fn catalog() -> Arc<ApplicationCatalog> {
    Arc::new(ApplicationCatalog::new([ApplicationSpec::new("S", 1).with_default_region("B")]))
}

fn baseline(name: &str) -> Box<BaselineAlgorithm> {
    Box::new(BaselineAlgorithm::new(
        region(name),
        catalog(),
        CapacitySettings {
            capacity_threshold: 1.0,
            min_service_capacity: 1.0,
        },
    ))
}

struct Pair {
    a: PeerManager<DcopSharedInformation>,
    b: PeerManager<DcopSharedInformation>,
}

impl Pair {
    async fn start() -> Self {
        let topology = Topology::from_links([], [RegionalLink::new(region("A"), region("B"))]).unwrap();
        let topology = Arc::new(TopologyService::new(topology));
        let leaders = Arc::new(StaticLeaderOracle::new([(region("A"), node("a1")), (region("B"), node("b1"))]));
        let unbound: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let lookup = Arc::new(StaticNodeLookup::new([(node("a1"), unbound), (node("b1"), unbound)]));
        let settings = PeerSettings {
            connect_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(2),
            write_timeout: Duration::from_secs(2),
            listen_retry_delay: Duration::from_millis(50),
            ..PeerSettings::default()
        };

        let a = PeerManager::new(
            region("A"),
            node("a1"),
            topology.clone(),
            leaders.clone(),
            lookup.clone(),
            settings.clone(),
        );
        let b = PeerManager::new(region("B"), node("b1"), topology, leaders, lookup.clone(), settings);

        let addr_a = a.start().await.unwrap();
        lookup.set_address(node("a1"), addr_a);
        let addr_b = b.start().await.unwrap();
        lookup.set_address(node("b1"), addr_b);
        Self { a, b }
    }

    async fn stop(&self) {
        self.a.stop().await;
        self.b.stop().await;
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[test_log::test(tokio::test)]
async fn test_overloaded_region_publishes_plan_and_shares_state() {
    let pair = Pair::start().await;
    let (tx, rx) = watch::channel(None);
    let sink = Arc::new(CountingSink {
        count: AtomicUsize::new(0),
        latest: tx,
    });
    let summary = Arc::new(SharedSummary(Mutex::new(overloaded_a())));

    let mut driver = RoundDriver::new(pair.a.clone(), baseline("A"), summary.clone(), sink.clone());

    let first = driver.run_round().await.unwrap();
    assert_eq!(first.round, 0);
    assert!(first.published);
    assert_eq!(first.delivered, 1);

    let plan = rx.borrow().clone().unwrap();
    let fractions = plan.service(&ServiceIdentifier::new("S")).unwrap();
    assert!(approx_eq(fractions[&region("A")], 2.0 / 3.0));
    assert!(approx_eq(fractions[&region("B")], 1.0 / 3.0));

    // B sees A's shared state
    wait_until(|| pair.b.inbox().get(&region("A")).is_some_and(|s| s.iteration() == 0)).await;

    // same inputs, same plan: nothing new published, round counter advances
    let second = driver.run_round().await.unwrap();
    assert_eq!(second.round, 1);
    assert!(!second.published);
    assert_eq!(sink.count.load(Ordering::SeqCst), 1);

    // demand fits once capacity grows, so the plan changes
    *summary.0.lock() = overloaded_a().with_capacity(NodeAttribute::TaskContainers, 10.0);
    let third = driver.run_round().await.unwrap();
    assert!(third.published);
    assert_eq!(sink.count.load(Ordering::SeqCst), 2);
    assert_eq!(
        driver.last_plan().unwrap().service(&ServiceIdentifier::new("S")),
        Some(&ServicePlan::from([(region("A"), 1.0)]))
    );

    pair.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_failed_rounds_do_not_stop_the_driver() {
    let pair = Pair::start().await;
    let (tx, mut rx) = watch::channel::<Option<RegionPlan>>(None);
    let summary = Arc::new(FlakySummary {
        failures: 2,
        calls: AtomicUsize::new(0),
        summary: overloaded_a(),
    });

    let driver = RoundDriver::new(pair.a.clone(), baseline("A"), summary.clone(), Arc::new(tx));
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(driver.run(Duration::from_millis(20), shutdown.clone()));

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no plan published")
        .unwrap();
    assert!(rx.borrow().is_some());
    assert!(summary.calls.load(Ordering::SeqCst) >= 3);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("driver did not stop")
        .unwrap();

    pair.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_round_error_is_reported_to_caller() {
    let pair = Pair::start().await;
    let (tx, _rx) = watch::channel::<Option<RegionPlan>>(None);
    // summary for the wrong region
    let summary = Arc::new(SharedSummary(Mutex::new(ResourceSummary::new(region("B")))));

    let mut driver = RoundDriver::new(pair.a.clone(), baseline("A"), summary, Arc::new(tx));
    assert!(driver.run_round().await.is_err());
    assert!(driver.last_plan().is_none());

    pair.stop().await;
}
