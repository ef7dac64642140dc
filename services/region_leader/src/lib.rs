//! # Region Leader
//!
//! Wires the peer manager, a DCOP algorithm variant and a resource summary
//! source into one periodic loop. Each round:
//!
//! 1. read the resource summary
//! 2. run the algorithm on it and the peer manager's inbox
//! 3. broadcast the new shared state to neighbors
//! 4. publish the plan if it changed
//!
//! A failing round is logged and the next one runs on schedule.

pub mod driver;
pub mod leader;
pub mod plan_sink;
pub mod summary_source;

pub use driver::{RoundDriver, RoundOutcome};
pub use leader::{build_algorithm, RegionLeader};
pub use plan_sink::{LoggingPlanSink, PlanSink};
pub use summary_source::{EmptySummaryProvider, FileSummaryProvider};
