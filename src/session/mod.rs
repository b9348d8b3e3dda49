//! Scan sessions: the loop controller and everything it accumulates.

pub mod aggregator;
pub mod controller;

use crate::config::{LoopPolicy, ScanPlan};
use crate::types::TargetSet;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use aggregator::{ResultAggregator, SweepResult};
pub use controller::{LoopController, LoopState};

/// One invocation of an active scan, from first sweep to final summary.
#[derive(Debug)]
pub struct ScanSession {
    target: String,
    policy: LoopPolicy,
    loop_delay: Duration,
    host_count: usize,
    port_count: usize,
    skipped_hosts: usize,
    skipped_ports: usize,
    results: ResultAggregator,
    started_at: DateTime<Utc>,
    clock: Instant,
    elapsed: Option<Duration>,
    cancelled: bool,
}

impl ScanSession {
    pub fn new(plan: &ScanPlan, targets: &TargetSet) -> Self {
        let host_count = targets.len();
        let port_count = plan.ports.len();
        Self {
            target: plan.target.to_string(),
            policy: plan.loop_policy,
            loop_delay: plan.loop_delay,
            host_count,
            port_count,
            skipped_hosts: targets.excluded().len(),
            skipped_ports: plan.ports.excluded().len(),
            results: ResultAggregator::new(host_count * port_count),
            started_at: Utc::now(),
            clock: Instant::now(),
            elapsed: None,
            cancelled: false,
        }
    }

    /// Append a sweep. Its index is assigned by the caller before probing.
    pub fn record(&mut self, sweep: SweepResult) -> Arc<SweepResult> {
        self.results.record(sweep)
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Freeze the elapsed time. Later calls keep the first value.
    pub(crate) fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.clock.elapsed());
        }
    }

    /// Sweeps started so far, a cancelled partial one included.
    pub fn iteration(&self) -> u32 {
        self.results.sweeps().len() as u32
    }

    /// Sweeps that covered the whole work set.
    pub fn completed_loops(&self) -> usize {
        self.results.sweeps().iter().filter(|s| s.is_complete()).count()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn policy(&self) -> LoopPolicy {
        self.policy
    }

    pub fn loop_delay(&self) -> Duration {
        self.loop_delay
    }

    pub fn host_count(&self) -> usize {
        self.host_count
    }

    pub fn port_count(&self) -> usize {
        self.port_count
    }

    pub fn skipped_hosts(&self) -> usize {
        self.skipped_hosts
    }

    pub fn skipped_ports(&self) -> usize {
        self.skipped_ports
    }

    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall time of the session; still running if not yet finished.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.clock.elapsed())
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}
