//! Per-sweep results and the cross-sweep aggregate.

use crate::types::{ProbeOutcome, WorkUnit};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Outcomes of one pass over the work set.
///
/// Each unit carries at most one outcome. A sweep cut short by
/// cancellation holds fewer outcomes than it expected and reports itself
/// as incomplete.
#[derive(Debug, Clone)]
pub struct SweepResult {
    index: u32,
    expected: usize,
    outcomes: HashMap<WorkUnit, ProbeOutcome>,
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl SweepResult {
    pub fn new(
        index: u32,
        expected: usize,
        outcomes: HashMap<WorkUnit, ProbeOutcome>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            index,
            expected,
            outcomes,
            started_at,
            duration,
        }
    }

    /// One-based sweep number.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Units the sweep set out to probe.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Units that produced an outcome.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == self.expected
    }

    pub fn outcome(&self, unit: &WorkUnit) -> Option<ProbeOutcome> {
        self.outcomes.get(unit).copied()
    }

    pub fn count(&self, outcome: ProbeOutcome) -> usize {
        self.outcomes.values().filter(|&&o| o == outcome).count()
    }

    /// Outcomes ordered by address then port.
    pub fn sorted(&self) -> Vec<(WorkUnit, ProbeOutcome)> {
        let mut entries: Vec<_> = self.outcomes.iter().map(|(u, o)| (*u, *o)).collect();
        entries.sort_unstable_by_key(|(unit, _)| *unit);
        entries
    }

    /// Distinct hosts with at least one open port, ascending.
    pub fn open_hosts(&self) -> BTreeSet<Ipv4Addr> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_open())
            .map(|(u, _)| u.host)
            .collect()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Every sweep of a session plus the latest outcome per unit.
#[derive(Debug)]
pub struct ResultAggregator {
    work_units: usize,
    sweeps: Vec<Arc<SweepResult>>,
    latest: HashMap<WorkUnit, ProbeOutcome>,
    active_hosts: BTreeSet<Ipv4Addr>,
    opened: usize,
}

impl ResultAggregator {
    /// `work_units` is the size of the work set every sweep covers.
    pub fn new(work_units: usize) -> Self {
        Self {
            work_units,
            sweeps: Vec::new(),
            latest: HashMap::with_capacity(work_units),
            active_hosts: BTreeSet::new(),
            opened: 0,
        }
    }

    /// Store a finished sweep and fold it into the latest-outcome map.
    pub fn record(&mut self, sweep: SweepResult) -> Arc<SweepResult> {
        for (unit, outcome) in &sweep.outcomes {
            self.latest.insert(*unit, *outcome);
            if outcome.is_open() {
                self.opened += 1;
                self.active_hosts.insert(unit.host);
            }
        }
        let sweep = Arc::new(sweep);
        self.sweeps.push(Arc::clone(&sweep));
        sweep
    }

    pub fn sweeps(&self) -> &[Arc<SweepResult>] {
        &self.sweeps
    }

    pub fn latest(&self, unit: &WorkUnit) -> Option<ProbeOutcome> {
        self.latest.get(unit).copied()
    }

    /// True when every unit of the work set has `outcome` as its latest
    /// result. An empty work set satisfies any outcome.
    pub fn all_latest(&self, outcome: ProbeOutcome) -> bool {
        self.latest.len() == self.work_units && self.latest.values().all(|&o| o == outcome)
    }

    /// Open outcomes summed over every sweep.
    pub fn open_total(&self) -> usize {
        self.opened
    }

    /// Hosts that answered open on any port in any sweep.
    pub fn active_hosts(&self) -> &BTreeSet<Ipv4Addr> {
        &self.active_hosts
    }

    /// Distinct hosts that produced at least one outcome.
    pub fn hosts_probed(&self) -> usize {
        self.latest.keys().map(|u| u.host).collect::<BTreeSet<_>>().len()
    }

    /// Outcomes recorded over every sweep, partial ones included.
    pub fn probes_recorded(&self) -> usize {
        self.sweeps.iter().map(|s| s.len()).sum()
    }
}

#[cfg(test)]
pub(crate) fn sweep_of(index: u32, expected: usize, entries: &[(WorkUnit, ProbeOutcome)]) -> SweepResult {
    SweepResult::new(
        index,
        expected,
        entries.iter().copied().collect(),
        Utc::now(),
        Duration::from_millis(5),
    )
}
