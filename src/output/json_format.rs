//! JSON output formatting.

use super::Finding;
use crate::session::{ScanSession, SweepResult};
use crate::types::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// One sweep as it appears in the JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub index: u32,
    pub complete: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub probed: usize,
    pub open: usize,
    pub closed: usize,
    pub unreachable: usize,
    pub findings: Vec<Finding>,
}

impl SweepReport {
    pub fn new(sweep: &SweepResult, findings: Vec<Finding>) -> Self {
        Self {
            index: sweep.index(),
            complete: sweep.is_complete(),
            started_at: sweep.started_at(),
            duration_ms: sweep.duration().as_millis() as u64,
            probed: sweep.len(),
            open: sweep.count(ProbeOutcome::Open),
            closed: sweep.count(ProbeOutcome::Closed),
            unreachable: sweep.count(ProbeOutcome::Unreachable),
            findings,
        }
    }
}

/// The whole session, printed once at the end.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport<'a> {
    pub target: &'a str,
    pub policy: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub hosts: usize,
    pub ports_per_host: usize,
    pub skipped_hosts: usize,
    pub skipped_ports: usize,
    pub active_hosts: usize,
    pub open_findings: usize,
    pub completed_loops: usize,
    pub cancelled: bool,
    pub sweeps: &'a [SweepReport],
}

impl<'a> SessionReport<'a> {
    pub fn new(session: &'a ScanSession, sweeps: &'a [SweepReport]) -> Self {
        let results = session.results();
        Self {
            target: session.target(),
            policy: session.policy().to_string(),
            started_at: session.started_at(),
            duration_ms: session.elapsed().as_millis() as u64,
            hosts: session.host_count(),
            ports_per_host: session.port_count(),
            skipped_hosts: session.skipped_hosts(),
            skipped_ports: session.skipped_ports(),
            active_hosts: results.active_hosts().len(),
            open_findings: results.open_total(),
            completed_loops: session.completed_loops(),
            cancelled: session.was_cancelled(),
            sweeps,
        }
    }
}

/// Print the report as pretty JSON.
pub fn write_json<W: Write>(mut out: W, report: &SessionReport<'_>) -> serde_json::Result<()> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out).map_err(serde_json::Error::io)
}
