//! Live scan counters and the periodic runtime-stats emitter.
//!
//! The scheduler bumps lock-free counters in [`ScanProgress`]; the emitter
//! samples them on an interval and prints a line to stderr. Nothing here
//! influences what gets scanned.

use crate::types::ProbeOutcome;
use chrono::Local;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Counters shared between the scheduler and observers.
#[derive(Debug, Default)]
pub struct ScanProgress {
    hosts_scanned: AtomicU64,
    probes_done: AtomicU64,
    open_found: AtomicU64,
    in_flight: AtomicUsize,
    sweeps_done: AtomicU64,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host_started(&self) {
        self.hosts_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probe_started(&self) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn probe_finished(&self, outcome: ProbeOutcome) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.probes_done.fetch_add(1, Ordering::Relaxed);
        if outcome.is_open() {
            self.open_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn sweep_finished(&self) {
        self.sweeps_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            hosts_scanned: self.hosts_scanned.load(Ordering::Relaxed),
            probes_done: self.probes_done.load(Ordering::Relaxed),
            open_found: self.open_found.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            sweeps_done: self.sweeps_done.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ScanProgress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub hosts_scanned: u64,
    pub probes_done: u64,
    pub open_found: u64,
    pub in_flight: usize,
    pub sweeps_done: u64,
}

/// Format one stats line. `rate` is probes per second.
pub fn format_stats_line(snapshot: &ProgressSnapshot, rate: u64) -> String {
    format!(
        "[{}]\thosts:{}\tports:{}\tports/sec:{}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        snapshot.hosts_scanned,
        snapshot.probes_done,
        rate
    )
}

fn per_second(count: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        count
    } else {
        (count as f64 / secs) as u64
    }
}

/// Background task printing runtime statistics every interval.
pub struct StatsEmitter {
    progress: Arc<ScanProgress>,
    started: Instant,
    handle: JoinHandle<()>,
}

impl StatsEmitter {
    /// Start emitting every `every`.
    pub fn spawn(progress: Arc<ScanProgress>, every: Duration) -> Self {
        let task_progress = Arc::clone(&progress);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately.
            ticker.tick().await;

            let mut last_count = 0;
            loop {
                ticker.tick().await;
                let snapshot = task_progress.snapshot();
                if snapshot.probes_done == 0 {
                    continue;
                }
                let rate = per_second(snapshot.probes_done - last_count, every);
                last_count = snapshot.probes_done;
                eprintln!("{}", format_stats_line(&snapshot, rate));
            }
        });

        Self {
            progress,
            started: Instant::now(),
            handle,
        }
    }

    /// Stop the periodic task and print a final line averaged over the run.
    pub fn finish(self) {
        self.handle.abort();
        let snapshot = self.progress.snapshot();
        let rate = per_second(snapshot.probes_done, self.started.elapsed());
        eprintln!("{}", format_stats_line(&snapshot, rate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let progress = ScanProgress::new();
        progress.host_started();
        progress.probe_started();
        progress.probe_started();
        progress.probe_finished(ProbeOutcome::Open);

        let snap = progress.snapshot();
        assert_eq!(snap.hosts_scanned, 1);
        assert_eq!(snap.in_flight, 1);
        assert_eq!(snap.probes_done, 1);
        assert_eq!(snap.open_found, 1);

        progress.probe_finished(ProbeOutcome::Closed);
        progress.sweep_finished();
        let snap = progress.snapshot();
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.open_found, 1);
        assert_eq!(snap.sweeps_done, 1);
    }

    #[test]
    fn test_stats_line_fields() {
        let snap = ProgressSnapshot {
            hosts_scanned: 4,
            probes_done: 230,
            ..Default::default()
        };
        let line = format_stats_line(&snap, 115);
        assert!(line.starts_with('['));
        assert!(line.ends_with("\thosts:4\tports:230\tports/sec:115"));
    }

    #[test]
    fn test_rate() {
        assert_eq!(per_second(500, Duration::from_secs(5)), 100);
        assert_eq!(per_second(40, Duration::from_millis(200)), 40);
    }

    #[tokio::test]
    async fn test_emitter_stops() {
        let progress = Arc::new(ScanProgress::new());
        let emitter = StatsEmitter::spawn(Arc::clone(&progress), Duration::from_millis(10));
        progress.probe_started();
        progress.probe_finished(ProbeOutcome::Closed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        emitter.finish();
    }
}
