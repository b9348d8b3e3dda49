//! Scanner module - probes work units with bounded concurrency.
//!
//! A sweep dispatches every unit at most once, keeps at most `concurrency`
//! probes in flight, and funnels outcomes over a channel to a single
//! collector that owns the sweep's result map.

pub mod generator;
pub mod rate_limiter;
pub mod tcp;
pub mod traits;

use crate::session::SweepResult;
use crate::shutdown::ShutdownSignal;
use crate::stats::ScanProgress;
use crate::types::{ProbeOutcome, WorkUnit};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

pub use generator::WorkPlan;
pub use rate_limiter::RateLimiter;
pub use tcp::TcpConnectProber;
pub use traits::{Prober, SharedProber};

/// Runs sweeps through a bounded pool of probe tasks.
pub struct Scheduler {
    prober: SharedProber,
    concurrency: NonZeroUsize,
    rate_limiter: Option<RateLimiter>,
    progress: Arc<ScanProgress>,
    show_bar: bool,
}

impl Scheduler {
    pub fn new(prober: SharedProber, concurrency: NonZeroUsize) -> Self {
        Self {
            prober,
            concurrency,
            rate_limiter: None,
            progress: Arc::new(ScanProgress::new()),
            show_bar: false,
        }
    }

    /// Cap probe starts per second. `None` leaves dispatch unthrottled.
    pub fn with_rate_limit(mut self, rate: Option<NonZeroU32>) -> Self {
        self.rate_limiter = rate.map(RateLimiter::new);
        self
    }

    /// Report into shared counters instead of private ones.
    pub fn with_progress(mut self, progress: Arc<ScanProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Draw a progress bar on stderr for each sweep.
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_bar = show;
        self
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.show_bar {
            return None;
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    }

    /// Probe `units` once each and collect the outcomes.
    ///
    /// Once `shutdown` fires no further unit is dispatched; probes already
    /// in flight finish and are recorded, and the returned sweep is
    /// incomplete.
    pub async fn run_sweep(
        &self,
        index: u32,
        units: Vec<WorkUnit>,
        shutdown: &ShutdownSignal,
    ) -> SweepResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let expected = units.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency.get()));
        let (tx, mut rx) = mpsc::channel::<(WorkUnit, ProbeOutcome)>(self.concurrency.get());
        let bar = self.progress_bar(expected);

        let dispatch = async {
            let mut current_host: Option<Ipv4Addr> = None;
            for unit in units {
                if shutdown.is_triggered() {
                    break;
                }
                if let Some(limiter) = &self.rate_limiter {
                    limiter.wait().await;
                }
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                // Cancellation may have landed while waiting for a slot.
                if shutdown.is_triggered() {
                    break;
                }

                if current_host != Some(unit.host) {
                    current_host = Some(unit.host);
                    self.progress.host_started();
                }

                let prober = Arc::clone(&self.prober);
                let progress = Arc::clone(&self.progress);
                let tx = tx.clone();
                progress.probe_started();
                tokio::spawn(async move {
                    let outcome = prober.probe(unit).await;
                    progress.probe_finished(outcome);
                    drop(permit);
                    let _ = tx.send((unit, outcome)).await;
                });
            }
            drop(tx);
        };

        let collect = async {
            let mut outcomes = HashMap::with_capacity(expected);
            while let Some((unit, outcome)) = rx.recv().await {
                if outcomes.insert(unit, outcome).is_some() {
                    warn!(%unit, "duplicate outcome in sweep {index}");
                }
                if let Some(pb) = &bar {
                    pb.inc(1);
                    if outcome.is_open() {
                        pb.set_message(format!("open: {unit}"));
                    }
                }
            }
            outcomes
        };

        let ((), outcomes) = tokio::join!(dispatch, collect);

        if let Some(pb) = bar {
            pb.finish_and_clear();
        }
        let sweep = SweepResult::new(index, expected, outcomes, started_at, clock.elapsed());
        if sweep.is_complete() {
            self.progress.sweep_finished();
        } else {
            debug!(
                "sweep {index} stopped early with {}/{} outcomes",
                sweep.len(),
                expected
            );
        }
        sweep
    }
}
