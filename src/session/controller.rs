//! The sweep loop state machine.
//!
//! `Idle -> Sweeping -> Evaluating -> (Sweeping | Done)`, with cancellation
//! from `Sweeping` or the inter-sweep pause going straight to `Done`.

use super::{ResultAggregator, ScanSession, SweepResult};
use crate::config::LoopPolicy;
use crate::scanner::{Scheduler, WorkPlan};
use crate::shutdown::ShutdownSignal;
use crate::types::ProbeOutcome;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Sweeping,
    Evaluating,
    Done,
}

/// Decide what follows a finished sweep.
pub fn evaluate(policy: LoopPolicy, results: &ResultAggregator) -> LoopState {
    let done = match policy {
        LoopPolicy::Count(k) => results.sweeps().len() >= k.get() as usize,
        LoopPolicy::Continuous => false,
        LoopPolicy::UntilAllOpen => results.all_latest(ProbeOutcome::Open),
        LoopPolicy::UntilAllClosed => results.all_latest(ProbeOutcome::Closed),
    };
    if done {
        LoopState::Done
    } else {
        LoopState::Sweeping
    }
}

/// Drives sweeps until the loop policy or a shutdown request ends the
/// session.
pub struct LoopController {
    scheduler: Scheduler,
    plan: WorkPlan,
    shutdown: ShutdownSignal,
    sink: Option<mpsc::UnboundedSender<Arc<SweepResult>>>,
    rng: StdRng,
    state: LoopState,
}

impl LoopController {
    pub fn new(scheduler: Scheduler, plan: WorkPlan, shutdown: ShutdownSignal) -> Self {
        Self {
            scheduler,
            plan,
            shutdown,
            sink: None,
            rng: StdRng::from_entropy(),
            state: LoopState::Idle,
        }
    }

    /// Publish each sweep as soon as it is recorded.
    pub fn with_sweep_sink(mut self, sink: mpsc::UnboundedSender<Arc<SweepResult>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Fix the shuffle sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run to completion and hand the session back.
    pub async fn run(mut self, mut session: ScanSession) -> ScanSession {
        while self.state != LoopState::Done {
            self.state = self.step(&mut session).await;
        }
        session.finish();
        info!(
            "session finished after {} sweep(s){}",
            session.iteration(),
            if session.was_cancelled() { " (cancelled)" } else { "" }
        );
        session
    }

    async fn step(&mut self, session: &mut ScanSession) -> LoopState {
        match self.state {
            LoopState::Idle => {
                info!(
                    "scanning {} host(s) x {} port(s), policy {}",
                    self.plan.host_count(),
                    self.plan.port_count(),
                    session.policy()
                );
                LoopState::Sweeping
            }
            LoopState::Sweeping => {
                let index = session.iteration() + 1;
                let units = self.plan.units_for_sweep(&mut self.rng);
                debug!("sweep {index}: {} unit(s)", units.len());
                let sweep = self.scheduler.run_sweep(index, units, &self.shutdown).await;
                let sweep = session.record(sweep);
                let delivered = match &self.sink {
                    Some(sink) => sink.send(Arc::clone(&sweep)).is_ok(),
                    None => true,
                };
                if !delivered {
                    warn!("sweep {index} has no receiver, stopping");
                }

                if !delivered || !sweep.is_complete() || self.shutdown.is_triggered() {
                    session.mark_cancelled();
                    LoopState::Done
                } else {
                    LoopState::Evaluating
                }
            }
            LoopState::Evaluating => match evaluate(session.policy(), session.results()) {
                LoopState::Sweeping => self.pause(session).await,
                next => next,
            },
            LoopState::Done => LoopState::Done,
        }
    }

    /// Wait out the inter-sweep delay unless shutdown arrives first.
    async fn pause(&mut self, session: &mut ScanSession) -> LoopState {
        let delay = session.loop_delay();
        if delay.is_zero() {
            return LoopState::Sweeping;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => LoopState::Sweeping,
            _ = self.shutdown.triggered() => {
                session.mark_cancelled();
                LoopState::Done
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScanPlan, ShuffleOptions, TimeoutPolicy};
    use crate::dns::StaticResolver;
    use crate::scanner::traits::ScriptedProber;
    use crate::session::aggregator::sweep_of;
    use crate::shutdown;
    use crate::types::{Port, PortSet, TargetSpec, WorkUnit};
    use std::net::Ipv4Addr;
    use std::num::{NonZeroU32, NonZeroUsize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scan_plan(target: &str, ports: &str, policy: LoopPolicy) -> ScanPlan {
        ScanPlan {
            target: TargetSpec::parse(target).unwrap(),
            exclude: None,
            ports: PortSet::build(Some(ports), None).unwrap(),
            concurrency: NonZeroUsize::new(4).unwrap(),
            timeout: TimeoutPolicy::default(),
            loop_policy: policy,
            shuffle: ShuffleOptions::default(),
            loop_delay: Duration::ZERO,
            rate_limit: None,
        }
    }

    async fn run_with(
        plan: &ScanPlan,
        prober: impl crate::scanner::Prober + 'static,
        signal: ShutdownSignal,
    ) -> ScanSession {
        let targets = plan
            .target
            .expand(plan.exclude, &StaticResolver::default())
            .await
            .unwrap();
        let work = WorkPlan::new(&targets, &plan.ports, plan.shuffle);
        let scheduler = Scheduler::new(Arc::new(prober), plan.concurrency);
        let session = ScanSession::new(plan, &targets);
        LoopController::new(scheduler, work, signal)
            .with_seed(5)
            .run(session)
            .await
    }

    fn all_closed(_: WorkUnit) -> ProbeOutcome {
        ProbeOutcome::Closed
    }

    #[test]
    fn test_evaluate_count() {
        let mut agg = ResultAggregator::new(0);
        let three = LoopPolicy::Count(NonZeroU32::new(3).unwrap());
        agg.record(sweep_of(1, 0, &[]));
        assert_eq!(evaluate(three, &agg), LoopState::Sweeping);
        agg.record(sweep_of(2, 0, &[]));
        agg.record(sweep_of(3, 0, &[]));
        assert_eq!(evaluate(three, &agg), LoopState::Done);
        assert_eq!(evaluate(LoopPolicy::Continuous, &agg), LoopState::Sweeping);
    }

    #[test]
    fn test_evaluate_until_policies() {
        let unit = WorkUnit::new(Ipv4Addr::LOCALHOST, Port::new(80).unwrap());
        let mut agg = ResultAggregator::new(1);
        agg.record(sweep_of(1, 1, &[(unit, ProbeOutcome::Unreachable)]));
        assert_eq!(evaluate(LoopPolicy::UntilAllOpen, &agg), LoopState::Sweeping);
        assert_eq!(evaluate(LoopPolicy::UntilAllClosed, &agg), LoopState::Sweeping);

        agg.record(sweep_of(2, 1, &[(unit, ProbeOutcome::Closed)]));
        assert_eq!(evaluate(LoopPolicy::UntilAllClosed, &agg), LoopState::Done);
    }

    #[tokio::test]
    async fn test_fixed_count_runs_exactly_k_sweeps() {
        let plan = scan_plan(
            "10.0.0.0/30",
            "22,80",
            LoopPolicy::Count(NonZeroU32::new(3).unwrap()),
        );
        let session = run_with(&plan, ScriptedProber::new(all_closed), ShutdownSignal::never()).await;

        assert_eq!(session.iteration(), 3);
        assert_eq!(session.completed_loops(), 3);
        assert!(!session.was_cancelled());
        for sweep in session.results().sweeps() {
            assert_eq!(sweep.len(), 8);
        }
    }

    #[tokio::test]
    async fn test_single_sweep_covers_cross_product() {
        let plan = scan_plan("10.0.0.0/30", "22,9999", LoopPolicy::ONCE);
        // Port 22 accepts everywhere, 9999 refuses everywhere.
        let prober = ScriptedProber::new(|unit: WorkUnit| match unit.port.as_u16() {
            22 => ProbeOutcome::Open,
            _ => ProbeOutcome::Closed,
        });
        let session = run_with(&plan, prober, ShutdownSignal::never()).await;

        let sweeps = session.results().sweeps();
        assert_eq!(sweeps.len(), 1);
        let entries: Vec<(String, ProbeOutcome)> = sweeps[0]
            .sorted()
            .iter()
            .map(|(u, outcome)| (u.to_string(), *outcome))
            .collect();
        let expected: Vec<(String, ProbeOutcome)> = (0..4)
            .flat_map(|host| {
                [
                    (format!("10.0.0.{host}:22"), ProbeOutcome::Open),
                    (format!("10.0.0.{host}:9999"), ProbeOutcome::Closed),
                ]
            })
            .collect();
        assert_eq!(entries, expected);
        assert_eq!(session.results().open_total(), 4);
    }

    #[tokio::test]
    async fn test_closed_sink_ends_continuous_loop() {
        let plan = scan_plan("10.0.0.1", "80", LoopPolicy::Continuous);
        let targets = plan
            .target
            .expand(None, &StaticResolver::default())
            .await
            .unwrap();
        let work = WorkPlan::new(&targets, &plan.ports, plan.shuffle);
        let scheduler = Scheduler::new(Arc::new(ScriptedProber::new(all_closed)), plan.concurrency);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let run = LoopController::new(scheduler, work, ShutdownSignal::never())
            .with_sweep_sink(tx)
            .run(ScanSession::new(&plan, &targets));
        let session = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap();

        assert_eq!(session.iteration(), 1);
        assert!(session.was_cancelled());
    }

    #[tokio::test]
    async fn test_until_open_stops_when_everything_answers() {
        let plan = scan_plan("10.0.0.1", "80,443", LoopPolicy::UntilAllOpen);
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&probes);
        // Opens from the third sweep on (two units per sweep).
        let prober = ScriptedProber::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) >= 4 {
                ProbeOutcome::Open
            } else {
                ProbeOutcome::Unreachable
            }
        });
        let session = run_with(&plan, prober, ShutdownSignal::never()).await;

        assert_eq!(session.iteration(), 3);
        assert!(session.results().all_latest(ProbeOutcome::Open));
    }

    #[tokio::test]
    async fn test_until_closed_on_first_sweep() {
        let plan = scan_plan("10.0.0.1", "1-5", LoopPolicy::UntilAllClosed);
        let session = run_with(&plan, ScriptedProber::new(all_closed), ShutdownSignal::never()).await;
        assert_eq!(session.iteration(), 1);
    }

    #[tokio::test]
    async fn test_continuous_stops_on_shutdown() {
        let plan = scan_plan("10.0.0.0/31", "22,80", LoopPolicy::Continuous);
        let (trigger, signal) = shutdown::channel();
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&probes);
        let prober = ScriptedProber::new(move |_| {
            // Last unit of the second sweep.
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 8 {
                trigger.trigger();
            }
            ProbeOutcome::Closed
        });
        let session = run_with(&plan, prober, signal).await;

        assert_eq!(session.iteration(), 2);
        assert!(session.was_cancelled());
        assert_eq!(probes.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_shutdown_during_pause() {
        let mut plan = scan_plan("10.0.0.1", "80", LoopPolicy::Continuous);
        plan.loop_delay = Duration::from_secs(30);
        let (trigger, signal) = shutdown::channel();

        let task = tokio::spawn(async move {
            run_with(&plan, ScriptedProber::new(all_closed), signal).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.trigger();
        let session = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(session.iteration(), 1);
        assert!(session.was_cancelled());
        assert_eq!(session.completed_loops(), 1);
    }

    #[tokio::test]
    async fn test_sink_receives_every_sweep() {
        let plan = scan_plan("10.0.0.1", "80", LoopPolicy::Count(NonZeroU32::new(2).unwrap()));
        let targets = plan
            .target
            .expand(None, &StaticResolver::default())
            .await
            .unwrap();
        let work = WorkPlan::new(&targets, &plan.ports, plan.shuffle);
        let scheduler = Scheduler::new(Arc::new(ScriptedProber::new(all_closed)), plan.concurrency);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let session = LoopController::new(scheduler, work, ShutdownSignal::never())
            .with_sweep_sink(tx)
            .run(ScanSession::new(&plan, &targets))
            .await;

        assert_eq!(session.iteration(), 2);
        assert_eq!(rx.recv().await.unwrap().index(), 1);
        assert_eq!(rx.recv().await.unwrap().index(), 2);
        assert!(rx.recv().await.is_none());
    }
}
