//! Active scan handler.
//!
//! Expands targets, wires the scheduler, loop controller and reporter
//! together, and streams each sweep to the reporter while the next one runs.

use crate::config::ScanPlan;
use crate::dns::NameResolver;
use crate::error::CliResult;
use crate::output::{self, ReportOptions, Reporter};
use crate::scanner::{Scheduler, TcpConnectProber, WorkPlan};
use crate::session::{LoopController, ScanSession, SweepResult};
use crate::shutdown::ShutdownSignal;
use crate::stats::{ScanProgress, StatsEmitter};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Address counts above this are logged before expansion.
const LARGE_TARGET: u64 = 1 << 16;

/// Run a scan session to completion, writing results to `out`.
pub async fn execute_scan<W: Write>(
    plan: ScanPlan,
    report: ReportOptions,
    stats_every: Option<Duration>,
    resolver: Arc<dyn NameResolver>,
    shutdown: ShutdownSignal,
    out: W,
) -> CliResult<ScanSession> {
    let estimate = plan.target.estimated_host_count();
    if estimate > LARGE_TARGET {
        warn!("{} expands to {estimate} addresses before exclusion", plan.target);
    }
    let targets = plan.target.expand(plan.exclude, resolver.as_ref()).await?;
    let work = WorkPlan::new(&targets, &plan.ports, plan.shuffle);
    info!(
        "{} -> {} address(es), {} excluded; {} port(s), {} excluded",
        plan.target,
        targets.len(),
        targets.excluded().len(),
        plan.ports.len(),
        plan.ports.excluded().len()
    );

    let show_bar = report.verbose && stats_every.is_none();
    let progress = Arc::new(ScanProgress::new());
    let stats = stats_every.map(|every| StatsEmitter::spawn(Arc::clone(&progress), every));

    let scheduler = Scheduler::new(Arc::new(TcpConnectProber::new(plan.timeout)), plan.concurrency)
        .with_rate_limit(plan.rate_limit)
        .with_progress(progress)
        .with_progress_bar(show_bar);

    let mut reporter = Reporter::new(out, report, resolver)?.with_repeats(plan.loop_policy.repeats());
    reporter.scan_started(&targets, &plan.ports)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<SweepResult>>();
    let controller = LoopController::new(scheduler, work, shutdown).with_sweep_sink(tx);
    let session = ScanSession::new(&plan, &targets);

    // The controller owns the sender, so the reporter loop ends with it. A
    // reporter error drops the receiver, which stops the controller.
    let report_sweeps = async {
        while let Some(sweep) = rx.recv().await {
            reporter.sweep_finished(&sweep).await?;
        }
        CliResult::Ok(())
    };
    let (session, reported) = tokio::join!(controller.run(session), report_sweeps);
    reported?;

    if let Some(stats) = stats {
        stats.finish();
    }
    if session.was_cancelled() {
        output::print_warning(&format!(
            "scan interrupted after {} sweep(s); results above are partial",
            session.iteration()
        ));
    }
    reporter.session_finished(&session)?;
    Ok(session)
}
