//! Listen mode handler.

use crate::config::ListenPlan;
use crate::dns::{NameResolver, ReverseNameCache};
use crate::error::CliResult;
use crate::listen::{bind_all, serve, ConnectionLog};
use crate::output::{self, ReportOptions};
use crate::shutdown::ShutdownSignal;
use std::io::Write;
use std::sync::Arc;

/// Bind every port of the plan and log connections until shutdown.
pub async fn execute_listen<W: Write>(
    plan: ListenPlan,
    report: ReportOptions,
    resolver: Arc<dyn NameResolver>,
    shutdown: ShutdownSignal,
    mut out: W,
) -> CliResult<()> {
    let listeners = bind_all(plan.ports.ports().iter().map(|p| p.as_u16()))?;
    for listener in &listeners {
        writeln!(
            out,
            "Listening for incoming TCP connections on {}",
            listener.local_addr()?
        )?;
    }
    output::print_info("Press Ctrl-C to exit.");

    let mut log = ConnectionLog::new(out);
    if let Some(path) = report.csv_path.as_deref() {
        log = log.with_csv(path)?;
    }
    if report.resolve_names {
        log = log.with_names(ReverseNameCache::new(resolver));
    }
    serve(listeners, log, shutdown).await
}
