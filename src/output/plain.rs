//! Plain text output formatting.
//!
//! Result lines are tab-separated and unstyled so they stay greppable;
//! styling is reserved for status messages on stderr.

use super::Finding;
use crate::session::ScanSession;
use chrono::Local;
use console::style;
use std::io::{self, Write};
use std::net::Ipv4Addr;
use std::time::Duration;

/// `host<TAB>port<TAB>outcome[<TAB>name]`
pub fn finding_line(finding: &Finding) -> String {
    match &finding.name {
        Some(name) => format!(
            "{}\t{}\t{}\t{}",
            finding.host, finding.port, finding.outcome, name
        ),
        None => format!("{}\t{}\t{}", finding.host, finding.port, finding.outcome),
    }
}

pub fn host_excluded_line(host: Ipv4Addr) -> String {
    format!("{host}\tn/a\thost-excluded")
}

pub fn port_excluded_line(host: Ipv4Addr, port: u16) -> String {
    format!("{host}\t{port}\tport-excluded")
}

pub fn completed_loops_line(loops: u32) -> String {
    format!(
        "[{}] completed loops:{}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        loops
    )
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}

/// Print the end-of-session summary.
///
/// Verbose runs always get the full block. Otherwise a short block is
/// printed only when nothing was found open, so a quiet scan still says
/// what it covered.
pub fn write_summary<W: Write>(out: &mut W, session: &ScanSession, verbose: bool) -> io::Result<()> {
    let results = session.results();
    if verbose {
        writeln!(out)?;
        writeln!(out, "Scan Time      : {}", format_elapsed(session.elapsed()))?;
        writeln!(out, "Active Hosts   : {}", results.active_hosts().len())?;
        writeln!(out, "Hosts Scanned  : {}", results.hosts_probed())?;
        writeln!(out, "Skipped Hosts  : {}", session.skipped_hosts())?;
        writeln!(out, "Opened Ports   : {}", results.open_total())?;
        writeln!(out, "Skipped Ports  : {}", session.skipped_ports())?;
        writeln!(out, "Ports Scanned  : {}", results.probes_recorded())?;
        writeln!(out, "Completed Loops: {}", session.completed_loops())?;
        writeln!(out)?;
    } else if results.open_total() == 0 {
        writeln!(out)?;
        writeln!(out, "Opened Ports : {}", results.open_total())?;
        writeln!(out, "Hosts Scanned: {}", results.hosts_probed())?;
        writeln!(out, "Ports Scanned: {}", results.probes_recorded())?;
        writeln!(out)?;
    }
    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    eprintln!("{} {}", style("ℹ").blue().bold(), msg);
}
