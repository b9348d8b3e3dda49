//! Output formatting module.
//!
//! The [`Reporter`] receives each finished sweep and, at the end, the full
//! session. It renders plain, CSV or JSON on its writer and mirrors the
//! reported findings into an optional CSV file.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::{CsvFile, HEADER as CSV_HEADER};
pub use json_format::{SessionReport, SweepReport};
pub use plain::{print_error, print_info, print_warning};

use crate::cli::OutputFormat;
use crate::dns::{NameResolver, ReverseNameCache};
use crate::error::CliResult;
use crate::session::{ScanSession, SweepResult};
use crate::types::{PortSet, ProbeOutcome, TargetSet};
use serde::Serialize;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;

/// What to show and where.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Also report closed and unreachable outcomes.
    pub show_closed: bool,
    pub verbose: bool,
    /// Reverse-resolve hosts with open ports.
    pub resolve_names: bool,
    pub csv_path: Option<PathBuf>,
}

/// One reported outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub host: Ipv4Addr,
    pub port: u16,
    pub outcome: ProbeOutcome,
    pub sweep: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Renders scan results as they arrive.
pub struct Reporter<W: Write> {
    out: W,
    options: ReportOptions,
    repeats: bool,
    names: Option<ReverseNameCache>,
    csv_file: Option<CsvFile>,
    csv_header_written: bool,
    sweep_reports: Vec<SweepReport>,
}

impl<W: Write> Reporter<W> {
    /// Create the reporter, creating the CSV file if one was requested.
    pub fn new(out: W, options: ReportOptions, resolver: Arc<dyn NameResolver>) -> CliResult<Self> {
        let csv_file = options
            .csv_path
            .as_deref()
            .map(CsvFile::create)
            .transpose()?;
        let names = options
            .resolve_names
            .then(|| ReverseNameCache::new(resolver));

        Ok(Self {
            out,
            options,
            repeats: false,
            names,
            csv_file,
            csv_header_written: false,
            sweep_reports: Vec::new(),
        })
    }

    /// Print a `completed loops` line after every full sweep.
    pub fn with_repeats(mut self, repeats: bool) -> Self {
        self.repeats = repeats;
        self
    }

    fn plain(&self) -> bool {
        self.options.format == OutputFormat::Plain
    }

    /// Announce what exclusion removed. Verbose plain output shows it on the
    /// console, and any verbose run records it in the CSV file.
    pub fn scan_started(&mut self, targets: &TargetSet, ports: &PortSet) -> CliResult<()> {
        if !self.options.verbose {
            return Ok(());
        }
        let console = self.plain();
        for &host in targets.excluded() {
            if console {
                writeln!(self.out, "{}", plain::host_excluded_line(host))?;
            }
            if let Some(file) = self.csv_file.as_mut() {
                file.append_excluded(host, None)?;
            }
        }
        for &host in targets.addresses() {
            for port in ports.excluded() {
                if console {
                    writeln!(self.out, "{}", plain::port_excluded_line(host, port.as_u16()))?;
                }
                if let Some(file) = self.csv_file.as_mut() {
                    file.append_excluded(host, Some(port.as_u16()))?;
                }
            }
        }
        if let Some(file) = self.csv_file.as_mut() {
            file.flush()?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Report one finished sweep, partial or not.
    pub async fn sweep_finished(&mut self, sweep: &SweepResult) -> CliResult<()> {
        if let Some(names) = self.names.as_mut() {
            names.warm(sweep.open_hosts()).await;
        }

        let findings: Vec<Finding> = sweep
            .sorted()
            .into_iter()
            .filter(|(_, outcome)| outcome.is_open() || self.options.show_closed)
            .map(|(unit, outcome)| Finding {
                host: unit.host,
                port: unit.port.as_u16(),
                outcome,
                sweep: sweep.index(),
                name: outcome
                    .is_open()
                    .then(|| self.names.as_ref().and_then(|n| n.get(unit.host)))
                    .flatten()
                    .map(str::to_string),
            })
            .collect();

        if let Some(file) = self.csv_file.as_mut() {
            file.append(&findings)?;
        }

        match self.options.format {
            OutputFormat::Plain => {
                for finding in &findings {
                    writeln!(self.out, "{}", plain::finding_line(finding))?;
                }
                if self.repeats && sweep.is_complete() {
                    writeln!(self.out, "{}", plain::completed_loops_line(sweep.index()))?;
                    writeln!(self.out)?;
                }
            }
            OutputFormat::Csv => {
                csv_format::write_findings(&mut self.out, &findings, !self.csv_header_written)?;
                self.csv_header_written = true;
            }
            OutputFormat::Json => {
                self.sweep_reports.push(SweepReport::new(sweep, findings));
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Print the closing summary, or the JSON document.
    pub fn session_finished(&mut self, session: &ScanSession) -> CliResult<()> {
        match self.options.format {
            OutputFormat::Plain => {
                plain::write_summary(&mut self.out, session, self.options.verbose)?;
            }
            OutputFormat::Json => {
                let report = SessionReport::new(session, &self.sweep_reports);
                json_format::write_json(&mut self.out, &report)?;
            }
            OutputFormat::Csv => {}
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoopPolicy, ScanPlan, ShuffleOptions, TimeoutPolicy};
    use crate::dns::StaticResolver;
    use crate::session::aggregator::sweep_of;
    use crate::types::{parse_netblock, Port, TargetSpec, WorkUnit};
    use std::num::NonZeroUsize;
    use std::time::Duration;

    fn unit(last: u8, port: u16) -> WorkUnit {
        WorkUnit::new(Ipv4Addr::new(10, 0, 0, last), Port::new(port).unwrap())
    }

    fn resolver() -> Arc<dyn NameResolver> {
        Arc::new(StaticResolver::default().with_name([10, 0, 0, 1], "web.lan"))
    }

    fn reporter(options: ReportOptions) -> Reporter<Vec<u8>> {
        Reporter::new(Vec::new(), options, resolver()).unwrap()
    }

    fn text(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn mixed_sweep() -> SweepResult {
        sweep_of(
            1,
            3,
            &[
                (unit(2, 22), ProbeOutcome::Unreachable),
                (unit(1, 80), ProbeOutcome::Open),
                (unit(1, 22), ProbeOutcome::Closed),
            ],
        )
    }

    async fn session_for(target: &str, ports: &str, exclude: Option<&str>) -> (ScanPlan, TargetSet) {
        let plan = ScanPlan {
            target: TargetSpec::parse(target).unwrap(),
            exclude: exclude.map(|e| parse_netblock(e).unwrap()),
            ports: PortSet::build(Some(ports), None).unwrap(),
            concurrency: NonZeroUsize::new(2).unwrap(),
            timeout: TimeoutPolicy::default(),
            loop_policy: LoopPolicy::ONCE,
            shuffle: ShuffleOptions::default(),
            loop_delay: Duration::ZERO,
            rate_limit: None,
        };
        let targets = plan
            .target
            .expand(plan.exclude, &StaticResolver::default())
            .await
            .unwrap();
        (plan, targets)
    }

    #[tokio::test]
    async fn test_plain_shows_only_open_by_default() {
        let mut rep = reporter(ReportOptions::default());
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        assert_eq!(text(rep), "10.0.0.1\t80\topen\n");
    }

    #[tokio::test]
    async fn test_closed_flag_shows_everything_sorted() {
        let mut rep = reporter(ReportOptions {
            show_closed: true,
            ..Default::default()
        });
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        assert_eq!(
            text(rep),
            "10.0.0.1\t22\tclosed\n10.0.0.1\t80\topen\n10.0.0.2\t22\tunreachable\n"
        );
    }

    #[tokio::test]
    async fn test_names_only_for_open_hosts() {
        let mut rep = reporter(ReportOptions {
            show_closed: true,
            resolve_names: true,
            ..Default::default()
        });
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        let out = text(rep);
        assert!(out.contains("10.0.0.1\t80\topen\tweb.lan\n"));
        assert!(out.contains("10.0.0.1\t22\tclosed\n"));
    }

    #[tokio::test]
    async fn test_csv_stream_header_once() {
        let mut rep = reporter(ReportOptions {
            format: OutputFormat::Csv,
            ..Default::default()
        });
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        rep.sweep_finished(&sweep_of(2, 3, &[(unit(1, 80), ProbeOutcome::Open)]))
            .await
            .unwrap();
        assert_eq!(
            text(rep),
            "host,port,outcome,sweep_index,dns_name\n10.0.0.1,80,open,1,\n10.0.0.1,80,open,2,\n"
        );
    }

    #[tokio::test]
    async fn test_csv_file_mirrors_findings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut rep = reporter(ReportOptions {
            csv_path: Some(path.clone()),
            ..Default::default()
        });
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        drop(rep);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "host,port,outcome,sweep_index,dns_name\n10.0.0.1,80,open,1,\n"
        );
    }

    #[tokio::test]
    async fn test_repeating_runs_print_loop_lines() {
        let mut rep = reporter(ReportOptions::default()).with_repeats(true);
        rep.sweep_finished(&mixed_sweep()).await.unwrap();
        // Partial sweeps are reported but not counted as loops.
        rep.sweep_finished(&sweep_of(2, 3, &[])).await.unwrap();
        let out = text(rep);
        assert_eq!(out.matches("completed loops:").count(), 1);
        assert!(out.contains("] completed loops:1\n"));
    }

    #[tokio::test]
    async fn test_verbose_lists_exclusions() {
        let (_, targets) = session_for("10.0.0.0/30", "80", Some("10.0.0.2/31")).await;
        let ports = PortSet::build(Some("80,81"), Some("81")).unwrap();
        let mut rep = reporter(ReportOptions {
            verbose: true,
            ..Default::default()
        });
        rep.scan_started(&targets, &ports).unwrap();
        let out = text(rep);
        assert!(out.contains("10.0.0.2\tn/a\thost-excluded\n"));
        assert!(out.contains("10.0.0.3\tn/a\thost-excluded\n"));
        assert!(out.contains("10.0.0.0\t81\tport-excluded\n"));
        assert!(!out.contains("10.0.0.2\t81"));
    }

    #[tokio::test]
    async fn test_verbose_exclusions_reach_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let (_, targets) = session_for("10.0.0.0/31", "80", Some("10.0.0.1")).await;
        let ports = PortSet::build(Some("80,81"), Some("81")).unwrap();
        let mut rep = reporter(ReportOptions {
            format: OutputFormat::Json,
            verbose: true,
            csv_path: Some(path.clone()),
            ..Default::default()
        });
        rep.scan_started(&targets, &ports).unwrap();
        assert_eq!(text(rep), "");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "host,port,outcome,sweep_index,dns_name\n\
             10.0.0.1,n/a,host-excluded,,\n\
             10.0.0.0,81,port-excluded,,\n"
        );
    }

    #[tokio::test]
    async fn test_summary_variants() {
        let (plan, targets) = session_for("10.0.0.1", "22,80", None).await;

        let mut quiet = ScanSession::new(&plan, &targets);
        quiet.record(sweep_of(
            1,
            2,
            &[(unit(1, 22), ProbeOutcome::Closed), (unit(1, 80), ProbeOutcome::Closed)],
        ));
        let mut rep = reporter(ReportOptions::default());
        rep.session_finished(&quiet).unwrap();
        let out = text(rep);
        assert!(out.contains("Opened Ports : 0\n"));
        assert!(out.contains("Ports Scanned: 2\n"));

        let mut found = ScanSession::new(&plan, &targets);
        found.record(mixed_sweep());
        let mut rep = reporter(ReportOptions::default());
        rep.session_finished(&found).unwrap();
        assert_eq!(text(rep), "");

        let mut rep = reporter(ReportOptions {
            verbose: true,
            ..Default::default()
        });
        rep.session_finished(&found).unwrap();
        let out = text(rep);
        assert!(out.contains("Active Hosts   : 1\n"));
        assert!(out.contains("Hosts Scanned  : 2\n"));
        assert!(out.contains("Completed Loops: 1\n"));
    }

    #[tokio::test]
    async fn test_json_document() {
        let (plan, targets) = session_for("10.0.0.1", "22,80", None).await;
        let mut session = ScanSession::new(&plan, &targets);
        let sweep = session.record(mixed_sweep());

        let mut rep = reporter(ReportOptions {
            format: OutputFormat::Json,
            ..Default::default()
        });
        rep.sweep_finished(&sweep).await.unwrap();
        rep.session_finished(&session).unwrap();

        let doc: serde_json::Value = serde_json::from_slice(&rep.into_inner()).unwrap();
        assert_eq!(doc["target"], "10.0.0.1");
        assert_eq!(doc["completed_loops"], 1);
        assert_eq!(doc["sweeps"][0]["open"], 1);
        assert_eq!(doc["sweeps"][0]["findings"][0]["port"], 80);
        assert_eq!(doc["sweeps"][0]["findings"][0]["outcome"], "open");
    }
}
