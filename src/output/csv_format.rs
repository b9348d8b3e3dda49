//! CSV output formatting.

use super::Finding;
use crate::error::CliResult;
use std::fs::File;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::Path;

/// Column names shared by the console CSV stream and the `--output` file.
pub const HEADER: [&str; 5] = ["host", "port", "outcome", "sweep_index", "dns_name"];

fn record(finding: &Finding) -> [String; 5] {
    [
        finding.host.to_string(),
        finding.port.to_string(),
        finding.outcome.to_string(),
        finding.sweep.to_string(),
        finding.name.clone().unwrap_or_default(),
    ]
}

/// Write findings as CSV rows, preceded by the header when asked.
pub fn write_findings<W: Write>(out: W, findings: &[Finding], header: bool) -> CliResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    if header {
        wtr.write_record(HEADER)?;
    }
    for finding in findings {
        wtr.write_record(record(finding))?;
    }
    wtr.flush()?;
    Ok(())
}

/// The `--output` file. Created fresh and flushed after every sweep.
pub struct CsvFile {
    writer: csv::Writer<File>,
}

impl CsvFile {
    pub fn create(path: &Path) -> CliResult<Self> {
        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn append(&mut self, findings: &[Finding]) -> CliResult<()> {
        for finding in findings {
            self.writer.write_record(record(finding))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Record an address or a port that exclusion removed from the scan.
    /// `port` is `None` for an excluded host.
    pub fn append_excluded(&mut self, host: Ipv4Addr, port: Option<u16>) -> CliResult<()> {
        let (port, outcome) = match port {
            Some(port) => (port.to_string(), "port-excluded"),
            None => ("n/a".to_string(), "host-excluded"),
        };
        self.writer
            .write_record([host.to_string(), port, outcome.to_string(), String::new(), String::new()])?;
        Ok(())
    }

    pub fn flush(&mut self) -> CliResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
