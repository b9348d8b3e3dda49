//! Command-line definition and handlers.
//!
//! A single flat command: the positional target plus flags, turned into a
//! validated [`RunMode`] before anything touches the network.
//! - [`scan`] runs an active scan session
//! - [`listen`] runs passive listen mode

mod listen;
mod scan;

pub use listen::execute_listen;
pub use scan::execute_scan;

use crate::config::{
    AppSettings, ListenPlan, LoopPolicy, RunMode, ScanPlan, ShuffleOptions, TimeoutPolicy,
};
use crate::error::{ConfigError, ConfigResult};
use crate::output::ReportOptions;
use crate::types::{parse_netblock, PortSet, TargetSpec};
use clap::Parser;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;

const EXAMPLES: &str = "\
Examples:
  tcpsweep 192.168.1.0/24 -p 22,80,443
  tcpsweep scanme.example.org -p all -T 500 -t 0.5
  tcpsweep 10.0.0.0/24 -x 10.0.0.1 -X 25 -s -S
  tcpsweep 10.0.0.7 -p 22 --loop-open -c
  tcpsweep -L -p 8080,8443 -o connections.csv";

/// tcpsweep - A concurrent IPv4 TCP connect scanner.
///
/// Probes every (address, port) pair of a host, hostname or CIDR block with a
/// full TCP handshake. Sweeps can repeat a fixed number of times, forever, or
/// until every port answers open or closed. Listen mode instead logs inbound
/// connections on local ports.
#[derive(Parser, Debug)]
#[command(name = "tcpsweep")]
#[command(author = "HueCodes <huecodes@proton.me>")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A concurrent IPv4 TCP connect scanner", long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Target to scan: IPv4 address, hostname, or CIDR block
    #[arg(value_name = "TARGET", default_value = "127.0.0.1")]
    pub target: String,

    /// Skip every address in this CIDR block (a bare address means /32)
    #[arg(short = 'x', long = "skipnetblock", value_name = "CIDR")]
    pub skip_netblock: Option<String>,

    /// Ports to leave out, same syntax as --ports
    #[arg(short = 'X', long = "skipports", value_name = "PORTS")]
    pub skip_ports: Option<String>,

    /// Ports to scan: "80", "22,80,443", "1-1024", "all" [default: common service ports]
    #[arg(short, long, value_name = "PORTS")]
    pub ports: Option<String>,

    /// Maximum concurrent probes
    #[arg(short = 'T', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Connect timeout in seconds, fractions allowed [default: 0.07 on LAN, 0.18 otherwise]
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Randomize host order
    #[arg(short = 's', long = "shufflehosts")]
    pub shuffle_hosts: bool,

    /// Randomize port order
    #[arg(short = 'S', long = "shuffleports")]
    pub shuffle_ports: bool,

    /// Also report closed and unreachable ports
    #[arg(short = 'c', long)]
    pub closed: bool,

    /// Write results to this CSV file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Reverse-resolve hosts with open ports
    #[arg(short = 'd', long)]
    pub dns: bool,

    /// Verbose output: exclusions, progress, full summary
    #[arg(short, long)]
    pub verbose: bool,

    /// Print runtime statistics every N seconds
    #[arg(short = 'r', long, value_name = "SECONDS")]
    pub runtime: Option<u64>,

    /// Repeat the scan N times, 0 for forever
    #[arg(short = 'l', long = "loop", value_name = "N")]
    pub loop_count: Option<u32>,

    /// Repeat until every port is open
    #[arg(long = "loop-open", visible_alias = "lo")]
    pub loop_open: bool,

    /// Repeat until every port is closed
    #[arg(long = "loop-closed", visible_alias = "lc")]
    pub loop_closed: bool,

    /// Listen for incoming connections on the given ports instead of scanning
    #[arg(short = 'L', long)]
    pub listen: bool,

    /// Maximum probes started per second
    #[arg(long, value_name = "PER_SECOND")]
    pub rate: Option<u32>,

    /// Pause between loop iterations in milliseconds
    #[arg(long = "loop-delay", value_name = "MS")]
    pub loop_delay: Option<u64>,

    /// Path to a settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Validate flags against the loaded settings.
    pub fn run_mode(&self, settings: &AppSettings) -> ConfigResult<RunMode> {
        if self.listen {
            return self.listen_plan().map(RunMode::Listen);
        }

        let target = TargetSpec::parse(&self.target)?;
        let exclude = self
            .skip_netblock
            .as_deref()
            .map(parse_netblock)
            .transpose()?;
        let ports = PortSet::build(self.ports.as_deref(), self.skip_ports.as_deref())?;

        let threads = self.threads.unwrap_or(settings.threads);
        let concurrency = NonZeroUsize::new(threads)
            .ok_or_else(|| ConfigError::InvalidThreads(format!("{threads} (must be at least 1)")))?;

        let timeout = match self.timeout {
            Some(secs) => TimeoutPolicy::Fixed(parse_timeout(secs)?),
            None => TimeoutPolicy::from_settings(settings),
        };

        Ok(RunMode::Scan(ScanPlan {
            target,
            exclude,
            ports,
            concurrency,
            timeout,
            loop_policy: LoopPolicy::from_flags(self.loop_count, self.loop_open, self.loop_closed)?,
            shuffle: ShuffleOptions {
                hosts: self.shuffle_hosts,
                ports: self.shuffle_ports,
            },
            loop_delay: self
                .loop_delay
                .map_or_else(|| settings.loop_delay(), Duration::from_millis),
            rate_limit: NonZeroU32::new(self.rate.unwrap_or(settings.rate_limit)),
        }))
    }

    fn listen_plan(&self) -> ConfigResult<ListenPlan> {
        if self.loop_count.is_some() || self.loop_open || self.loop_closed {
            return Err(ConfigError::InvalidLoopPolicy(
                "loop options cannot be combined with --listen".to_string(),
            ));
        }
        let spec = self.ports.as_deref().ok_or(ConfigError::ListenRequiresPorts)?;
        Ok(ListenPlan {
            ports: PortSet::build(Some(spec), self.skip_ports.as_deref())?,
        })
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            format: self.format,
            show_closed: self.closed,
            verbose: self.verbose,
            resolve_names: self.dns,
            csv_path: self.output.clone(),
        }
    }

    /// Interval for runtime statistics, if requested.
    pub fn stats_interval(&self) -> Option<Duration> {
        self.runtime
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_timeout(secs: f64) -> ConfigResult<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "{secs} (must be a positive number of seconds)"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidTimeout(format!("{secs}: {e}")))
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated lines
    #[default]
    Plain,
    /// JSON document of the whole session
    Json,
    /// CSV rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}
