//! # tcpsweep - A Concurrent IPv4 TCP Connect Scanner
//!
//! tcpsweep probes every (address, port) pair of a target with a full TCP
//! handshake, keeping a bounded number of connection attempts in flight.
//!
//! ## Features
//!
//! - **Flexible Targeting**: Single IPs, hostnames, and CIDR blocks, with one excluded netblock
//! - **Port Specs**: Lists, ranges, `all`, or a built-in common-service list, minus exclusions
//! - **Bounded Concurrency**: A semaphore-gated pool of probe tasks with optional rate limiting
//! - **Loop Policies**: Repeat a fixed number of times, forever, or until every port is open or closed
//! - **Listen Mode**: Log inbound connections on local ports
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//! use tcpsweep::config::{ShuffleOptions, TimeoutPolicy};
//! use tcpsweep::dns::SystemResolver;
//! use tcpsweep::scanner::{Scheduler, TcpConnectProber, WorkPlan};
//! use tcpsweep::shutdown::ShutdownSignal;
//! use tcpsweep::types::{PortSet, TargetSpec};
//!
//! #[tokio::main]
//! async fn main() {
//!     let targets = TargetSpec::parse("192.168.1.0/30")
//!         .unwrap()
//!         .expand(None, &SystemResolver::new())
//!         .await
//!         .unwrap();
//!     let ports = PortSet::build(Some("22,80,443"), None).unwrap();
//!     let plan = WorkPlan::new(&targets, &ports, ShuffleOptions::default());
//!
//!     let prober = Arc::new(TcpConnectProber::new(TimeoutPolicy::default()));
//!     let scheduler = Scheduler::new(prober, NonZeroUsize::new(64).unwrap());
//!     let units = plan.units_for_sweep(&mut rand::thread_rng());
//!     let sweep = scheduler.run_sweep(1, units, &ShutdownSignal::never()).await;
//!
//!     for (unit, outcome) in sweep.sorted() {
//!         println!("{unit} {outcome}");
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, targets, and work units with validated newtypes
//! - [`scanner`] - The prober trait, TCP connect prober, and sweep scheduler
//! - [`session`] - The loop controller and result aggregation across sweeps
//! - [`config`] - Run plans, loop policy, timeouts, and settings
//! - [`output`] - Result reporting
//! - [`listen`] - Passive listen mode
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod dns;
pub mod error;
pub mod listen;
pub mod output;
pub mod scanner;
pub mod session;
pub mod shutdown;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, ProbeError};
pub use scanner::{Prober, Scheduler, TcpConnectProber};
pub use session::{LoopController, ScanSession, SweepResult};
pub use types::{Port, PortSet, ProbeOutcome, TargetSpec, WorkUnit};
