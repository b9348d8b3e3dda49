//! Core type definitions using newtype patterns for type safety.
//!
//! These types prevent common logic errors by making invalid states unrepresentable
//! at compile time.

mod port;
mod target;
mod work_unit;

pub use port::{Port, PortError, PortRange, PortSet, PortSpec, ALL_PORTS_KEYWORD, DEFAULT_PORTS};
pub use target::{parse_netblock, TargetError, TargetSet, TargetSpec};
pub use work_unit::{ProbeOutcome, WorkUnit};
