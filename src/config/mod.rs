//! Configuration for tcpsweep.
//!
//! Layers built-in defaults, an optional settings file, and command-line
//! flags into a validated [`RunMode`].

mod mode;
mod profiles;
mod settings;

pub use mode::{ListenPlan, LoopPolicy, RunMode, ScanPlan, ShuffleOptions};
pub use profiles::{NetworkProfile, TimeoutPolicy};
pub use settings::{AppSettings, Paths};
