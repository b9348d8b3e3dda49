//! Network profiles that pick the connect timeout.
//!
//! Targets on the local network answer quickly, so they get a tighter
//! timeout than wide-area targets.

use super::AppSettings;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Where a target lives relative to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkProfile {
    /// Private, loopback, or link-local address.
    Lan,
    /// Anything else.
    Wan,
}

impl NetworkProfile {
    /// Default LAN connect timeout.
    pub const LAN_TIMEOUT: Duration = Duration::from_millis(70);
    /// Default WAN connect timeout.
    pub const WAN_TIMEOUT: Duration = Duration::from_millis(180);

    /// Classify an address.
    pub fn for_address(addr: Ipv4Addr) -> Self {
        if addr.is_private() || addr.is_loopback() || addr.is_link_local() {
            Self::Lan
        } else {
            Self::Wan
        }
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lan => write!(f, "lan"),
            Self::Wan => write!(f, "wan"),
        }
    }
}

/// How the per-probe timeout is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Choose by [`NetworkProfile`] of each probed address.
    Auto { lan: Duration, wan: Duration },
    /// The same timeout for every probe.
    Fixed(Duration),
}

impl TimeoutPolicy {
    /// Automatic selection using the timeouts from `settings`.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::Auto {
            lan: settings.lan_timeout(),
            wan: settings.wan_timeout(),
        }
    }

    /// Timeout for a probe to `addr`.
    pub fn timeout_for(&self, addr: Ipv4Addr) -> Duration {
        match *self {
            Self::Fixed(timeout) => timeout,
            Self::Auto { lan, wan } => match NetworkProfile::for_address(addr) {
                NetworkProfile::Lan => lan,
                NetworkProfile::Wan => wan,
            },
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::Auto {
            lan: NetworkProfile::LAN_TIMEOUT,
            wan: NetworkProfile::WAN_TIMEOUT,
        }
    }
}
