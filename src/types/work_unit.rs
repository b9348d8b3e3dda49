//! The unit of scheduling and its classified result.

use super::Port;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// One (address, port) probe target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    pub host: Ipv4Addr,
    pub port: Port,
}

impl WorkUnit {
    pub const fn new(host: Ipv4Addr, port: Port) -> Self {
        Self { host, port }
    }

    /// Socket address to connect to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port.as_u16()))
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Classification of a single connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// The TCP handshake completed.
    Open,
    /// The connection was actively refused (RST).
    Closed,
    /// No answer within the timeout, or any failure other than a refusal.
    Unreachable,
}

impl ProbeOutcome {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}
