//! Target specification types with CIDR, hostname, and exclusion support.
//!
//! Provides flexible target parsing supporting:
//! - Single IPv4 addresses (192.168.1.1)
//! - CIDR notation (192.168.1.0/24)
//! - Hostnames (example.com)
//!
//! and an optional excluded sub-netblock removed after expansion.

use crate::dns::NameResolver;
use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

/// Error type for target parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("invalid target format: {0}")]
    InvalidFormat(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("IPv6 targets are not supported: {0}")]
    Ipv6Unsupported(String),
    #[error("failed to resolve hostname '{0}': {1}")]
    ResolutionFailed(String, String),
    #[error("no IPv4 addresses found for hostname '{0}'")]
    NoAddressesFound(String),
    #[error("every target address was excluded, nothing left to scan")]
    NoTargetsRemain,
}

impl TargetError {
    /// True for failures of the forward lookup rather than of the input syntax.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed(..) | Self::NoAddressesFound(_)
        )
    }
}

/// A target specification as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IPv4 address.
    Single(Ipv4Addr),
    /// A CIDR network range.
    Cidr(Ipv4Network),
    /// A hostname to be resolved.
    Hostname(String),
}

impl TargetSpec {
    /// Parse a target specification from a string.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return match ip {
                IpAddr::V4(v4) => Ok(Self::Single(v4)),
                IpAddr::V6(_) => Err(TargetError::Ipv6Unsupported(s.to_string())),
            };
        }

        if s.contains('/') {
            return parse_netblock(s).map(Self::Cidr);
        }

        if s.chars().any(|c| c.is_ascii_alphabetic()) && is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Number of addresses this spec expands to before exclusion.
    pub fn estimated_host_count(&self) -> u64 {
        match self {
            Self::Single(_) | Self::Hostname(_) => 1,
            Self::Cidr(network) => block_size(network),
        }
    }

    /// Expand into concrete addresses, removing members of `exclude`.
    ///
    /// Every address in a CIDR block is kept, network and broadcast included,
    /// so `/31` yields two addresses and `/32` yields one.
    pub async fn expand(
        &self,
        exclude: Option<Ipv4Network>,
        resolver: &dyn NameResolver,
    ) -> Result<TargetSet, TargetError> {
        let candidates: Vec<Ipv4Addr> = match self {
            Self::Single(ip) => vec![*ip],
            Self::Cidr(network) => network.iter().collect(),
            Self::Hostname(host) => vec![resolver.lookup_ipv4(host).await?],
        };

        let mut seen = HashSet::with_capacity(candidates.len());
        let mut addresses = Vec::with_capacity(candidates.len());
        let mut excluded = Vec::new();

        for ip in candidates {
            if !seen.insert(ip) {
                continue;
            }
            match exclude {
                Some(block) if block.contains(ip) => excluded.push(ip),
                _ => addresses.push(ip),
            }
        }

        if addresses.is_empty() {
            return Err(TargetError::NoTargetsRemain);
        }

        Ok(TargetSet {
            addresses,
            excluded,
        })
    }
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

/// The ordered addresses a scan covers, plus the ones exclusion removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    addresses: Vec<Ipv4Addr>,
    excluded: Vec<Ipv4Addr>,
}

impl TargetSet {
    pub fn addresses(&self) -> &[Ipv4Addr] {
        &self.addresses
    }

    /// Addresses of the primary expansion that fell inside the excluded block.
    pub fn excluded(&self) -> &[Ipv4Addr] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Parse an exclusion block. A bare address is treated as a /32.
pub fn parse_netblock(s: &str) -> Result<Ipv4Network, TargetError> {
    let s = s.trim();
    if s.contains(':') {
        return Err(TargetError::Ipv6Unsupported(s.to_string()));
    }
    if let Ok(ip) = s.parse::<Ipv4Addr>() {
        return Ipv4Network::new(ip, 32).map_err(|_| TargetError::InvalidCidr(s.to_string()));
    }
    s.parse::<Ipv4Network>()
        .map_err(|_| TargetError::InvalidCidr(s.to_string()))
}

fn block_size(network: &Ipv4Network) -> u64 {
    1u64 << (32 - u32::from(network.prefix()))
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    for label in s.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.ends_with(|c: char| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}
