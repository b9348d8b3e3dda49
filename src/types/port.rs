//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` handle the port grammar, and `PortSet` is the
//! concrete, exclusion-applied set a scan actually probes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Ports scanned when no `--ports` value is given.
pub const DEFAULT_PORTS: &[u16] = &[
    20, 21, 22, 23, 25, 47, 53, 69, 80, 110, 113, 123, 135, 137, 138, 139, 143, 161, 179, 194,
    201, 311, 389, 427, 443, 445, 465, 500, 513, 514, 515, 530, 548, 554, 563, 587, 593, 601, 631,
    636, 660, 674, 691, 694, 749, 751, 843, 873, 901, 902, 903, 987, 990, 992, 993, 994, 995,
    1000, 1167, 1234, 1433, 1434, 1521, 1528, 1723, 1812, 1813, 2000, 2049, 2375, 2376, 2077,
    2078, 2082, 2083, 2086, 2087, 2095, 2096, 2222, 2433, 2483, 2484, 2638, 3000, 3260, 3268,
    3269, 3283, 3306, 3389, 3478, 3690, 4000, 5000, 5432, 5433, 6000, 6667, 7000, 8000, 8080,
    8443, 8880, 8888, 9000, 9001, 9389, 9418, 9998, 27017, 27018, 27019, 28017, 32400,
];

/// Keyword accepted in place of a port list to mean every port.
pub const ALL_PORTS_KEYWORD: &str = "all";

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Parse a single decimal port token, rejecting values outside 1-65535.
    fn parse_token(token: &str) -> Result<Self, PortError> {
        let token = token.trim();
        let value: u32 = token
            .parse()
            .map_err(|_| PortError::InvalidFormat(token.to_string()))?;
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(PortError::OutOfRange(value))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(u32::from(value)))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u32),
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
    #[error("every port was excluded, nothing left to scan")]
    NoPortsRemain,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start.0 > end.0 {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Every port, 1 through 65535.
    pub const fn full() -> Self {
        Self {
            start: Port(Port::MIN),
            end: Port(Port::MAX),
        }
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PortRange {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let part = s.trim();
        match part.split_once('-') {
            Some((lo, hi)) => {
                if hi.contains('-') {
                    return Err(PortError::InvalidFormat(part.to_string()));
                }
                Self::new(Port::parse_token(lo)?, Port::parse_token(hi)?)
            }
            None => Ok(Self::single(Port::parse_token(part)?)),
        }
    }
}

/// A parsed port specification: a list of single ports and ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
/// - Keyword: "all"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Add a port range to the specification.
    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    /// Add a single port to the specification.
    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Get all ports as a sorted, deduplicated set.
    pub fn to_ports(&self) -> BTreeSet<Port> {
        self.ranges.iter().flat_map(|r| r.iter()).collect()
    }

    /// Get the total number of unique ports.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The built-in list of commonly scanned service ports.
    pub fn common() -> Self {
        let mut spec = Self::new();
        for port in DEFAULT_PORTS.iter().copied().filter_map(Port::new) {
            spec.add_port(port);
        }
        spec
    }

    /// Full port range (1-65535).
    pub fn full() -> Self {
        Self {
            ranges: vec![PortRange::full()],
        }
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }
        if s.eq_ignore_ascii_case(ALL_PORTS_KEYWORD) {
            return Ok(Self::full());
        }

        let mut spec = Self::new();
        for part in s.split(',') {
            spec.add_range(part.parse()?);
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// The resolved set of ports a scan probes, after exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSet {
    ports: Vec<Port>,
    excluded: Vec<Port>,
}

impl PortSet {
    /// Build the port set from an optional spec and an optional exclusion spec.
    ///
    /// A missing spec selects [`PortSpec::common`]. Both strings share the
    /// same grammar, including the `all` keyword.
    pub fn build(spec: Option<&str>, exclude: Option<&str>) -> Result<Self, PortError> {
        let included = match spec {
            Some(s) => s.parse::<PortSpec>()?,
            None => PortSpec::common(),
        }
        .to_ports();

        let excluded_spec = match exclude {
            Some(s) => s.parse::<PortSpec>()?.to_ports(),
            None => BTreeSet::new(),
        };

        let excluded: Vec<Port> = included.intersection(&excluded_spec).copied().collect();
        let ports: Vec<Port> = included.difference(&excluded_spec).copied().collect();

        if ports.is_empty() {
            return Err(PortError::NoPortsRemain);
        }

        Ok(Self { ports, excluded })
    }

    /// Ports to probe, ascending.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Ports that the exclusion spec actually removed.
    pub fn excluded(&self) -> &[Port] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
