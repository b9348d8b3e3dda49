//! Forward and reverse name resolution.
//!
//! Hostname targets are resolved once before a scan starts. Reverse lookups
//! are best-effort: a failed lookup simply means no name is reported.

use crate::types::TargetError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Name lookups used by target expansion and by the reporters.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve a hostname to its first IPv4 address.
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, TargetError>;

    /// Reverse-resolve an address. Never fails; `None` means no name.
    async fn reverse(&self, addr: Ipv4Addr) -> Option<String>;
}

/// Resolver backed by the operating system and a DNS client.
///
/// Forward lookups try the system resolver first (so `/etc/hosts` entries
/// work) and fall back to querying DNS directly.
pub struct SystemResolver {
    dns: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn new() -> Self {
        let dns = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!("system resolver config unavailable ({e}), using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { dns }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, TargetError> {
        if let Ok(addrs) = tokio::net::lookup_host((host, 0)).await {
            let first = addrs.into_iter().find_map(|sa| match sa.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            });
            if let Some(ip) = first {
                debug!(%host, %ip, "resolved via system resolver");
                return Ok(ip);
            }
        }

        let response = self
            .dns
            .lookup_ip(host)
            .await
            .map_err(|e| TargetError::ResolutionFailed(host.to_string(), e.to_string()))?;

        response
            .iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| TargetError::NoAddressesFound(host.to_string()))
    }

    async fn reverse(&self, addr: Ipv4Addr) -> Option<String> {
        match self.dns.reverse_lookup(IpAddr::V4(addr)).await {
            Ok(lookup) => lookup
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_string()),
            Err(e) => {
                debug!(%addr, "reverse lookup failed: {e}");
                None
            }
        }
    }
}

/// Memoizes reverse lookups per address, failures included.
pub struct ReverseNameCache {
    resolver: Arc<dyn NameResolver>,
    names: HashMap<Ipv4Addr, Option<String>>,
}

impl ReverseNameCache {
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            resolver,
            names: HashMap::new(),
        }
    }

    /// Look up `addr`, consulting the resolver only on the first request.
    pub async fn resolve(&mut self, addr: Ipv4Addr) -> Option<&str> {
        if !self.names.contains_key(&addr) {
            let name = self.resolver.reverse(addr).await;
            self.names.insert(addr, name);
        }
        self.get(addr)
    }

    /// Resolve every address not already cached.
    pub async fn warm(&mut self, addrs: impl IntoIterator<Item = Ipv4Addr>) {
        for addr in addrs {
            self.resolve(addr).await;
        }
    }

    /// Cached name for `addr`, if one was found.
    pub fn get(&self, addr: Ipv4Addr) -> Option<&str> {
        self.names.get(&addr).and_then(|n| n.as_deref())
    }
}

/// Fixed lookup tables for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticResolver {
    forward: HashMap<String, Ipv4Addr>,
    reverse: HashMap<Ipv4Addr, String>,
    pub(crate) reverse_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl StaticResolver {
    pub(crate) fn with_host(mut self, host: &str, ip: [u8; 4]) -> Self {
        self.forward.insert(host.to_string(), Ipv4Addr::from(ip));
        self
    }

    pub(crate) fn with_name(mut self, ip: [u8; 4], name: &str) -> Self {
        self.reverse.insert(Ipv4Addr::from(ip), name.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl NameResolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, TargetError> {
        self.forward
            .get(host)
            .copied()
            .ok_or_else(|| TargetError::NoAddressesFound(host.to_string()))
    }

    async fn reverse(&self, addr: Ipv4Addr) -> Option<String> {
        self.reverse_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.reverse.get(&addr).cloned()
    }
}
