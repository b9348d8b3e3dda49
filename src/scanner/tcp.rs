//! TCP Connect prober implementation.
//!
//! Performs standard TCP connect probes using the operating system's
//! socket API. The full handshake is completed and the connection is
//! dropped right away.

use crate::config::TimeoutPolicy;
use crate::error::ProbeError;
use crate::scanner::traits::Prober;
use crate::types::{ProbeOutcome, WorkUnit};
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// TCP connect prober.
///
/// Does not require elevated privileges.
#[derive(Debug, Clone)]
pub struct TcpConnectProber {
    timeouts: TimeoutPolicy,
}

impl TcpConnectProber {
    pub fn new(timeouts: TimeoutPolicy) -> Self {
        Self { timeouts }
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(&self, addr: SocketAddr, limit: Duration) -> Result<TcpStream, ProbeError> {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
                Err(ProbeError::ConnectionRefused)
            }
            Ok(Err(e)) => Err(ProbeError::ConnectionFailed(e)),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

/// Map a connection attempt onto the three scan outcomes.
fn classify(result: Result<TcpStream, ProbeError>) -> ProbeOutcome {
    match result {
        Ok(_stream) => ProbeOutcome::Open,
        Err(ProbeError::ConnectionRefused) => ProbeOutcome::Closed,
        Err(ProbeError::Timeout | ProbeError::ConnectionFailed(_)) => ProbeOutcome::Unreachable,
    }
}

#[async_trait]
impl Prober for TcpConnectProber {
    async fn probe(&self, unit: WorkUnit) -> ProbeOutcome {
        let limit = self.timeouts.timeout_for(unit.host);
        let result = self.attempt_connect(unit.socket_addr(), limit).await;
        if let Err(ref e) = result {
            trace!(%unit, "probe failed: {e}");
        }
        classify(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Port;
    use std::net::{Ipv4Addr, SocketAddr};
    use tokio::net::TcpListener;

    fn prober(ms: u64) -> TcpConnectProber {
        TcpConnectProber::new(TimeoutPolicy::Fixed(Duration::from_millis(ms)))
    }

    fn local_unit(addr: SocketAddr) -> WorkUnit {
        WorkUnit::new(Ipv4Addr::LOCALHOST, Port::new(addr.port()).unwrap())
    }

    #[tokio::test]
    async fn test_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let unit = local_unit(listener.local_addr().unwrap());

        assert_eq!(prober(1000).probe(unit).await, ProbeOutcome::Open);
    }

    #[tokio::test]
    async fn test_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let unit = local_unit(listener.local_addr().unwrap());
        drop(listener);

        assert_eq!(prober(1000).probe(unit).await, ProbeOutcome::Closed);
    }

    #[tokio::test]
    async fn test_unroutable_is_not_open() {
        // TEST-NET-1, never routed.
        let unit = WorkUnit::new(Ipv4Addr::new(192, 0, 2, 1), Port::new(80).unwrap());
        assert_ne!(prober(50).probe(unit).await, ProbeOutcome::Open);
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            classify(Err(ProbeError::ConnectionRefused)),
            ProbeOutcome::Closed
        );
        assert_eq!(classify(Err(ProbeError::Timeout)), ProbeOutcome::Unreachable);
        let unreachable = io::Error::new(io::ErrorKind::Other, "network unreachable");
        assert_eq!(
            classify(Err(ProbeError::ConnectionFailed(unreachable))),
            ProbeOutcome::Unreachable
        );
    }
}
