//! Listen mode: accept connections on local ports and log who connected.
//!
//! One acceptor task per port feeds a single logger over a channel, so DNS
//! lookups and file writes never race each other.

use crate::dns::ReverseNameCache;
use crate::error::{CliError, CliResult};
use crate::shutdown::ShutdownSignal;
use chrono::{DateTime, Local};
use socket2::{Domain, Protocol, Socket, Type};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const BACKLOG: i32 = 128;

/// One accepted connection.
#[derive(Debug, Clone, Copy)]
pub struct IncomingConnection {
    pub at: DateTime<Local>,
    pub local: SocketAddr,
    pub remote: SocketAddr,
}

/// Bind a listening socket with `SO_REUSEADDR` set.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    TcpListener::from_std(socket.into())
}

/// Bind `0.0.0.0:port` for every port, failing on the first one that
/// cannot be bound.
pub fn bind_all(ports: impl IntoIterator<Item = u16>) -> CliResult<Vec<TcpListener>> {
    ports
        .into_iter()
        .map(|port| {
            bind_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
                .map_err(|source| CliError::Bind { port, source })
        })
        .collect()
}

/// Accept until shutdown, forwarding each connection to `events`.
///
/// Accepted sockets are closed right away.
pub fn spawn_acceptor(
    listener: TcpListener,
    events: mpsc::UnboundedSender<IncomingConnection>,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let local = match stream.local_addr() {
                            Ok(addr) => addr,
                            Err(e) => {
                                debug!("local address unavailable: {e}");
                                continue;
                            }
                        };
                        drop(stream);
                        let event = IncomingConnection { at: Local::now(), local, remote };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
                _ = shutdown.triggered() => break,
            }
        }
    })
}

/// Writes connection lines to the console and, optionally, a CSV log.
pub struct ConnectionLog<W: Write> {
    out: W,
    csv: Option<csv::Writer<File>>,
    names: Option<ReverseNameCache>,
}

impl<W: Write> ConnectionLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            csv: None,
            names: None,
        }
    }

    /// Append rows to `path`, writing the header only if the file is new.
    pub fn with_csv(mut self, path: &Path) -> CliResult<Self> {
        let fresh = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if fresh {
            writer.write_record(["Timestamp", "Local", "Remote"])?;
            writer.flush()?;
        }
        self.csv = Some(writer);
        Ok(self)
    }

    /// Show peer names instead of addresses where reverse DNS has one.
    pub fn with_names(mut self, names: ReverseNameCache) -> Self {
        self.names = Some(names);
        self
    }

    pub async fn record(&mut self, event: &IncomingConnection) -> CliResult<()> {
        let peer = match (&mut self.names, event.remote) {
            (Some(names), SocketAddr::V4(v4)) => names
                .resolve(*v4.ip())
                .await
                .map_or_else(|| v4.ip().to_string(), str::to_string),
            _ => event.remote.ip().to_string(),
        };
        let stamp = event.at.format("%Y-%m-%d %H:%M:%S").to_string();
        let local = event.local.to_string();
        let remote = format!("{peer}:{}", event.remote.port());

        writeln!(self.out, "[{stamp}] Incoming connection on {local} from {remote}")?;
        self.out.flush()?;
        if let Some(csv) = self.csv.as_mut() {
            csv.write_record([stamp.as_str(), local.as_str(), remote.as_str()])?;
            csv.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Log connections from every listener until shutdown.
pub async fn serve<W: Write>(
    listeners: Vec<TcpListener>,
    mut log: ConnectionLog<W>,
    mut shutdown: ShutdownSignal,
) -> CliResult<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let acceptors: Vec<JoinHandle<()>> = listeners
        .into_iter()
        .map(|listener| spawn_acceptor(listener, tx.clone(), shutdown.clone()))
        .collect();
    drop(tx);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => log.record(&event).await?,
                None => break,
            },
            _ = shutdown.triggered() => break,
        }
    }

    for result in futures::future::join_all(acceptors).await {
        if let Err(e) = result {
            warn!("acceptor task ended abnormally: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::StaticResolver;
    use crate::shutdown;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;

    fn loopback_listener() -> TcpListener {
        bind_listener(SocketAddr::from((Ipv4Addr::LOCALHOST, 0))).unwrap()
    }

    #[tokio::test]
    async fn test_acceptor_reports_peer() {
        let listener = loopback_listener();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (trigger, signal) = shutdown::channel();
        let handle = spawn_acceptor(listener, tx, signal);

        let client = TcpStream::connect(addr).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(event.local, addr);
        assert_eq!(event.remote, client.local_addr().unwrap());

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_reuse_address_allows_rebind() {
        let listener = loopback_listener();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(bind_listener(addr).is_ok());
    }

    fn event(remote: [u8; 4]) -> IncomingConnection {
        IncomingConnection {
            at: Local::now(),
            local: SocketAddr::from(([127, 0, 0, 1], 8080)),
            remote: SocketAddr::from((remote, 51000)),
        }
    }

    #[tokio::test]
    async fn test_log_line_and_csv_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listen.csv");

        let mut log = ConnectionLog::new(Vec::new()).with_csv(&path).unwrap();
        log.record(&event([10, 1, 1, 1])).await.unwrap();
        let out = String::from_utf8(log.into_inner()).unwrap();
        assert!(out.ends_with("] Incoming connection on 127.0.0.1:8080 from 10.1.1.1:51000\n"));

        // Reopening appends without a second header.
        let mut log = ConnectionLog::new(io::sink()).with_csv(&path).unwrap();
        log.record(&event([10, 1, 1, 2])).await.unwrap();
        drop(log);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,Local,Remote");
        assert!(lines[1].ends_with(",127.0.0.1:8080,10.1.1.1:51000"));
        assert!(lines[2].ends_with(",127.0.0.1:8080,10.1.1.2:51000"));
    }

    #[tokio::test]
    async fn test_log_uses_peer_name() {
        let resolver = Arc::new(StaticResolver::default().with_name([10, 1, 1, 1], "laptop.lan"));
        let mut log = ConnectionLog::new(Vec::new()).with_names(ReverseNameCache::new(resolver));
        log.record(&event([10, 1, 1, 1])).await.unwrap();
        log.record(&event([10, 1, 1, 9])).await.unwrap();

        let out = String::from_utf8(log.into_inner()).unwrap();
        assert!(out.contains("from laptop.lan:51000\n"));
        assert!(out.contains("from 10.1.1.9:51000\n"));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = loopback_listener();
        let addr = listener.local_addr().unwrap();
        let (trigger, signal) = shutdown::channel();
        let server = tokio::spawn(serve(vec![listener], ConnectionLog::new(io::sink()), signal));

        let _client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
