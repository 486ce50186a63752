//! Listener and per-connection tasks

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use calltrace_core::Format;
use calltrace_delivery::Destination;

use crate::decode::{Record, StreamDecoder};
use crate::error::CollectorError;

enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener, std::path::PathBuf),
}

/// Accepts trace streams and forwards decoded records
///
/// The listen address uses the same syntax as a delivery destination:
/// `host:port` binds TCP, anything else binds a Unix domain socket.
pub struct Collector {
    listener: Listener,
    format: Format,
    connections: AtomicU64,
}

impl Collector {
    pub async fn bind(addr: &str, format: Format) -> Result<Self, CollectorError> {
        let listener = match Destination::parse(addr) {
            None => return Err(CollectorError::InvalidAddress(addr.to_string())),
            Some(Destination::Tcp(addr)) => {
                let listener = TcpListener::bind(&addr)
                    .await
                    .map_err(|source| CollectorError::Bind { addr, source })?;
                Listener::Tcp(listener)
            }
            #[cfg(unix)]
            Some(Destination::Unix(path) | Destination::File(path)) => {
                remove_stale_socket(&path);
                let listener = tokio::net::UnixListener::bind(&path).map_err(|source| {
                    CollectorError::Bind {
                        addr: path.display().to_string(),
                        source,
                    }
                })?;
                Listener::Unix(listener, path)
            }
            #[cfg(not(unix))]
            Some(Destination::Unix(path) | Destination::File(path)) => {
                return Err(CollectorError::UnixUnsupported(path.display().to_string()));
            }
        };

        Ok(Self {
            listener,
            format,
            connections: AtomicU64::new(0),
        })
    }

    /// Bound address; the resolved port for `host:0`
    pub fn local_addr(&self) -> String {
        match &self.listener {
            Listener::Tcp(listener) => listener
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "tcp".to_string()),
            #[cfg(unix)]
            Listener::Unix(_, path) => path.display().to_string(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Accept connections until the record receiver is dropped
    pub async fn run(self, records: mpsc::Sender<Record>) {
        info!(addr = %self.local_addr(), format = %self.format, "Collector listening");
        loop {
            tokio::select! {
                _ = records.closed() => break,
                accepted = self.accept_one(&records) => {
                    if let Err(e) = accepted {
                        warn!(error = %e, "Failed to accept connection");
                    }
                }
            }
        }
        info!(
            connections = self.connections.load(Ordering::Relaxed),
            "Collector stopped"
        );
    }

    async fn accept_one(&self, records: &mpsc::Sender<Record>) -> std::io::Result<()> {
        match &self.listener {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                self.connections.fetch_add(1, Ordering::Relaxed);
                let peer = addr.to_string();
                tokio::spawn(handle_connection(stream, peer, self.format, records.clone()));
            }
            #[cfg(unix)]
            Listener::Unix(listener, _) => {
                let (stream, _) = listener.accept().await?;
                let n = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
                let peer = format!("unix#{n}");
                tokio::spawn(handle_connection(stream, peer, self.format, records.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn remove_stale_socket(path: &std::path::Path) {
    use std::os::unix::fs::FileTypeExt;

    let is_socket = std::fs::metadata(path)
        .map(|meta| meta.file_type().is_socket())
        .unwrap_or(false);
    if is_socket {
        debug!(path = %path.display(), "Removing stale socket");
        let _ = std::fs::remove_file(path);
    }
}

/// Decode one connection until it closes or loses framing
pub async fn handle_connection<R>(reader: R, peer: String, format: Format, records: mpsc::Sender<Record>)
where
    R: AsyncRead + Unpin,
{
    info!(%peer, "New connection");
    let mut decoder = StreamDecoder::new(reader, format);
    let mut received = 0u64;
    loop {
        match decoder.next().await {
            Ok(Some(payload)) => {
                received += 1;
                let record = Record {
                    peer: peer.clone(),
                    payload,
                };
                if records.send(record).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                warn!(%peer, error = %e, "Skipping undecodable message");
            }
            Err(e) => {
                warn!(%peer, error = %e, "Connection error");
                break;
            }
        }
    }
    info!(%peer, received, "Connection closed");
}
