//! Sinks: stream socket dialers and the append-only file
//!
//! The delivery worker only sees the [`Dialer`] trait, so the reconnect
//! logic is the same for TCP, Unix domain sockets and in-memory test
//! connections.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{ConfigurationError, WriteError};

/// Opens connections to a stream destination
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Connection type produced by a successful dial
    type Conn: AsyncWrite + Unpin + Send;

    /// Establish a new connection
    ///
    /// The worker bounds every call with its dial timeout.
    async fn dial(&self) -> std::io::Result<Self::Conn>;

    /// Human readable destination for diagnostics
    fn describe(&self) -> String;
}

/// Dials a TCP collector and enables keep-alive on every connection
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: String,
    keepalive: Duration,
}

impl TcpDialer {
    pub fn new(addr: impl Into<String>, keepalive: Duration) -> Self {
        Self {
            addr: addr.into(),
            keepalive,
        }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Conn = TcpStream;

    async fn dial(&self) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr).await?;
        let keepalive = TcpKeepalive::new().with_time(self.keepalive);
        if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
            warn!(error = %e, "Failed to set keep-alive");
        }
        debug!(addr = %self.addr, keepalive = ?self.keepalive, "TCP connection opened");
        Ok(stream)
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// Dials a collector listening on a Unix domain socket
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct UnixDialer {
    path: PathBuf,
}

#[cfg(unix)]
impl UnixDialer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(unix)]
#[async_trait]
impl Dialer for UnixDialer {
    type Conn = tokio::net::UnixStream;

    async fn dial(&self) -> std::io::Result<tokio::net::UnixStream> {
        tokio::net::UnixStream::connect(&self.path).await
    }

    fn describe(&self) -> String {
        format!("unix://{}", self.path.display())
    }
}

/// Open the log file once, for appending
///
/// Failure here is a startup error: the host should not run without the
/// sink it asked for.
pub fn open_file_sink(path: &Path) -> Result<tokio::fs::File, ConfigurationError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ConfigurationError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(tokio::fs::File::from_std(file))
}

/// Write one encoded message and push it out of any userspace buffer
pub async fn write_message<W>(writer: &mut W, message: &[u8]) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(message).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_tcp_dialer_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let dialer = TcpDialer::new(addr.clone(), Duration::from_secs(30));
        assert_eq!(dialer.describe(), format!("tcp://{addr}"));

        let (mut conn, accepted) = tokio::join!(dialer.dial(), listener.accept());
        let (mut server, _) = accepted.unwrap();
        write_message(conn.as_mut().unwrap(), b"hello\n").await.unwrap();

        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");
    }

    #[tokio::test]
    async fn test_tcp_dialer_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let dialer = TcpDialer::new(addr, Duration::from_secs(30));
        assert!(dialer.dial().await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_dialer_connects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let dialer = UnixDialer::new(&path);
        let (conn, accepted) = tokio::join!(dialer.dial(), listener.accept());
        assert!(conn.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        std::fs::write(&path, b"existing\n").unwrap();

        let mut file = open_file_sink(&path).unwrap();
        write_message(&mut file, b"appended\n").await.unwrap();
        drop(file);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\nappended\n");
    }

    #[tokio::test]
    async fn test_write_message_writes_whole_message() {
        let mut writer = tokio_test::io::Builder::new().write(b"e0()\n").build();
        write_message(&mut writer, b"e0()\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_write_message_reports_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let mut writer = tokio_test::io::Builder::new().write_error(err).build();
        let result = write_message(&mut writer, b"e0()\n").await;
        assert_eq!(result.unwrap_err().0.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_file_sink_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.log");
        match open_file_sink(&path) {
            Err(ConfigurationError::OpenFile { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected OpenFile error, got {other:?}"),
        }
    }
}
