//! Destination resolution
//!
//! The destination string is inspected once at startup. `host:port` with no
//! path separators is a TCP collector; anything path-like is a file, unless
//! it is prefixed with `unix:` or names an existing Unix domain socket.

use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix forcing a path to be treated as a Unix domain socket
pub const UNIX_PREFIX: &str = "unix:";

/// Where encoded events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Stream socket to `host:port`
    Tcp(String),
    /// Local domain socket
    Unix(PathBuf),
    /// Append-only file
    File(PathBuf),
}

impl Destination {
    /// Resolve a destination string; `None` for an empty string
    pub fn parse(target: &str) -> Option<Self> {
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        if let Some(path) = target.strip_prefix(UNIX_PREFIX) {
            return Some(Destination::Unix(PathBuf::from(path)));
        }
        if is_socket_address(target) {
            return Some(Destination::Tcp(target.to_string()));
        }
        let path = PathBuf::from(target);
        if is_unix_socket(&path) {
            Some(Destination::Unix(path))
        } else {
            Some(Destination::File(path))
        }
    }

    /// Whether delivery goes over a stream socket
    pub fn is_socket(&self) -> bool {
        matches!(self, Destination::Tcp(_) | Destination::Unix(_))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Tcp(addr) => write!(f, "tcp://{addr}"),
            Destination::Unix(path) => write!(f, "unix://{}", path.display()),
            Destination::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// `host:port` with no path separators
pub fn is_socket_address(addr: &str) -> bool {
    addr.contains(':') && !addr.contains('/') && !addr.contains('\\')
}

#[cfg(unix)]
fn is_unix_socket(path: &Path) -> bool {
    use std::os::unix::fs::FileTypeExt;

    std::fs::metadata(path)
        .map(|meta| meta.file_type().is_socket())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_unix_socket(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_address_detection() {
        let cases = [
            ("localhost:8080", true),
            ("127.0.0.1:9000", true),
            ("example.com:443", true),
            ("/path/to/file.log", false),
            ("/tmp/socket.sock", false),
            ("C:\\path\\to\\file.log", false),
            ("", false),
            ("invalid", false),
        ];
        for (addr, expected) in cases {
            assert_eq!(is_socket_address(addr), expected, "{addr:?}");
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(Destination::parse(""), None);
        assert_eq!(Destination::parse("   "), None);
        assert_eq!(
            Destination::parse("localhost:8080"),
            Some(Destination::Tcp("localhost:8080".into()))
        );
        assert_eq!(
            Destination::parse("/tmp/calltrace-does-not-exist.log"),
            Some(Destination::File("/tmp/calltrace-does-not-exist.log".into()))
        );
        assert_eq!(
            Destination::parse("unix:/tmp/trace.sock"),
            Some(Destination::Unix("/tmp/trace.sock".into()))
        );
        assert_eq!(
            Destination::parse("unix:relative.sock"),
            Some(Destination::Unix("relative.sock".into()))
        );
        assert_eq!(
            Destination::parse("trace.log"),
            Some(Destination::File("trace.log".into()))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_socket_is_unix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.sock");
        let _listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let target = path.to_str().unwrap();
        assert_eq!(Destination::parse(target), Some(Destination::Unix(path.clone())));
        assert!(Destination::parse(target).unwrap().is_socket());
    }
}
