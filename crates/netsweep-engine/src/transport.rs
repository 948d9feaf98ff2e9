//! TCP connect seam.
//!
//! Probers never open sockets directly; they go through a [`Dialer`] so the
//! engine can be driven against scripted networks in tests.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A connected stream that a banner can be read from.
pub type ProbeStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait Dialer: Send + Sync {
    /// Opens a TCP connection, failing with [`io::ErrorKind::TimedOut`] once
    /// `timeout` elapses.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<ProbeStream>;
}

/// Dials real sockets through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn connect(&self, addr: SocketAddr, limit: Duration) -> io::Result<ProbeStream> {
        match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(Box::new(stream)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {addr} timed out after {limit:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn connects_to_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let stream = TcpDialer.connect(addr, Duration::from_secs(1)).await;
        assert!(stream.is_ok());
        assert!(accept.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn closed_port_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(TcpDialer.connect(addr, Duration::from_secs(1)).await.is_err());
    }
}
