//! In-memory full-duplex transport pair.
//!
//! [`PipeTransport::pair`] returns two connected ends, so a client can talk
//! to the simulator inside one process the way it would talk to a controller
//! over a null-modem cable. Bytes written to one end are read from the other.
//! Closing one end makes reads on the other end return `Ok(0)`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use rot2prog_core::error::{Error, Result};
use rot2prog_core::transport::Transport;

/// Bytes buffered in each direction before writers wait for readers.
const PIPE_CAPACITY: usize = 256;

/// One end of an in-memory byte pipe.
#[derive(Debug)]
pub struct PipeTransport {
    stream: Option<DuplexStream>,
    label: &'static str,
}

impl PipeTransport {
    /// Create a connected pair of transports.
    ///
    /// By convention the first end goes to the client and the second end to
    /// the simulator; the labels only affect log output.
    pub fn pair() -> (PipeTransport, PipeTransport) {
        let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
        (
            PipeTransport {
                stream: Some(a),
                label: "client",
            },
            PipeTransport {
                stream: Some(b),
                label: "controller",
            },
        )
    }
}

#[async_trait]
impl Transport for PipeTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(end = self.label, data = ?data, "pipe send");
        stream.write_all(data).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => Error::ConnectionLost,
            _ => Error::Io(e),
        })
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(end = self.label, data = ?&buf[..n], "pipe receive");
                Ok(n)
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_cross_the_pipe() {
        let (mut a, mut b) = PipeTransport::pair();
        a.send(&[0x57, 0x1F, 0x20]).await.unwrap();

        let mut buf = [0u8; 8];
        let n = b.receive(&mut buf, Duration::from_secs(1)).await.unwrap();
        assert_eq!(&buf[..n], &[0x57, 0x1F, 0x20]);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (mut a, _b) = PipeTransport::pair();
        let mut buf = [0u8; 8];
        let result = a.receive(&mut buf, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn closing_one_end_ends_the_other() {
        let (mut a, mut b) = PipeTransport::pair();
        a.close().await.unwrap();
        assert!(!a.is_connected());
        assert!(matches!(a.send(&[1]).await, Err(Error::NotConnected)));

        let mut buf = [0u8; 8];
        let n = b.receive(&mut buf, Duration::from_secs(1)).await.unwrap();
        assert_eq!(n, 0);
    }
}
