//! Transport trait for controller communication.
//!
//! The [`Transport`] trait abstracts over the byte stream to a ROT2Prog
//! controller: a serial port for real hardware, an in-memory pipe for the
//! simulator, or a scripted mock in tests.
//!
//! The protocol engine in the `rot2prog` crate operates on a `Transport`
//! rather than directly on a serial port, so the same client and simulator
//! code runs against hardware and against `MockTransport` / `PipeTransport`
//! from the `rot2prog-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a controller.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Framing (13-byte commands, 12-byte responses) is handled by the
/// protocol engine that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into the provided buffer.
    ///
    /// Returns the number of bytes actually read, which may be fewer than
    /// `buf.len()`. A return of `Ok(0)` means the peer closed the stream.
    /// Waits up to `timeout` for data; returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrives.
    /// [`Duration::MAX`] waits indefinitely.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
