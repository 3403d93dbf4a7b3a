//! Fixed-size frame reads over a [`Transport`].
//!
//! A transport may hand back a frame in several pieces (a serial port at
//! 600 baud delivers a few bytes per read). [`read_frame`] accumulates
//! pieces until the buffer is full, the peer goes away, or the deadline
//! passes, and reports how many bytes it collected. Judging a short read is
//! left to the packet decoder.
//!
//! [`discard_pending`] empties whatever is already waiting on the link, so a
//! byte that straggles in after a timed-out read cannot shift the next frame.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use rot2prog_core::{Error, Result, Transport};

/// Fill `buf` from the transport.
///
/// Returns the number of bytes read, which is less than `buf.len()` when the
/// deadline passes or the peer closes the stream first. With `timeout` of
/// `None` the read waits indefinitely for the first byte and every byte
/// after it. Errors other than [`Error::Timeout`] are propagated.
pub(crate) async fn read_frame(
    transport: &mut dyn Transport,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<usize> {
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut filled = 0;

    while filled < buf.len() {
        let remaining = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    break;
                }
                left
            }
            None => Duration::MAX,
        };

        match transport.receive(&mut buf[filled..], remaining).await {
            Ok(0) => {
                trace!(filled, "peer closed during frame read");
                break;
            }
            Ok(n) => filled += n,
            Err(Error::Timeout) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

/// Upper bound on reads per discard, so a link that never goes quiet cannot
/// hold the caller.
const MAX_DISCARD_READS: usize = 16;

/// Drop bytes the transport already holds without waiting for more.
///
/// Returns how many bytes were thrown away. Stops at the first read that
/// would block or reports end of stream; other errors are propagated.
pub(crate) async fn discard_pending(transport: &mut dyn Transport) -> Result<usize> {
    let mut scratch = [0u8; 64];
    let mut discarded = 0;

    for _ in 0..MAX_DISCARD_READS {
        match transport.receive(&mut scratch, Duration::ZERO).await {
            Ok(0) | Err(Error::Timeout) => break,
            Ok(n) => {
                trace!(bytes = ?&scratch[..n], "discarding stale bytes");
                discarded += n;
            }
            Err(e) => return Err(e),
        }
    }

    if discarded > 0 {
        debug!(discarded, "dropped stale bytes before sending");
    }
    Ok(discarded)
}
