//! Simulator event types.
//!
//! The simulator reports what it does through a `tokio::sync::broadcast`
//! channel instead of only writing log lines, so tests and front-ends can
//! observe faults and state changes without scraping logs.

use crate::types::Position;

/// An event emitted by the simulator worker.
///
/// Events are delivered on a best-effort basis through a bounded broadcast
/// channel; a slow subscriber may miss events.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A STATUS command was answered with the current position.
    StatusReported {
        /// Position written into the response.
        position: Position,
    },

    /// A STOP command was answered with the current position.
    Stopped {
        /// Position written into the response.
        position: Position,
    },

    /// A SET command moved the simulated rotator.
    Moved {
        /// New position after rounding to one decimal place.
        position: Position,
    },

    /// A command could not be processed. The worker keeps running.
    Fault(SimFault),
}

/// A soft failure inside the simulator loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimFault {
    /// Fewer than 13 bytes arrived before the stream ended.
    ShortPacket {
        /// Number of bytes received.
        received: usize,
    },

    /// The opcode byte was not STOP, STATUS or SET.
    InvalidCommand {
        /// The offending opcode byte.
        opcode: u8,
    },

    /// A SET command carried a non-digit byte in its H/V fields.
    Malformed(String),

    /// The transport failed while reading or writing.
    Transport(String),
}
