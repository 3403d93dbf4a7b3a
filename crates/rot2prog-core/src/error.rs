//! Error types for the ROT2Prog protocol engine.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. The variants keep three failure classes
//! apart so callers can react differently to each:
//!
//! - the controller did not answer ([`Error::Timeout`]),
//! - the controller answered with something unusable
//!   ([`Error::IncompletePacket`], [`Error::InvalidResolution`],
//!   [`Error::Protocol`]),
//! - the request itself was invalid ([`Error::OutOfRange`],
//!   [`Error::InvalidParameter`]).

use crate::types::Axis;

/// The error type for all ROT2Prog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened, write failed).
    #[error("transport error: {0}")]
    Transport(String),

    /// No bytes arrived from the controller before the deadline.
    ///
    /// This typically means the controller is powered off, the cable is
    /// disconnected, or the line settings are wrong.
    #[error("timeout waiting for response")]
    Timeout,

    /// Some, but not all, bytes of a fixed-size frame arrived.
    #[error("incomplete packet: expected {expected} bytes, received {received}")]
    IncompletePacket {
        /// Length of the frame being read.
        expected: usize,
        /// Number of bytes actually received.
        received: usize,
    },

    /// The PH/PV resolution bytes of a response disagree or are not in
    /// the configured set of valid resolutions.
    #[error("invalid controller resolution [PH = {ph}, PV = {pv}]")]
    InvalidResolution {
        /// Horizontal resolution byte.
        ph: u8,
        /// Vertical resolution byte.
        pv: u8,
    },

    /// A SET target lies outside the configured limits.
    #[error("{axis} {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Which axis was rejected.
        axis: Axis,
        /// The requested angle in degrees.
        value: f64,
        /// Lower bound in force at the time of the request.
        min: f64,
        /// Upper bound in force at the time of the request.
        max: f64,
    },

    /// A command packet carried an opcode byte that is not STOP, STATUS or SET.
    #[error("invalid command [K = 0x{0:02X}]")]
    InvalidCommand(u8),

    /// A frame violated the wire format (bad header/trailer, non-digit byte).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An invalid parameter was passed to an operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the controller has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the controller was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for failures where the controller never answered or the
    /// link went away, as opposed to answering with garbage or the caller
    /// asking for something invalid.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Error::Timeout
                | Error::Transport(_)
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
