//! Transport implementations for the ROT2Prog protocol engine.
//!
//! This crate provides [`SerialTransport`], an implementation of the
//! [`Transport`](rot2prog_core::Transport) trait from `rot2prog-core` for
//! USB virtual COM ports and RS-232 connections to the controller.
//!
//! # Example
//!
//! ```no_run
//! use rot2prog_transport::SerialTransport;
//! use rot2prog_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> rot2prog_core::Result<()> {
//! // ROT2Prog controllers talk at 600 baud, 8-N-1.
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 600).await?;
//!
//! // STATUS command
//! transport
//!     .send(&[0x57, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x1F, 0x20])
//!     .await?;
//!
//! let mut buf = [0u8; 12];
//! let n = transport.receive(&mut buf, Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{SerialTransport, ROT2PROG_BAUD_RATE};
