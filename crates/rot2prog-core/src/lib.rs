//! rot2prog-core: Core traits, types, and error definitions for the ROT2Prog
//! protocol engine.
//!
//! This crate defines the hardware-agnostic pieces shared by the client,
//! the simulator, the transports, and the test harness.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Position`], [`Resolution`], [`Limits`] -- rotator state
//! - [`ProtocolConfig`] -- per-deployment wire format choices
//! - [`SimEvent`] -- simulator notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use rot2prog_core::*`.
pub use error::{Error, Result};
pub use events::{SimEvent, SimFault};
pub use transport::Transport;
pub use types::*;
