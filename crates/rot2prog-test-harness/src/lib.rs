//! rot2prog-test-harness: Test utilities and in-memory transports for the
//! ROT2Prog protocol engine.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the client without a controller, and [`PipeTransport`] for wiring a
//! client to the simulator inside one process.

pub mod mock_serial;
pub mod pipe;

pub use mock_serial::{MockTransport, SentLog};
pub use pipe::PipeTransport;
