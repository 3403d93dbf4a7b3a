//! # rot2prog -- Client and simulator for the Alfa ROT2Prog rotator controller
//!
//! `rot2prog` is an asynchronous Rust library that talks to the Alfa
//! ROT2Prog azimuth/elevation rotator controller over its fixed-size binary
//! serial protocol. It also contains a [`Simulator`] that answers the same
//! protocol, for testing without hardware.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rot2prog::Rot2ProgBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rot = Rot2ProgBuilder::new()
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     rot.set(180.0, 30.0).await?;
//!     println!("{}", rot.status().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                    | Purpose                                      |
//! |--------------------------|----------------------------------------------|
//! | `rot2prog-core`          | Types, errors, the `Transport` trait         |
//! | `rot2prog-transport`     | Serial transport (600 baud, 8-N-1)           |
//! | `rot2prog-test-harness`  | `MockTransport` and in-memory `PipeTransport`|
//! | **`rot2prog`**           | Codec, client, simulator                     |
//!
//! Inside this crate:
//!
//! - [`packet`] -- pure encoder/decoder for 13-byte commands and 12-byte
//!   responses
//! - [`registry`] -- the resolution learned from the controller
//! - [`limits`] -- bounds checking for SET targets
//! - [`controller`] -- the [`Rot2Prog`] client
//! - [`builder`] -- [`Rot2ProgBuilder`]
//! - [`sim`] -- the [`Simulator`]
//!
//! ## Protocol variants
//!
//! Controller firmware differs in ways that cannot be detected on the wire:
//! raw or ASCII digits, whether 10 pulses/degree is a valid resolution, and
//! what to do with targets beyond the limits. Each is fixed per instance
//! through [`ProtocolConfig`]; client and controller must agree.

pub mod builder;
pub mod controller;
pub(crate) mod io;
pub mod limits;
pub mod packet;
pub mod registry;
pub mod sim;

pub use rot2prog_core::*;

pub use builder::Rot2ProgBuilder;
pub use controller::Rot2Prog;
pub use sim::{Simulator, SimulatorHandle};
