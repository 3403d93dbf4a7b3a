//! Rot2Prog -- the client side of the ROT2Prog protocol.
//!
//! This module ties the packet codec ([`packet`]) to a [`Transport`] to
//! produce a working controller client. It handles the request/response
//! exchange for STATUS and STOP, fire-and-forget SET commands, resolution
//! tracking, and limit enforcement.
//!
//! The serial line carries one exchange at a time with no way to match a
//! response to its request, so every operation holds the transport lock for
//! its full send (and receive) sequence. Bytes left on the line by an earlier
//! exchange that timed out are discarded before each command is written.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use rot2prog_core::{Limits, Position, ProtocolConfig, Resolution, Result, Transport};

use crate::io::{discard_pending, read_frame};
use crate::limits::LimitGuard;
use crate::packet::{self, CommandPacket, RESPONSE_LEN};
use crate::registry::ResolutionRegistry;

/// A connected ROT2Prog controller.
///
/// Constructed via [`Rot2ProgBuilder`](crate::builder::Rot2ProgBuilder),
/// which performs the initial STATUS exchange that learns the controller's
/// resolution. All methods take `&self`; the client can be shared behind an
/// `Arc` and called from several tasks.
pub struct Rot2Prog {
    transport: Mutex<Box<dyn Transport>>,
    config: ProtocolConfig,
    resolution: ResolutionRegistry,
    limits: LimitGuard,
    response_timeout: Duration,
}

impl Rot2Prog {
    /// Wrap a transport and perform the initial STATUS exchange.
    ///
    /// This is called by [`Rot2ProgBuilder`](crate::builder::Rot2ProgBuilder);
    /// callers should use the builder API instead. A failed exchange is
    /// returned as-is; there is no retry.
    pub(crate) async fn connect(
        transport: Box<dyn Transport>,
        config: ProtocolConfig,
        limits: Limits,
        response_timeout: Duration,
    ) -> Result<Self> {
        let rot = Rot2Prog {
            transport: Mutex::new(transport),
            config,
            resolution: ResolutionRegistry::new(),
            limits: LimitGuard::new(limits, config.limit_policy),
            response_timeout,
        };

        let position = rot.status().await?;
        info!(
            %position,
            resolution = %rot.resolution(),
            encoding = ?config.digit_encoding,
            "connected to ROT2Prog controller"
        );
        Ok(rot)
    }

    /// Query the current position.
    ///
    /// On success the controller's reported resolution is recorded. On any
    /// error the previous resolution is kept and the error is returned.
    pub async fn status(&self) -> Result<Position> {
        self.exchange(packet::encode_status(), "STATUS").await
    }

    /// Halt motion and return the position the rotator stopped at.
    pub async fn stop(&self) -> Result<Position> {
        self.exchange(packet::encode_stop(), "STOP").await
    }

    /// Command a move to `azimuth`, `elevation` degrees.
    ///
    /// The target is checked against the current limits first; a rejected
    /// target writes nothing. The controller does not answer SET, so this
    /// returns as soon as the bytes are written.
    pub async fn set(&self, azimuth: f64, elevation: f64) -> Result<()> {
        let target = self.limits.apply(azimuth, elevation)?;

        let mut transport = self.transport.lock().await;
        discard_pending(&mut **transport).await?;
        let resolution = self.resolution.get();
        let command = packet::encode_set(
            target.azimuth,
            target.elevation,
            resolution,
            self.config.digit_encoding,
        );
        debug!(
            az = target.azimuth,
            el = target.elevation,
            %resolution,
            bytes = ?command,
            "sending SET"
        );
        transport.send(&command).await
    }

    /// The bounds SET targets are checked against.
    pub fn limits(&self) -> Limits {
        self.limits.get_limits()
    }

    /// Replace the SET bounds.
    pub fn set_limits(&self, limits: Limits) {
        debug!(?limits, "limits updated");
        self.limits.set_limits(limits);
    }

    /// The resolution learned from the last successful response.
    pub fn resolution(&self) -> Resolution {
        self.resolution.get()
    }

    /// The protocol configuration this client was built with.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Close the transport. Later exchanges fail with `NotConnected`.
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport.close().await?;
        info!("ROT2Prog connection closed");
        Ok(())
    }

    /// Send a command and decode the controller's response, holding the
    /// transport for the whole exchange.
    async fn exchange(&self, command: CommandPacket, name: &'static str) -> Result<Position> {
        let mut transport = self.transport.lock().await;
        discard_pending(&mut **transport).await?;

        debug!(command = name, bytes = ?command, "sending");
        transport.send(&command).await?;

        let mut buf = [0u8; RESPONSE_LEN];
        let n = read_frame(&mut **transport, &mut buf, Some(self.response_timeout)).await?;

        let (position, resolution) = packet::decode_response(
            &buf[..n],
            self.config.digit_encoding,
            self.config.resolutions,
        )
        .inspect_err(|e| {
            debug!(command = name, bytes = ?&buf[..n], error = %e, "bad response");
        })?;

        self.resolution.set(resolution);
        debug!(
            command = name,
            az = position.azimuth,
            el = position.elevation,
            %resolution,
            "response"
        );
        Ok(position)
    }
}

impl std::fmt::Debug for Rot2Prog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rot2Prog")
            .field("config", &self.config)
            .field("resolution", &self.resolution.get())
            .field("limits", &self.limits.get_limits())
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}
