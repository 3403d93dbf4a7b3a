//! A protocol-compatible stand-in for the ROT2Prog controller.
//!
//! The [`Simulator`] owns one end of a [`Transport`] and answers commands
//! the way the controller does: STATUS and STOP get a 12-byte position
//! report, SET moves the simulated rotator silently, anything else is
//! ignored. It runs the packet codec in the opposite direction to
//! [`Rot2Prog`](crate::Rot2Prog), so wiring the two together (for example
//! over a `PipeTransport` pair) exercises the full wire format.
//!
//! The worker waits indefinitely for each command, like the hardware. A
//! [`SimulatorHandle::stop`] cancels that wait, or a response write the
//! peer is not draining, rather than relying on the peer to do anything.
//!
//! Faults never stop the worker. They are logged and published as
//! [`SimEvent::Fault`] on the event channel; see [`Simulator::subscribe`].

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rot2prog_core::{
    Error, Position, ProtocolConfig, Resolution, Result, SimEvent, SimFault, Transport,
};

use crate::io::read_frame;
use crate::packet::{self, Command, ResponsePacket, COMMAND_LEN};

/// Capacity of the simulator event channel.
const EVENT_CAPACITY: usize = 64;

/// Simulated controller state plus the transport it answers on.
pub struct Simulator {
    transport: Box<dyn Transport>,
    config: ProtocolConfig,
    resolution: Resolution,
    position: Position,
    event_tx: broadcast::Sender<SimEvent>,
}

impl Simulator {
    /// Create a simulator reporting `resolution` pulses per degree, using
    /// the default protocol configuration.
    pub fn new(transport: Box<dyn Transport>, resolution: u8) -> Result<Self> {
        Self::with_config(transport, resolution, ProtocolConfig::default())
    }

    /// Create a simulator with an explicit protocol configuration.
    ///
    /// The resolution must belong to `config.resolutions`; a client with the
    /// same configuration would reject anything else.
    pub fn with_config(
        transport: Box<dyn Transport>,
        resolution: u8,
        config: ProtocolConfig,
    ) -> Result<Self> {
        let resolution = config.resolutions.resolution(resolution)?;
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Simulator {
            transport,
            config,
            resolution,
            position: Position::default(),
            event_tx,
        })
    }

    /// Start from `position` instead of (0, 0).
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position.rounded();
        self
    }

    /// The simulated rotator position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The fixed resolution this simulator reports.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The protocol configuration in use.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Subscribe to simulator events.
    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.event_tx.subscribe()
    }

    /// Process one received command frame.
    ///
    /// Returns the response to write back, if the command has one. State
    /// changes and faults are published on the event channel.
    pub fn handle_command(&mut self, frame: &[u8]) -> Option<ResponsePacket> {
        let command = match packet::decode_command(frame, self.config.digit_encoding) {
            Ok(command) => command,
            Err(e) => {
                self.fault(e);
                return None;
            }
        };

        match command {
            Command::Status => {
                debug!(position = %self.position, "STATUS");
                self.emit(SimEvent::StatusReported {
                    position: self.position,
                });
                Some(self.report())
            }
            Command::Stop => {
                debug!(position = %self.position, "STOP");
                self.emit(SimEvent::Stopped {
                    position: self.position,
                });
                Some(self.report())
            }
            Command::Set { h, v } => {
                self.position = packet::pulses_to_position(h, v, self.resolution);
                debug!(h, v, position = %self.position, "SET");
                self.emit(SimEvent::Moved {
                    position: self.position,
                });
                None
            }
        }
    }

    /// Serve commands until `cancel` fires or the peer goes away, then close
    /// the transport. Returns the final position.
    pub async fn run(mut self, cancel: CancellationToken) -> Position {
        info!(
            resolution = %self.resolution,
            position = %self.position,
            encoding = ?self.config.digit_encoding,
            "simulator started"
        );

        loop {
            let mut buf = [0u8; COMMAND_LEN];
            let read = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("simulator cancelled");
                    break;
                }

                read = read_frame(&mut *self.transport, &mut buf, None) => read,
            };

            let n = match read {
                Ok(0) => {
                    info!("peer closed the link");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    error!(error = %e, "simulator read failed");
                    self.emit(SimEvent::Fault(SimFault::Transport(e.to_string())));
                    break;
                }
            };

            let Some(response) = self.handle_command(&buf[..n]) else {
                continue;
            };

            // A peer that stops reading can stall the write indefinitely.
            let sent = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!("simulator cancelled while writing a response");
                    break;
                }

                sent = self.transport.send(&response) => sent,
            };

            if let Err(e) = sent {
                error!(error = %e, "simulator write failed");
                self.emit(SimEvent::Fault(SimFault::Transport(e.to_string())));
                if e.is_link_failure() {
                    break;
                }
            }
        }

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "closing simulator transport failed");
        }
        info!(position = %self.position, "simulator stopped");
        self.position
    }

    /// Run the simulator as a background task.
    pub fn spawn(self) -> SimulatorHandle {
        let cancel = CancellationToken::new();
        let event_tx = self.event_tx.clone();
        let task = tokio::spawn(self.run(cancel.clone()));
        SimulatorHandle {
            cancel,
            task,
            event_tx,
        }
    }

    fn report(&self) -> ResponsePacket {
        packet::encode_response(self.position, self.resolution, self.config.digit_encoding)
    }

    fn fault(&self, e: Error) {
        let fault = match e {
            Error::Timeout => SimFault::ShortPacket { received: 0 },
            Error::IncompletePacket { received, .. } => SimFault::ShortPacket { received },
            Error::InvalidCommand(opcode) => SimFault::InvalidCommand { opcode },
            other => SimFault::Malformed(other.to_string()),
        };
        warn!(?fault, "command ignored");
        self.emit(SimEvent::Fault(fault));
    }

    fn emit(&self, event: SimEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("resolution", &self.resolution)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Handle to a simulator running in the background.
#[derive(Debug)]
pub struct SimulatorHandle {
    cancel: CancellationToken,
    task: JoinHandle<Position>,
    event_tx: broadcast::Sender<SimEvent>,
}

impl SimulatorHandle {
    /// Subscribe to simulator events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SimEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the worker has exited (stopped, or the peer went away).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker, wait for it and return the final position.
    ///
    /// A pending read is abandoned immediately; the transport is closed
    /// before this returns.
    pub async fn stop(self) -> Result<Position> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| Error::Transport(format!("simulator task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rot2prog_core::{DigitEncoding, ResolutionSet};
    use rot2prog_test_harness::{MockTransport, PipeTransport};

    const SET_10_5_45: [u8; 13] = [0x57, 0, 7, 4, 1, 2, 0, 8, 1, 0, 2, 0x2F, 0x20];

    fn sim(resolution: u8) -> Simulator {
        Simulator::new(Box::new(MockTransport::new()), resolution).unwrap()
    }

    fn decode(response: &[u8]) -> (Position, Resolution) {
        packet::decode_response(response, DigitEncoding::Raw, ResolutionSet::Extended).unwrap()
    }

    #[test]
    fn rejects_resolution_outside_set() {
        let result = Simulator::new(Box::new(MockTransport::new()), 3);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = Simulator::new(Box::new(MockTransport::new()), 10);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let config = ProtocolConfig {
            resolutions: ResolutionSet::Extended,
            ..ProtocolConfig::default()
        };
        let sim = Simulator::with_config(Box::new(MockTransport::new()), 10, config).unwrap();
        assert_eq!(sim.resolution(), Resolution::TEN);
    }

    #[test]
    fn status_reports_current_position() {
        let mut sim = sim(4).with_position(Position::new(123.4, 56.7));
        let response = sim.handle_command(&packet::encode_status()).unwrap();
        let (position, resolution) = decode(&response);
        assert_eq!(position, Position::new(123.4, 56.7));
        assert_eq!(resolution, Resolution::FOUR);
    }

    #[test]
    fn stop_and_status_share_response_shape() {
        let mut sim = sim(2).with_position(Position::new(-10.0, 5.0));
        let status = sim.handle_command(&packet::encode_status()).unwrap();
        let stop = sim.handle_command(&packet::encode_stop()).unwrap();
        assert_eq!(status, stop);
    }

    #[test]
    fn set_moves_without_reply() {
        let mut sim = sim(2);
        assert!(sim.handle_command(&SET_10_5_45).is_none());
        assert_eq!(sim.position(), Position::new(10.5, 45.0));

        let response = sim.handle_command(&packet::encode_status()).unwrap();
        assert_eq!(decode(&response).0, Position::new(10.5, 45.0));
    }

    #[test]
    fn set_uses_own_resolution() {
        // 741 pulses at 1 pulse/degree is 381 degrees, not 10.5.
        let mut sim = sim(1);
        sim.handle_command(&SET_10_5_45);
        assert_eq!(sim.position(), Position::new(381.0, 450.0));
    }

    #[test]
    fn ascii_simulator_round_trips() {
        let config = ProtocolConfig {
            digit_encoding: DigitEncoding::Ascii,
            ..ProtocolConfig::default()
        };
        let mut sim = Simulator::with_config(Box::new(MockTransport::new()), 4, config).unwrap();

        let set = packet::encode_set(-12.25, 30.5, Resolution::FOUR, DigitEncoding::Ascii);
        assert!(sim.handle_command(&set).is_none());

        let response = sim.handle_command(&packet::encode_status()).unwrap();
        let (position, _) =
            packet::decode_response(&response, DigitEncoding::Ascii, ResolutionSet::Standard)
                .unwrap();
        // -12.25 rounds to the nearest tenth on the way in.
        assert_eq!(position, Position::new(-12.3, 30.5));
    }

    #[test]
    fn invalid_opcode_is_ignored() {
        let mut sim = sim(1).with_position(Position::new(1.0, 2.0));
        let mut events = sim.subscribe();

        let mut frame = packet::encode_status();
        frame[packet::OPCODE_OFFSET] = 0x3F;
        assert!(sim.handle_command(&frame).is_none());
        assert_eq!(sim.position(), Position::new(1.0, 2.0));
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::Fault(SimFault::InvalidCommand { opcode: 0x3F })
        );
    }

    #[test]
    fn short_frame_is_a_soft_fault() {
        let mut sim = sim(1);
        let mut events = sim.subscribe();

        assert!(sim.handle_command(&SET_10_5_45[..7]).is_none());
        assert_eq!(sim.position(), Position::default());
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::Fault(SimFault::ShortPacket { received: 7 })
        );
    }

    #[test]
    fn malformed_set_digits_are_a_soft_fault() {
        let mut sim = sim(2);
        let mut events = sim.subscribe();

        let mut frame = SET_10_5_45;
        frame[2] = 0x0C;
        assert!(sim.handle_command(&frame).is_none());
        assert_eq!(sim.position(), Position::default());
        assert!(matches!(
            events.try_recv().unwrap(),
            SimEvent::Fault(SimFault::Malformed(_))
        ));
    }

    #[test]
    fn events_report_state_changes() {
        let mut sim = sim(2);
        let mut events = sim.subscribe();

        sim.handle_command(&SET_10_5_45);
        sim.handle_command(&packet::encode_stop());

        let moved = Position::new(10.5, 45.0);
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::Moved { position: moved }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SimEvent::Stopped { position: moved }
        );
    }

    #[tokio::test]
    async fn serves_commands_over_a_pipe() {
        let (mut client, controller) = PipeTransport::pair();
        let handle = Simulator::new(Box::new(controller), 2).unwrap().spawn();

        client.send(&SET_10_5_45).await.unwrap();
        client.send(&packet::encode_status()).await.unwrap();

        let mut buf = [0u8; packet::RESPONSE_LEN];
        let n = read_frame(&mut client, &mut buf, Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(decode(&buf[..n]).0, Position::new(10.5, 45.0));

        assert_eq!(handle.stop().await.unwrap(), Position::new(10.5, 45.0));
    }

    #[tokio::test]
    async fn stop_unblocks_a_pending_read() {
        let (_client, controller) = PipeTransport::pair();
        let handle = Simulator::new(Box::new(controller), 1).unwrap().spawn();

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert!(matches!(stopped, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn stop_does_not_wait_on_a_stalled_peer() {
        let (mut client, controller) = PipeTransport::pair();
        let handle = Simulator::new(Box::new(controller), 1).unwrap().spawn();

        // The client writes STATUS commands but never reads, so the
        // simulator's responses back up until its write blocks.
        let flood = tokio::spawn(async move {
            for _ in 0..40 {
                client.send(&packet::encode_status()).await.unwrap();
            }
            client
        });
        let _client = tokio::time::timeout(Duration::from_secs(2), flood)
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        let stopped = tokio::time::timeout(Duration::from_secs(2), handle.stop()).await;
        assert!(matches!(stopped, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn worker_exits_when_peer_closes() {
        let (mut client, controller) = PipeTransport::pair();
        let handle = Simulator::new(Box::new(controller), 1).unwrap().spawn();

        client.close().await.unwrap();
        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn partial_frame_then_close_reports_short_packet() {
        let (mut client, controller) = PipeTransport::pair();
        let sim = Simulator::new(Box::new(controller), 1).unwrap();
        let mut events = sim.subscribe();
        let handle = sim.spawn();

        client.send(&SET_10_5_45[..5]).await.unwrap();
        client.close().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SimEvent::Fault(SimFault::ShortPacket { received: 5 }));
        handle.stop().await.unwrap();
    }
}
