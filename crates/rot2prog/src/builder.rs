//! Rot2ProgBuilder -- fluent builder for constructing [`Rot2Prog`] clients.
//!
//! Separates configuration from construction so that callers can fix the
//! protocol variant, limits and timeouts before the connection is opened.
//! Building performs exactly one STATUS exchange to learn the controller's
//! resolution; if it fails, the error is returned and nothing is retried.
//! Wrap the builder in your own retry policy if you need one.
//!
//! # Example
//!
//! ```no_run
//! use rot2prog::Rot2ProgBuilder;
//! use rot2prog_core::DigitEncoding;
//! use std::time::Duration;
//!
//! # async fn example() -> rot2prog_core::Result<()> {
//! let rot = Rot2ProgBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .digit_encoding(DigitEncoding::Raw)
//!     .response_timeout(Duration::from_secs(2))
//!     .build()
//!     .await?;
//!
//! let position = rot.status().await?;
//! println!("{position}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use rot2prog_core::{
    DigitEncoding, Error, LimitPolicy, Limits, ProtocolConfig, ResolutionSet, Result, Transport,
};
use rot2prog_transport::serial::ROT2PROG_BAUD_RATE;
use rot2prog_transport::SerialTransport;

use crate::controller::Rot2Prog;

/// Worst-case time for the controller to answer STATUS or STOP.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fluent builder for [`Rot2Prog`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let rot = Rot2ProgBuilder::new()
///     .serial_port("/dev/ttyUSB0")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Rot2ProgBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    response_timeout: Duration,
    config: ProtocolConfig,
    limits: Limits,
}

impl Rot2ProgBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Rot2ProgBuilder {
            serial_port: None,
            baud_rate: ROT2PROG_BAUD_RATE,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            config: ProtocolConfig::default(),
            limits: Limits::default(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set how long to wait for a STATUS or STOP response (default: 5s).
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Select raw or ASCII digits. Must match the controller.
    pub fn digit_encoding(mut self, encoding: DigitEncoding) -> Self {
        self.config.digit_encoding = encoding;
        self
    }

    /// Select which resolutions the controller may report.
    pub fn resolutions(mut self, resolutions: ResolutionSet) -> Self {
        self.config.resolutions = resolutions;
        self
    }

    /// Select what happens to out-of-range SET targets
    /// (default: [`LimitPolicy::Reject`]).
    pub fn limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.config.limit_policy = policy;
        self
    }

    /// Replace the whole protocol configuration.
    pub fn config(mut self, config: ProtocolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial SET bounds.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Build a [`Rot2Prog`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` or one
    /// end of a `PipeTransport` from `rot2prog-test-harness`) and for
    /// callers that manage the transport lifecycle themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Rot2Prog> {
        if self.response_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "response_timeout must be non-zero".into(),
            ));
        }
        Rot2Prog::connect(transport, self.config, self.limits, self.response_timeout).await
    }

    /// Build a [`Rot2Prog`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<Rot2Prog> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for Rot2ProgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rot2prog_core::{Position, Resolution};
    use rot2prog_test_harness::MockTransport;

    use crate::packet;

    const RESPONSE_ASCII: [u8; 12] = [
        0x57, b'3', b'7', b'0', b'5', 2, b'4', b'0', b'5', b'0', 2, 0x20,
    ];

    #[test]
    fn builder_defaults() {
        let builder = Rot2ProgBuilder::new();
        assert_eq!(builder.baud_rate, 600);
        assert_eq!(builder.response_timeout, Duration::from_secs(5));
        assert_eq!(builder.config, ProtocolConfig::default());
        assert_eq!(builder.limits, Limits::default());
        assert!(builder.serial_port.is_none());
    }

    #[test]
    fn builder_setters() {
        let builder = Rot2ProgBuilder::new()
            .serial_port("/dev/ttyUSB3")
            .baud_rate(9600)
            .response_timeout(Duration::from_millis(250))
            .digit_encoding(DigitEncoding::Ascii)
            .resolutions(ResolutionSet::Extended)
            .limit_policy(LimitPolicy::Correct)
            .limits(Limits::new(0.0, 360.0, 0.0, 90.0));

        assert_eq!(builder.serial_port.as_deref(), Some("/dev/ttyUSB3"));
        assert_eq!(builder.baud_rate, 9600);
        assert_eq!(builder.response_timeout, Duration::from_millis(250));
        assert_eq!(
            builder.config,
            ProtocolConfig {
                digit_encoding: DigitEncoding::Ascii,
                resolutions: ResolutionSet::Extended,
                limit_policy: LimitPolicy::Correct,
            }
        );
        assert_eq!(builder.limits, Limits::new(0.0, 360.0, 0.0, 90.0));
    }

    #[tokio::test]
    async fn build_without_port_fails() {
        let result = Rot2ProgBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_with_zero_timeout_fails() {
        let result = Rot2ProgBuilder::new()
            .response_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_with_transport_exchanges_status_once() {
        let mut mock = MockTransport::new();
        mock.expect(&packet::encode_status(), &RESPONSE_ASCII);
        let log = mock.sent_log();

        let rot = Rot2ProgBuilder::new()
            .digit_encoding(DigitEncoding::Ascii)
            .response_timeout(Duration::from_millis(100))
            .limits(Limits::new(0.0, 360.0, 0.0, 90.0))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(rot.resolution(), Resolution::TWO);
        assert_eq!(rot.limits(), Limits::new(0.0, 360.0, 0.0, 90.0));
        assert_eq!(rot.config().digit_encoding, DigitEncoding::Ascii);
    }

    #[tokio::test]
    async fn mismatched_encoding_fails_to_connect() {
        let mut mock = MockTransport::new();
        mock.expect(&packet::encode_status(), &RESPONSE_ASCII);

        let result = Rot2ProgBuilder::new()
            .response_timeout(Duration::from_millis(100))
            .build_with_transport(Box::new(mock))
            .await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn ascii_client_reads_position() {
        let mut mock = MockTransport::new();
        mock.expect(&packet::encode_status(), &RESPONSE_ASCII);
        mock.expect(&packet::encode_stop(), &RESPONSE_ASCII);

        let rot = Rot2ProgBuilder::new()
            .digit_encoding(DigitEncoding::Ascii)
            .response_timeout(Duration::from_millis(100))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert_eq!(rot.stop().await.unwrap(), Position::new(10.5, 45.0));
    }
}
