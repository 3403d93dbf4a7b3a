//! ROT2Prog packet encoder/decoder.
//!
//! The controller speaks a fixed-size binary protocol. Every command is 13
//! bytes and every response is 12 bytes; there is no length prefix and no
//! checksum. This module handles the pure byte-level encoding and decoding
//! of both directions. Nothing here performs I/O or logs.
//!
//! # Frame format
//!
//! ```text
//! Command  (13 bytes): 0x57 H1 H2 H3 H4 PH V1 V2 V3 V4 PV K 0x20
//! Response (12 bytes): 0x57 H1 H2 H3 H4 PH V1 V2 V3 V4 PV 0x20
//! ```
//!
//! - `H1..H4`, `V1..V4`: four decimal digits per axis, raw or ASCII per
//!   [`DigitEncoding`]
//! - `PH`, `PV`: resolution in pulses per degree
//! - `K`: opcode, [`STOP`], [`STATUS`] or [`SET`]
//!
//! In a SET command the digits carry `resolution * (angle + 360)`. In a
//! response they carry `angle + 360` in tenths of a degree, independent of
//! the resolution.

use rot2prog_core::{DigitEncoding, Error, Position, Resolution, ResolutionSet, Result};

/// First byte of every command and response.
pub const HEADER: u8 = 0x57;

/// Last byte of every command and response.
pub const TRAILER: u8 = 0x20;

/// Opcode: halt motion and report the current position.
pub const STOP: u8 = 0x0F;

/// Opcode: report the current position.
pub const STATUS: u8 = 0x1F;

/// Opcode: move to the encoded position. The controller does not reply.
pub const SET: u8 = 0x2F;

/// Length of a command packet.
pub const COMMAND_LEN: usize = 13;

/// Length of a response packet.
pub const RESPONSE_LEN: usize = 12;

/// Offset of the opcode byte in a command packet.
pub const OPCODE_OFFSET: usize = 11;

/// A raw command packet.
pub type CommandPacket = [u8; COMMAND_LEN];

/// A raw response packet.
pub type ResponsePacket = [u8; RESPONSE_LEN];

/// A decoded command, as seen from the controller side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Halt and report position.
    Stop,
    /// Report position.
    Status,
    /// Move to a position given in pulses.
    Set {
        /// `resolution * (azimuth + 360)`
        h: u16,
        /// `resolution * (elevation + 360)`
        v: u16,
    },
}

/// Write `value` as four decimal digits into `field`.
///
/// Only the last four digits survive; a value above 9999 is silently
/// truncated, which is all the fixed-width field can carry.
fn put_digits(field: &mut [u8], value: u32, encoding: DigitEncoding) {
    let mut rest = value % 10_000;
    for slot in field.iter_mut().rev() {
        *slot = encoding.encode((rest % 10) as u8);
        rest /= 10;
    }
}

/// Read four decimal digits from `field`.
fn get_digits(field: &[u8], encoding: DigitEncoding) -> Result<u16> {
    field.iter().try_fold(0u16, |acc, &byte| {
        let digit = encoding.decode(byte).ok_or_else(|| {
            Error::Protocol(format!(
                "byte 0x{:02X} is not a {:?} digit",
                byte, encoding
            ))
        })?;
        Ok(acc * 10 + u16::from(digit))
    })
}

/// Build a command with zeroed position fields.
fn bare_command(opcode: u8) -> CommandPacket {
    let mut packet = [0u8; COMMAND_LEN];
    packet[0] = HEADER;
    packet[OPCODE_OFFSET] = opcode;
    packet[COMMAND_LEN - 1] = TRAILER;
    packet
}

/// Encode a STOP command.
///
/// # Example
///
/// ```
/// use rot2prog::packet::encode_stop;
///
/// assert_eq!(
///     encode_stop(),
///     [0x57, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0F, 0x20]
/// );
/// ```
pub fn encode_stop() -> CommandPacket {
    bare_command(STOP)
}

/// Encode a STATUS command.
pub fn encode_status() -> CommandPacket {
    bare_command(STATUS)
}

/// Convert an angle to the pulse count carried in a SET command.
///
/// Angles below -360 would be negative and saturate to zero.
pub fn angle_to_pulses(angle: f64, resolution: Resolution) -> u32 {
    (f64::from(resolution.pulses_per_degree()) * (angle + 360.0)).round() as u32
}

/// Encode a SET command for the given azimuth and elevation.
///
/// # Example
///
/// ```
/// use rot2prog::packet::encode_set;
/// use rot2prog_core::{DigitEncoding, Resolution};
///
/// // H = round(2 * 370.5) = 741, V = round(2 * 405) = 810
/// let packet = encode_set(10.5, 45.0, Resolution::TWO, DigitEncoding::Raw);
/// assert_eq!(packet, [0x57, 0, 7, 4, 1, 2, 0, 8, 1, 0, 2, 0x2F, 0x20]);
/// ```
pub fn encode_set(
    azimuth: f64,
    elevation: f64,
    resolution: Resolution,
    encoding: DigitEncoding,
) -> CommandPacket {
    let pulses = resolution.pulses_per_degree();
    let mut packet = bare_command(SET);
    put_digits(&mut packet[1..5], angle_to_pulses(azimuth, resolution), encoding);
    packet[5] = pulses;
    put_digits(&mut packet[6..10], angle_to_pulses(elevation, resolution), encoding);
    packet[10] = pulses;
    packet
}

/// Encode a position report as the controller would send it.
///
/// Each axis is written as `angle + 360` in tenths of a degree.
pub fn encode_response(
    position: Position,
    resolution: Resolution,
    encoding: DigitEncoding,
) -> ResponsePacket {
    let tenths = |angle: f64| ((angle + 360.0) * 10.0).round() as u32;
    let pulses = resolution.pulses_per_degree();

    let mut packet = [0u8; RESPONSE_LEN];
    packet[0] = HEADER;
    put_digits(&mut packet[1..5], tenths(position.azimuth), encoding);
    packet[5] = pulses;
    put_digits(&mut packet[6..10], tenths(position.elevation), encoding);
    packet[10] = pulses;
    packet[RESPONSE_LEN - 1] = TRAILER;
    packet
}

/// Check the length of a received frame.
///
/// No bytes at all means the peer never answered; anything between one
/// byte and a full frame is an incomplete packet.
fn check_length(buf: &[u8], expected: usize) -> Result<()> {
    match buf.len() {
        0 => Err(Error::Timeout),
        n if n < expected => Err(Error::IncompletePacket {
            expected,
            received: n,
        }),
        n if n > expected => Err(Error::Protocol(format!(
            "frame too long: expected {} bytes, got {}",
            expected, n
        ))),
        _ => Ok(()),
    }
}

/// Decode a 12-byte response into a position and validated resolution.
///
/// The caller is responsible for recording the returned resolution; on any
/// error nothing should be recorded.
///
/// # Example
///
/// ```
/// use rot2prog::packet::decode_response;
/// use rot2prog_core::{DigitEncoding, Position, Resolution, ResolutionSet};
///
/// let buf = [0x57, 3, 7, 0, 5, 2, 4, 0, 5, 0, 2, 0x20];
/// let (position, resolution) =
///     decode_response(&buf, DigitEncoding::Raw, ResolutionSet::Standard).unwrap();
/// assert_eq!(position, Position::new(10.5, 45.0));
/// assert_eq!(resolution, Resolution::TWO);
/// ```
pub fn decode_response(
    buf: &[u8],
    encoding: DigitEncoding,
    resolutions: ResolutionSet,
) -> Result<(Position, Resolution)> {
    check_length(buf, RESPONSE_LEN)?;

    if buf[0] != HEADER || buf[RESPONSE_LEN - 1] != TRAILER {
        return Err(Error::Protocol(format!(
            "bad response framing: header 0x{:02X}, trailer 0x{:02X}",
            buf[0],
            buf[RESPONSE_LEN - 1]
        )));
    }

    let resolution = resolutions.validate(buf[5], buf[10])?;

    let angle = |tenths: u16| f64::from(tenths) / 10.0 - 360.0;
    let azimuth = angle(get_digits(&buf[1..5], encoding)?);
    let elevation = angle(get_digits(&buf[6..10], encoding)?);

    Ok((Position::new(azimuth, elevation).rounded(), resolution))
}

/// Decode a 13-byte command as the controller sees it.
///
/// Only the opcode selects the command; the header and trailer are not
/// checked, matching how the controller treats its input.
pub fn decode_command(buf: &[u8], encoding: DigitEncoding) -> Result<Command> {
    check_length(buf, COMMAND_LEN)?;

    match buf[OPCODE_OFFSET] {
        STOP => Ok(Command::Stop),
        STATUS => Ok(Command::Status),
        SET => Ok(Command::Set {
            h: get_digits(&buf[1..5], encoding)?,
            v: get_digits(&buf[6..10], encoding)?,
        }),
        other => Err(Error::InvalidCommand(other)),
    }
}

/// Convert SET pulse counts back into a position, rounded to one decimal.
pub fn pulses_to_position(h: u16, v: u16, resolution: Resolution) -> Position {
    let pulses = f64::from(resolution.pulses_per_degree());
    Position::new(f64::from(h) / pulses - 360.0, f64::from(v) / pulses - 360.0).rounded()
}
