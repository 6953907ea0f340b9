use std::fmt;
use std::io;

/// Errors that can occur while turning a typed packet into wire bytes.
#[derive(Debug)]
pub enum EncodeError {
    /// A topic name or filter is longer than the 16-bit length prefix allows.
    StringTooLong(usize),
    /// A binary payload is longer than the 16-bit length prefix allows.
    BytesTooLong(usize),
    /// The remaining length of the packet exceeds the 4-byte varint maximum.
    RemainingLengthTooLarge(usize),
    /// A PUBLISH with QoS > 0 was encoded without a packet identifier assigned.
    MissingPacketId,
    /// `Vec<u8>`/`TcpStream` write failed.
    Io(io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringTooLong(n) => write!(f, "string of {n} bytes exceeds u16 length prefix"),
            Self::BytesTooLong(n) => write!(f, "byte blob of {n} bytes exceeds u16 length prefix"),
            Self::RemainingLengthTooLarge(n) => {
                write!(f, "remaining length {n} exceeds 268435455")
            }
            Self::MissingPacketId => write!(f, "qos > 0 publish requires a packet id"),
            Self::Io(e) => write!(f, "io error while encoding: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors that can occur while parsing wire bytes into a typed packet.
#[derive(Debug)]
pub enum DecodeError {
    /// Not enough bytes have been buffered yet; caller should wait for more.
    Incomplete,
    /// The remaining-length varint used a 5th continuation byte.
    InvalidVarInt,
    /// The 4-bit type nibble in the fixed header does not map to a known packet type.
    InvalidPacketType(u8),
    /// The fixed header decoded to a packet type this decoder does not handle.
    UnexpectedPacketType,
    /// The 4-bit flags nibble is not the value mandated for this packet type.
    InvalidPacketFlags(u8),
    /// Remaining length did not match the payload size mandated for this packet type.
    InvalidRemainingLength(usize),
    /// Granted or requested QoS byte is not 0, 1 or 2.
    InvalidQoS(u8),
    /// Protocol name field was neither `MQIsdp` nor `MQTT`.
    InvalidProtocolName,
    /// Protocol level byte was neither 3 nor 4.
    InvalidProtocolLevel(u8),
    /// CONNECT flags byte set a combination the protocol forbids (e.g. will-qos set
    /// without will-flag, or the reserved bit 0 set).
    InvalidConnectFlags(u8),
    /// CONNACK ack-flags byte set any bit above bit 0.
    InvalidConnAckFlags(u8),
    /// A packet identifier of zero was found where QoS > 0 requires a nonzero one.
    InvalidPacketId,
    /// A length-prefixed string was not valid UTF-8.
    InvalidUtf8,
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "not enough bytes buffered yet"),
            Self::InvalidVarInt => write!(f, "remaining-length varint longer than 4 bytes"),
            Self::InvalidPacketType(t) => write!(f, "unknown packet type nibble {t}"),
            Self::UnexpectedPacketType => write!(f, "fixed header did not match expected packet type"),
            Self::InvalidPacketFlags(flags) => write!(f, "invalid fixed-header flags {flags:#06b}"),
            Self::InvalidRemainingLength(n) => write!(f, "unexpected remaining length {n}"),
            Self::InvalidQoS(q) => write!(f, "invalid qos byte {q}"),
            Self::InvalidProtocolName => write!(f, "protocol name is neither MQIsdp nor MQTT"),
            Self::InvalidProtocolLevel(l) => write!(f, "invalid protocol level {l}"),
            Self::InvalidConnectFlags(b) => write!(f, "invalid connect flags byte {b:#010b}"),
            Self::InvalidConnAckFlags(b) => write!(f, "invalid connack ack-flags byte {b:#010b}"),
            Self::InvalidPacketId => write!(f, "packet id must be nonzero"),
            Self::InvalidUtf8 => write!(f, "string field is not valid utf-8"),
            Self::Io(e) => write!(f, "io error while decoding: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
