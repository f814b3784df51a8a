//! MQTT-SN v1.2 wire codec
//!
//! Every MQTT-SN message travels as a compact binary frame:
//!
//! ```text
//! [length][message type][type-specific fields]
//! ```
//!
//! The length field is one byte holding the total frame length when that
//! total fits in 255; longer frames use the escape byte `0x01` followed by a
//! two byte big-endian length. All multi-byte integers are big-endian and
//! string fields carry no length prefix of their own: the remaining bytes of
//! the frame *are* the string, which is why every fixed-width field sits in
//! front of the variable one.
//!
//! Each message type has a value struct in one of the submodules with three
//! operations: `len()` pre-computes the exact body size, `encode()` writes a
//! complete frame or fails with [`Error::BufferTooShort`](crate::error::Error)
//! before touching the buffer, and `decode()` parses a received frame without
//! ever reading past its declared length.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use crate::error::Error;

pub mod connect;
pub mod ping;
pub mod publish;
pub mod register;
pub mod subscribe;
pub mod will;

/// Escape byte marking a three byte length field.
pub const LENGTH_ESCAPE: u8 = 0x01;

/// Largest frame this stack will produce or accept by default.
///
/// Inbound frames claiming a larger length are rejected with
/// [`Error::FrameTooLarge`](crate::error::Error) before any decoding.
pub const MAX_FRAME_LEN: usize = 1600;

/// Maximum topic name length accepted by this stack.
pub const MAX_TOPIC_LEN: usize = 256;

/// Maximum publish payload carried through to the application.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// MQTT-SN message type codes, one byte on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Advertise = 0x00,
    SearchGw = 0x01,
    GwInfo = 0x02,
    Connect = 0x04,
    ConnAck = 0x05,
    WillTopicReq = 0x06,
    WillTopic = 0x07,
    WillMsgReq = 0x08,
    WillMsg = 0x09,
    Register = 0x0A,
    RegAck = 0x0B,
    Publish = 0x0C,
    PubAck = 0x0D,
    PubComp = 0x0E,
    PubRec = 0x0F,
    PubRel = 0x10,
    Subscribe = 0x12,
    SubAck = 0x13,
    Unsubscribe = 0x14,
    UnsubAck = 0x15,
    PingReq = 0x16,
    PingResp = 0x17,
    Disconnect = 0x18,
    WillTopicUpd = 0x1A,
    WillTopicResp = 0x1B,
    WillMsgUpd = 0x1C,
    WillMsgResp = 0x1D,
}

impl MsgType {
    /// Map a wire byte onto a message type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::Advertise,
            0x01 => Self::SearchGw,
            0x02 => Self::GwInfo,
            0x04 => Self::Connect,
            0x05 => Self::ConnAck,
            0x06 => Self::WillTopicReq,
            0x07 => Self::WillTopic,
            0x08 => Self::WillMsgReq,
            0x09 => Self::WillMsg,
            0x0A => Self::Register,
            0x0B => Self::RegAck,
            0x0C => Self::Publish,
            0x0D => Self::PubAck,
            0x0E => Self::PubComp,
            0x0F => Self::PubRec,
            0x10 => Self::PubRel,
            0x12 => Self::Subscribe,
            0x13 => Self::SubAck,
            0x14 => Self::Unsubscribe,
            0x15 => Self::UnsubAck,
            0x16 => Self::PingReq,
            0x17 => Self::PingResp,
            0x18 => Self::Disconnect,
            0x1A => Self::WillTopicUpd,
            0x1B => Self::WillTopicResp,
            0x1C => Self::WillMsgUpd,
            0x1D => Self::WillMsgResp,
            _ => return None,
        })
    }
}

/// Return codes carried in acknowledgement messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// The request was accepted.
    Accepted = 0x00,
    /// Rejected: the gateway is congested, try again later.
    RejectedCongestion = 0x01,
    /// Rejected: the topic id is not known to the receiver.
    RejectedInvalidTopicId = 0x02,
    /// Rejected: the feature is not supported.
    RejectedNotSupported = 0x03,
}

impl ReturnCode {
    pub(crate) fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0x00 => Ok(Self::Accepted),
            0x01 => Ok(Self::RejectedCongestion),
            0x02 => Ok(Self::RejectedInvalidTopicId),
            0x03 => Ok(Self::RejectedNotSupported),
            _ => Err(Error::Malformed),
        }
    }
}

/// Quality of Service levels for MQTT-SN messages.
///
/// Levels 0 to 2 carry the usual MQTT delivery guarantees. MQTT-SN adds a
/// fourth encoding, QoS "-1", for publishing to a gateway without a prior
/// connection; it shares the wire bits `0b11`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// At most once delivery, fire and forget.
    AtMostOnce,
    /// At least once delivery, acknowledged with PubAck.
    AtLeastOnce,
    /// Exactly once delivery via the PubRec/PubRel/PubComp exchange.
    ExactlyOnce,
    /// QoS "-1": connectionless publish to a named or predefined topic.
    Connectionless,
}

impl QoS {
    pub(crate) const fn wire_bits(self) -> u8 {
        match self {
            Self::AtMostOnce => 0b00,
            Self::AtLeastOnce => 0b01,
            Self::ExactlyOnce => 0b10,
            Self::Connectionless => 0b11,
        }
    }

    pub(crate) const fn from_wire_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::AtMostOnce,
            0b01 => Self::AtLeastOnce,
            0b10 => Self::ExactlyOnce,
            _ => Self::Connectionless,
        }
    }
}

/// The packed flags byte shared by several message types.
///
/// Wire layout, most significant bit first: dup(1), QoS(2), retain(1),
/// will(1), clean session(1), topic id type(2). [`byte`](Flags::byte) and
/// [`from_byte`](Flags::from_byte) are exact bit-for-bit inverses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub dup: bool,
    pub qos_bits: u8,
    pub retain: bool,
    pub will: bool,
    pub clean_session: bool,
    pub topic_id_type: u8,
}

impl Flags {
    pub(crate) const fn byte(self) -> u8 {
        ((self.dup as u8) << 7)
            | ((self.qos_bits & 0b11) << 5)
            | ((self.retain as u8) << 4)
            | ((self.will as u8) << 3)
            | ((self.clean_session as u8) << 2)
            | (self.topic_id_type & 0b11)
    }

    pub(crate) const fn from_byte(byte: u8) -> Self {
        Self {
            dup: byte & 0x80 != 0,
            qos_bits: (byte >> 5) & 0b11,
            retain: byte & 0x10 != 0,
            will: byte & 0x08 != 0,
            clean_session: byte & 0x04 != 0,
            topic_id_type: byte & 0b11,
        }
    }

    pub(crate) const fn qos(self) -> QoS {
        QoS::from_wire_bits(self.qos_bits)
    }
}

/// Total frame length for a body of `body_len` bytes (message type byte and
/// fields, without the length field itself).
pub const fn frame_len(body_len: usize) -> usize {
    if body_len + 1 <= 255 { body_len + 1 } else { body_len + 3 }
}

/// Write the length field and message type byte for a frame whose body
/// (type byte plus fields) is `body_len` bytes.
///
/// Fails with `BufferTooShort` before writing anything when the buffer
/// cannot hold the whole frame. Returns the offset of the first field byte.
pub(crate) fn start_frame(buf: &mut [u8], body_len: usize, t: MsgType) -> Result<usize, Error> {
    let total = frame_len(body_len);
    if buf.len() < total {
        return Err(Error::BufferTooShort);
    }
    if total <= 255 {
        buf[0] = total as u8;
        buf[1] = t as u8;
        Ok(2)
    } else {
        buf[0] = LENGTH_ESCAPE;
        put_u16(buf, 1, total as u16);
        buf[3] = t as u8;
        Ok(4)
    }
}

/// Read the length field of a received frame.
///
/// Returns the declared total length and the length field's own size.
pub(crate) fn read_frame_header(frame: &[u8]) -> Result<(usize, usize), Error> {
    if frame.is_empty() {
        return Err(Error::BufferTooShort);
    }
    if frame[0] == LENGTH_ESCAPE {
        if frame.len() < 3 {
            return Err(Error::BufferTooShort);
        }
        Ok((get_u16(frame, 1) as usize, 3))
    } else {
        Ok((frame[0] as usize, 1))
    }
}

/// Validate the framing of a received message and return its field bytes.
///
/// Checks that the declared length matches the bytes available and that the
/// message type byte is the expected one. The returned slice covers exactly
/// the fields after the type byte, so downstream parsing can never read
/// beyond the declared frame end.
pub(crate) fn check_frame(frame: &[u8], expected: MsgType) -> Result<&[u8], Error> {
    let (total, header_len) = read_frame_header(frame)?;
    if total != frame.len() {
        return Err(Error::Malformed);
    }
    if total < header_len + 1 {
        return Err(Error::BufferTooShort);
    }
    if frame[header_len] != expected as u8 {
        return Err(Error::WrongMessageType);
    }
    Ok(&frame[header_len + 1..])
}

/// Classify an inbound frame's message type without decoding its fields.
///
/// The declared length is validated first and checked against the receive
/// limit, so an oversize claim is rejected with `FrameTooLarge` before the
/// type byte is trusted.
pub(crate) fn peek_msg_type(frame: &[u8], max_frame_len: usize) -> Result<MsgType, Error> {
    let (total, header_len) = read_frame_header(frame)?;
    if total > max_frame_len {
        return Err(Error::FrameTooLarge);
    }
    if total != frame.len() || total < header_len + 1 {
        return Err(Error::Malformed);
    }
    MsgType::from_byte(frame[header_len]).ok_or(Error::Malformed)
}

pub(crate) fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

pub(crate) fn get_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([buf[at], buf[at + 1]])
}
