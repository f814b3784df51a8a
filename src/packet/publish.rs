//! Publish and its acknowledgement messages
//!
//! Publish is the one message whose layout depends on both the topic
//! addressing mode and the QoS: a QoS "-1" publish to an unregistered topic
//! replaces the two byte topic id with the topic name length and carries the
//! name itself between the message id and the payload.

use crate::error::Error;
use crate::packet::{
    Flags, MsgType, QoS, ReturnCode, check_frame, frame_len, get_u16, put_u16, start_frame,
};
use crate::topic::{self, TopicId};

/// A Publish message in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'a> {
    pub dup: bool,
    pub retain: bool,
    pub qos: QoS,
    pub topic: TopicId<'a>,
    /// Message id; meaningful only for QoS 1 and 2, encoded as 0 otherwise.
    pub msg_id: u16,
    pub payload: &'a [u8],
}

impl<'a> Publish<'a> {
    /// Exact body length of the encoded frame.
    pub fn len(&self) -> usize {
        let long_name = match self.topic {
            TopicId::LongPending(name) => name.len(),
            _ => 0,
        };
        6 + long_name + self.payload.len()
    }

    /// Serialize into `buf`, returning the number of bytes written.
    ///
    /// The topic id type is validated against the QoS before the frame is
    /// sized, so an invalid combination never reaches the buffer.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let kind = self.topic.wire_kind(self.qos)?;
        let body = self.len();
        let mut at = start_frame(buf, body, MsgType::Publish)?;
        buf[at] = Flags {
            dup: self.dup,
            qos_bits: self.qos.wire_bits(),
            retain: self.retain,
            topic_id_type: kind,
            ..Flags::default()
        }
        .byte();
        let id_field = self.topic.id_field();
        buf[at + 1] = id_field[0];
        buf[at + 2] = id_field[1];
        put_u16(buf, at + 3, self.msg_id);
        at += 5;
        if let TopicId::LongPending(name) = self.topic {
            buf[at..at + name.len()].copy_from_slice(name.as_bytes());
            at += name.len();
        }
        buf[at..at + self.payload.len()].copy_from_slice(self.payload);
        Ok(frame_len(body))
    }

    /// Parse a received Publish frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::Publish)?;
        if body.len() < 5 {
            return Err(Error::Malformed);
        }
        let flags = Flags::from_byte(body[0]);
        let qos = flags.qos();
        let id_field = [body[1], body[2]];
        let msg_id = get_u16(body, 3);
        let (topic_id, payload) =
            if flags.topic_id_type == topic::KIND_NORMAL && qos == QoS::Connectionless {
                let name_len = u16::from_be_bytes(id_field) as usize;
                if 5 + name_len > body.len() {
                    return Err(Error::Malformed);
                }
                let name =
                    core::str::from_utf8(&body[5..5 + name_len]).map_err(|_| Error::Malformed)?;
                (TopicId::LongPending(name), &body[5 + name_len..])
            } else {
                let topic_id = match flags.topic_id_type {
                    topic::KIND_NORMAL => TopicId::Normal(u16::from_be_bytes(id_field)),
                    topic::KIND_PREDEFINED => TopicId::Predefined(u16::from_be_bytes(id_field)),
                    topic::KIND_SHORT => TopicId::Short(id_field),
                    _ => return Err(Error::InvalidTopicIdType),
                };
                (topic_id, &body[5..])
            };
        Ok(Self {
            dup: flags.dup,
            retain: flags.retain,
            qos,
            topic: topic_id,
            msg_id,
            payload,
        })
    }
}

/// A PubAck message, answering a QoS 1 Publish or rejecting any Publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubAck {
    pub topic_id: u16,
    pub msg_id: u16,
    pub code: ReturnCode,
}

impl PubAck {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = start_frame(buf, 6, MsgType::PubAck)?;
        put_u16(buf, at, self.topic_id);
        put_u16(buf, at + 2, self.msg_id);
        buf[at + 4] = self.code as u8;
        Ok(frame_len(6))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::PubAck)?;
        if body.len() != 5 {
            return Err(Error::Malformed);
        }
        Ok(Self {
            topic_id: get_u16(body, 0),
            msg_id: get_u16(body, 2),
            code: ReturnCode::from_byte(body[4])?,
        })
    }
}

/// PubRec: first acknowledgement step of the QoS 2 exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubRec {
    pub msg_id: u16,
}

/// PubRel: the publisher's release in the QoS 2 exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubRel {
    pub msg_id: u16,
}

/// PubComp: final acknowledgement of the QoS 2 exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubComp {
    pub msg_id: u16,
}

macro_rules! qos2_ack_msg {
    ($name:ident, $msg_type:expr) => {
        impl $name {
            pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                let at = start_frame(buf, 3, $msg_type)?;
                put_u16(buf, at, self.msg_id);
                Ok(frame_len(3))
            }

            pub fn decode(frame: &[u8]) -> Result<Self, Error> {
                let body = check_frame(frame, $msg_type)?;
                if body.len() != 2 {
                    return Err(Error::Malformed);
                }
                Ok(Self {
                    msg_id: get_u16(body, 0),
                })
            }
        }
    };
}

qos2_ack_msg!(PubRec, MsgType::PubRec);
qos2_ack_msg!(PubRel, MsgType::PubRel);
qos2_ack_msg!(PubComp, MsgType::PubComp);
