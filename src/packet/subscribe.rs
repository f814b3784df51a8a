//! Subscribe, SubAck, Unsubscribe and UnsubAck messages

use crate::error::Error;
use crate::packet::{
    Flags, MsgType, QoS, ReturnCode, check_frame, frame_len, get_u16, put_u16, start_frame,
};
use crate::topic::{self, TopicFilter};

fn encode_filter_body(
    buf: &mut [u8],
    msg_type: MsgType,
    dup: bool,
    qos: QoS,
    msg_id: u16,
    filter: &TopicFilter<'_>,
) -> Result<usize, Error> {
    let body = 4 + filter.encoded_len();
    let at = start_frame(buf, body, msg_type)?;
    buf[at] = Flags {
        dup,
        qos_bits: qos.wire_bits(),
        topic_id_type: filter.wire_kind(),
        ..Flags::default()
    }
    .byte();
    put_u16(buf, at + 1, msg_id);
    match filter {
        TopicFilter::Name(name) => {
            buf[at + 3..at + 3 + name.len()].copy_from_slice(name.as_bytes());
        }
        TopicFilter::Predefined(id) => put_u16(buf, at + 3, *id),
        TopicFilter::Short(name) => {
            buf[at + 3] = name[0];
            buf[at + 4] = name[1];
        }
    }
    Ok(frame_len(body))
}

fn decode_filter_body(
    frame: &[u8],
    msg_type: MsgType,
) -> Result<(Flags, u16, TopicFilter<'_>), Error> {
    let body = check_frame(frame, msg_type)?;
    if body.len() < 3 {
        return Err(Error::Malformed);
    }
    let flags = Flags::from_byte(body[0]);
    let msg_id = get_u16(body, 1);
    let rest = &body[3..];
    let filter = match flags.topic_id_type {
        topic::KIND_NORMAL => {
            TopicFilter::Name(core::str::from_utf8(rest).map_err(|_| Error::Malformed)?)
        }
        topic::KIND_PREDEFINED => {
            if rest.len() != 2 {
                return Err(Error::Malformed);
            }
            TopicFilter::Predefined(get_u16(rest, 0))
        }
        topic::KIND_SHORT => {
            if rest.len() != 2 {
                return Err(Error::Malformed);
            }
            TopicFilter::Short([rest[0], rest[1]])
        }
        _ => return Err(Error::InvalidTopicIdType),
    };
    Ok((flags, msg_id, filter))
}

/// A Subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscribe<'a> {
    pub dup: bool,
    pub qos: QoS,
    pub msg_id: u16,
    pub filter: TopicFilter<'a>,
}

impl<'a> Subscribe<'a> {
    pub fn len(&self) -> usize {
        4 + self.filter.encoded_len()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        encode_filter_body(
            buf,
            MsgType::Subscribe,
            self.dup,
            self.qos,
            self.msg_id,
            &self.filter,
        )
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let (flags, msg_id, filter) = decode_filter_body(frame, MsgType::Subscribe)?;
        Ok(Self {
            dup: flags.dup,
            qos: flags.qos(),
            msg_id,
            filter,
        })
    }
}

/// A SubAck reply.
///
/// `topic_id` 0 is the wildcard sentinel: the filter contained a wildcard,
/// so ids will arrive later through Register messages from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAck {
    pub granted_qos: QoS,
    pub topic_id: u16,
    pub msg_id: u16,
    pub code: ReturnCode,
}

impl SubAck {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = start_frame(buf, 7, MsgType::SubAck)?;
        buf[at] = Flags {
            qos_bits: self.granted_qos.wire_bits(),
            ..Flags::default()
        }
        .byte();
        put_u16(buf, at + 1, self.topic_id);
        put_u16(buf, at + 3, self.msg_id);
        buf[at + 5] = self.code as u8;
        Ok(frame_len(7))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::SubAck)?;
        if body.len() != 6 {
            return Err(Error::Malformed);
        }
        Ok(Self {
            granted_qos: Flags::from_byte(body[0]).qos(),
            topic_id: get_u16(body, 1),
            msg_id: get_u16(body, 3),
            code: ReturnCode::from_byte(body[5])?,
        })
    }
}

/// An Unsubscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsubscribe<'a> {
    pub msg_id: u16,
    pub filter: TopicFilter<'a>,
}

impl<'a> Unsubscribe<'a> {
    pub fn len(&self) -> usize {
        4 + self.filter.encoded_len()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        encode_filter_body(
            buf,
            MsgType::Unsubscribe,
            false,
            QoS::AtMostOnce,
            self.msg_id,
            &self.filter,
        )
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let (_, msg_id, filter) = decode_filter_body(frame, MsgType::Unsubscribe)?;
        Ok(Self { msg_id, filter })
    }
}

/// An UnsubAck reply, correlated by message id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubAck {
    pub msg_id: u16,
}

impl UnsubAck {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = start_frame(buf, 3, MsgType::UnsubAck)?;
        put_u16(buf, at, self.msg_id);
        Ok(frame_len(3))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::UnsubAck)?;
        if body.len() != 2 {
            return Err(Error::Malformed);
        }
        Ok(Self {
            msg_id: get_u16(body, 0),
        })
    }
}
