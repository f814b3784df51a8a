//! Register and RegAck messages

use crate::error::Error;
use crate::packet::{MsgType, ReturnCode, check_frame, frame_len, get_u16, put_u16, start_frame};

/// A Register message binding a topic name to a numeric id.
///
/// Sent by the client with `topic_id` 0 to request an id for a topic it
/// wants to publish to; sent by the gateway with a real id to push a binding
/// at the client (after a wildcard subscription resolves, or on reconnect
/// without a clean session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register<'a> {
    pub topic_id: u16,
    pub msg_id: u16,
    pub topic_name: &'a str,
}

impl<'a> Register<'a> {
    pub fn len(&self) -> usize {
        5 + self.topic_name.len()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = self.len();
        let at = start_frame(buf, body, MsgType::Register)?;
        put_u16(buf, at, self.topic_id);
        put_u16(buf, at + 2, self.msg_id);
        buf[at + 4..at + 4 + self.topic_name.len()].copy_from_slice(self.topic_name.as_bytes());
        Ok(frame_len(body))
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::Register)?;
        if body.len() < 4 {
            return Err(Error::Malformed);
        }
        let topic_name = core::str::from_utf8(&body[4..]).map_err(|_| Error::Malformed)?;
        Ok(Self {
            topic_id: get_u16(body, 0),
            msg_id: get_u16(body, 2),
            topic_name,
        })
    }
}

/// A RegAck message answering a Register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegAck {
    pub topic_id: u16,
    pub msg_id: u16,
    pub code: ReturnCode,
}

impl RegAck {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = start_frame(buf, 6, MsgType::RegAck)?;
        put_u16(buf, at, self.topic_id);
        put_u16(buf, at + 2, self.msg_id);
        buf[at + 4] = self.code as u8;
        Ok(frame_len(6))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::RegAck)?;
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
