//! The will handshake and will update messages
//!
//! When a client connects with the will flag set, the gateway prompts it for
//! the will data instead of acknowledging directly: WillTopicReq asks for the
//! topic, WillMsgReq asks for the message, and only then does ConnAck arrive.
//! The Upd/Resp pairs let a connected client replace either half later.

use crate::error::Error;
use crate::packet::{Flags, MsgType, QoS, ReturnCode, check_frame, frame_len, start_frame};

/// WillTopicReq: the gateway requesting the will topic during connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillTopicReq;

/// WillMsgReq: the gateway requesting the will message during connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillMsgReq;

macro_rules! empty_body_msg {
    ($name:ident, $msg_type:expr) => {
        impl $name {
            pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                start_frame(buf, 1, $msg_type)?;
                Ok(frame_len(1))
            }

            pub fn decode(frame: &[u8]) -> Result<Self, Error> {
                let body = check_frame(frame, $msg_type)?;
                if !body.is_empty() {
                    return Err(Error::Malformed);
                }
                Ok(Self)
            }
        }
    };
}

empty_body_msg!(WillTopicReq, MsgType::WillTopicReq);
empty_body_msg!(WillMsgReq, MsgType::WillMsgReq);

/// A WillTopic message, the client's answer to WillTopicReq.
///
/// An empty topic is the protocol's way to delete a stored will; it encodes
/// as a two byte frame without even a flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillTopic<'a> {
    pub qos: QoS,
    pub retain: bool,
    pub topic: &'a str,
}

/// A WillTopicUpd message, replacing the will topic mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillTopicUpd<'a> {
    pub qos: QoS,
    pub retain: bool,
    pub topic: &'a str,
}

fn will_topic_len(topic: &str) -> usize {
    if topic.is_empty() { 1 } else { 2 + topic.len() }
}

fn encode_will_topic(
    buf: &mut [u8],
    msg_type: MsgType,
    qos: QoS,
    retain: bool,
    topic: &str,
) -> Result<usize, Error> {
    if qos == QoS::Connectionless {
        return Err(Error::InvalidQos);
    }
    let body = will_topic_len(topic);
    let at = start_frame(buf, body, msg_type)?;
    if !topic.is_empty() {
        buf[at] = Flags {
            qos_bits: qos.wire_bits(),
            retain,
            ..Flags::default()
        }
        .byte();
        buf[at + 1..at + 1 + topic.len()].copy_from_slice(topic.as_bytes());
    }
    Ok(frame_len(body))
}

fn decode_will_topic(frame: &[u8], msg_type: MsgType) -> Result<(QoS, bool, &str), Error> {
    let body = check_frame(frame, msg_type)?;
    if body.is_empty() {
        return Ok((QoS::AtMostOnce, false, ""));
    }
    let flags = Flags::from_byte(body[0]);
    if flags.qos() == QoS::Connectionless {
        return Err(Error::InvalidQos);
    }
    let topic = core::str::from_utf8(&body[1..]).map_err(|_| Error::Malformed)?;
    Ok((flags.qos(), flags.retain, topic))
}

impl<'a> WillTopic<'a> {
    pub fn len(&self) -> usize {
        will_topic_len(self.topic)
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        encode_will_topic(buf, MsgType::WillTopic, self.qos, self.retain, self.topic)
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let (qos, retain, topic) = decode_will_topic(frame, MsgType::WillTopic)?;
        Ok(Self { qos, retain, topic })
    }
}

impl<'a> WillTopicUpd<'a> {
    pub fn len(&self) -> usize {
        will_topic_len(self.topic)
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        encode_will_topic(buf, MsgType::WillTopicUpd, self.qos, self.retain, self.topic)
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let (qos, retain, topic) = decode_will_topic(frame, MsgType::WillTopicUpd)?;
        Ok(Self { qos, retain, topic })
    }
}

/// A WillMsg message, the client's answer to WillMsgReq.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillMsg<'a> {
    pub message: &'a [u8],
}

/// A WillMsgUpd message, replacing the will message mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillMsgUpd<'a> {
    pub message: &'a [u8],
}

macro_rules! will_msg_body {
    ($name:ident, $msg_type:expr) => {
        impl<'a> $name<'a> {
            pub fn len(&self) -> usize {
                1 + self.message.len()
            }

            pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                let body = self.len();
                let at = start_frame(buf, body, $msg_type)?;
                buf[at..at + self.message.len()].copy_from_slice(self.message);
                Ok(frame_len(body))
            }

            pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
                let body = check_frame(frame, $msg_type)?;
                Ok(Self { message: body })
            }
        }
    };
}

will_msg_body!(WillMsg, MsgType::WillMsg);
will_msg_body!(WillMsgUpd, MsgType::WillMsgUpd);

/// WillTopicResp: the gateway's verdict on a WillTopicUpd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillTopicResp {
    pub code: ReturnCode,
}

/// WillMsgResp: the gateway's verdict on a WillMsgUpd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillMsgResp {
    pub code: ReturnCode,
}

macro_rules! will_resp_msg {
    ($name:ident, $msg_type:expr) => {
        impl $name {
            pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
                let at = start_frame(buf, 2, $msg_type)?;
                buf[at] = self.code as u8;
                Ok(frame_len(2))
            }

            pub fn decode(frame: &[u8]) -> Result<Self, Error> {
                let body = check_frame(frame, $msg_type)?;
                if body.len() != 1 {
                    return Err(Error::Malformed);
                }
                Ok(Self {
                    code: ReturnCode::from_byte(body[0])?,
                })
            }
        }
    };
}

will_resp_msg!(WillTopicResp, MsgType::WillTopicResp);
will_resp_msg!(WillMsgResp, MsgType::WillMsgResp);
