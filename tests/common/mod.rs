#![allow(dead_code)]

use std::collections::VecDeque;

use libmqttsn::packet::ReturnCode;
use libmqttsn::packet::connect::{ConnAck, Disconnect};
use libmqttsn::packet::ping::{PingReq, PingResp};
use libmqttsn::packet::publish::{PubAck, PubComp, PubRec, PubRel, Publish};
use libmqttsn::packet::register::{RegAck, Register};
use libmqttsn::packet::subscribe::{SubAck, UnsubAck};
use libmqttsn::packet::will::{WillMsgReq, WillTopicReq};
use libmqttsn::packet::QoS;
use libmqttsn::topic::TopicId;
use libmqttsn::transport::{Close, DatagramTransport};

/// A transport that records everything sent and plays back a script of
/// canned gateway replies, one per receive window. A `silence` entry makes
/// one window elapse with no data, which is how timeout paths are driven.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub sent: Vec<Vec<u8>>,
    replies: VecDeque<Option<Vec<u8>>>,
    pub closed: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a gateway reply for the next receive window.
    pub fn reply(mut self, frame: &[u8]) -> Self {
        self.replies.push_back(Some(frame.to_vec()));
        self
    }

    /// Queue one empty receive window.
    pub fn silence(mut self) -> Self {
        self.replies.push_back(None);
        self
    }

    pub fn push_reply(&mut self, frame: &[u8]) {
        self.replies.push_back(Some(frame.to_vec()));
    }

    /// Message type byte of each frame sent so far, assuming the one byte
    /// length form.
    pub fn sent_types(&self) -> Vec<u8> {
        self.sent.iter().map(|frame| frame[1]).collect()
    }
}

impl DatagramTransport for ScriptedTransport {
    type Error = ();

    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn poll_receive(
        &mut self,
        buf: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<Option<usize>, Self::Error> {
        match self.replies.pop_front() {
            Some(Some(frame)) => {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(Some(frame.len()))
            }
            Some(None) | None => Ok(None),
        }
    }
}

impl Close for ScriptedTransport {
    type Error = ();

    fn close(mut self) -> Result<(), Self::Error> {
        self.closed = true;
        Ok(())
    }
}

// ---- canned gateway frames -------------------------------------------

fn encoded<F>(encode: F) -> Vec<u8>
where
    F: FnOnce(&mut [u8]) -> Result<usize, libmqttsn::error::Error>,
{
    let mut buf = [0u8; 1600];
    let n = encode(&mut buf).expect("mock frame encodes");
    buf[..n].to_vec()
}

pub fn conn_ack(code: ReturnCode) -> Vec<u8> {
    encoded(|buf| ConnAck { code }.encode(buf))
}

pub fn will_topic_req() -> Vec<u8> {
    encoded(|buf| WillTopicReq.encode(buf))
}

pub fn will_msg_req() -> Vec<u8> {
    encoded(|buf| WillMsgReq.encode(buf))
}

pub fn reg_ack(topic_id: u16, msg_id: u16, code: ReturnCode) -> Vec<u8> {
    encoded(|buf| {
        RegAck {
            topic_id,
            msg_id,
            code,
        }
        .encode(buf)
    })
}

pub fn register_push(topic_id: u16, msg_id: u16, topic_name: &str) -> Vec<u8> {
    encoded(|buf| {
        Register {
            topic_id,
            msg_id,
            topic_name,
        }
        .encode(buf)
    })
}

pub fn sub_ack(granted_qos: QoS, topic_id: u16, msg_id: u16, code: ReturnCode) -> Vec<u8> {
    encoded(|buf| {
        SubAck {
            granted_qos,
            topic_id,
            msg_id,
            code,
        }
        .encode(buf)
    })
}

pub fn unsub_ack(msg_id: u16) -> Vec<u8> {
    encoded(|buf| UnsubAck { msg_id }.encode(buf))
}

pub fn pub_ack(topic_id: u16, msg_id: u16, code: ReturnCode) -> Vec<u8> {
    encoded(|buf| {
        PubAck {
            topic_id,
            msg_id,
            code,
        }
        .encode(buf)
    })
}

pub fn pub_rec(msg_id: u16) -> Vec<u8> {
    encoded(|buf| PubRec { msg_id }.encode(buf))
}

pub fn pub_rel(msg_id: u16) -> Vec<u8> {
    encoded(|buf| PubRel { msg_id }.encode(buf))
}

pub fn pub_comp(msg_id: u16) -> Vec<u8> {
    encoded(|buf| PubComp { msg_id }.encode(buf))
}

pub fn inbound_publish(qos: QoS, topic_id: u16, msg_id: u16, payload: &[u8]) -> Vec<u8> {
    encoded(|buf| {
        Publish {
            dup: false,
            retain: false,
            qos,
            topic: TopicId::Normal(topic_id),
            msg_id,
            payload,
        }
        .encode(buf)
    })
}

pub fn ping_req(client_id: &str) -> Vec<u8> {
    encoded(|buf| PingReq { client_id }.encode(buf))
}

pub fn ping_resp() -> Vec<u8> {
    encoded(|buf| PingResp.encode(buf))
}

pub fn disconnect(duration: Option<u16>) -> Vec<u8> {
    encoded(|buf| Disconnect { duration }.encode(buf))
}
