//! The MQTT-SN message sequencer
//!
//! [`Client`] drives one protocol exchange at a time over a datagram
//! transport: it sizes and encodes the request, sends it, and for
//! request/response exchanges waits one bounded reply window, decodes the
//! reply and validates its correlation fields before touching any session
//! state. The protocol is strictly half-duplex per exchange; there is never
//! more than one outstanding request.
//!
//! The sequencer performs no retries and no logging. Retry policy and
//! timers belong to the [`machine`](crate::machine) module driving it, and
//! every failure comes back as a typed [`Error`] so the driver can classify
//! it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use libmqttsn::client::{Client, ConnectStage, Options};
//! use libmqttsn::packet::QoS;
//! use libmqttsn::topic::TopicId;
//! # struct LoopbackTransport;
//! # impl libmqttsn::transport::DatagramTransport for LoopbackTransport {
//! #     type Error = ();
//! #     fn send(&mut self, _frame: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn poll_receive(&mut self, _buf: &mut [u8], _timeout_ms: u32)
//! #     -> Result<Option<usize>, Self::Error> { Ok(None) }
//! # }
//!
//! let transport = LoopbackTransport;
//! let mut client: Client<_> = Client::new(transport, Options::new("sensor_7")).unwrap();
//!
//! // client.connect(false)?;
//! // let topic_id = client.register("sensors/temperature")?;
//! // client.publish(TopicId::Normal(topic_id), QoS::AtLeastOnce, false, b"23.5")?;
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

use crate::error::Error;
use crate::packet::{
    self, MAX_FRAME_LEN, MAX_PAYLOAD_LEN, MsgType, QoS, ReturnCode,
    connect::{ConnAck, Connect, Disconnect},
    ping::{PingReq, PingResp},
    publish::{PubAck, PubComp, PubRec, PubRel, Publish},
    register::{RegAck, Register},
    subscribe::{SubAck, Subscribe, UnsubAck, Unsubscribe},
    will::{WillMsg, WillMsgReq, WillMsgResp, WillMsgUpd, WillTopic, WillTopicReq, WillTopicUpd,
        WillTopicResp},
};
use crate::session::{MAX_TOPICS, Session, Subscription};
use crate::topic::{TopicFilter, TopicId};
use crate::transport::{Close, DatagramTransport};
use heapless::{String, Vec};

/// Longest client identifier the protocol permits, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 23;

/// Default reply window for request/response exchanges, in milliseconds.
///
/// Long enough for a gateway on the local segment to answer, short enough
/// that the driving loop can still service its timers.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 400;

/// Configuration options for an MQTT-SN client.
///
/// # Examples
///
/// ```rust
/// use libmqttsn::client::Options;
///
/// let options = Options {
///     keep_alive_seconds: 30,
///     ..Options::new("weather_station")
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier. Must be 1 to 23 bytes.
    pub client_id: &'a str,
    /// Keep-alive interval in seconds, carried in the Connect frame.
    pub keep_alive_seconds: u16,
    /// Whether the gateway should discard any previous session state.
    pub clean_session: bool,
    /// Reply window for request/response exchanges, in milliseconds.
    pub response_timeout_ms: u32,
    /// Largest inbound frame accepted before decoding. Frames claiming a
    /// larger length are rejected with `FrameTooLarge`.
    pub max_frame_len: usize,
}

impl<'a> Options<'a> {
    /// Options with protocol-typical defaults for the given client id.
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            keep_alive_seconds: 60,
            clean_session: true,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

/// How far a Connect exchange progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// ConnAck(accepted) arrived; the session is up.
    Connected,
    /// The gateway asked for the will topic. Continue with
    /// [`Client::will_topic`] and [`Client::will_msg`] to finish connecting.
    WillTopicRequested,
}

/// Outcome of a sleeping client's message drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStatus {
    /// The gateway had nothing buffered.
    NoMessages,
    /// At least one buffered Publish was delivered and acknowledged.
    MessagesDelivered,
}

/// A Publish delivered to the application, copied out of the receive
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPublish {
    pub qos: QoS,
    pub retain: bool,
    pub dup: bool,
    /// Resolved numeric topic id; short names compare as their big-endian
    /// byte value.
    pub topic_id: u16,
    pub msg_id: u16,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

/// An inbound message classified for the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A Publish from the gateway.
    Publish(InboundPublish),
    /// The gateway pushing a topic-id binding.
    Register {
        topic_id: u16,
        msg_id: u16,
    },
    /// Release step of an inbound QoS 2 publish.
    PubRel {
        msg_id: u16,
    },
    /// The gateway probing the client.
    PingReq,
    PingResp,
    /// The gateway ending or acknowledging the end of the session.
    Disconnect {
        duration: Option<u16>,
    },
    /// Anything else, surfaced by type for the driver to log.
    Other(MsgType),
}

/// An MQTT-SN client bound to one transport and one gateway.
///
/// `N` bounds the session's topic-id lists; the default matches the classic
/// ten-topic client profile.
pub struct Client<T: DatagramTransport, const N: usize = MAX_TOPICS> {
    transport: T,
    session: Session<N>,
    client_id: String<MAX_CLIENT_ID_LEN>,
    keep_alive_seconds: u16,
    clean_session: bool,
    response_timeout_ms: u32,
    max_frame_len: usize,
    next_msg_id: u16,
    last_msg_id: u16,
    tx: [u8; MAX_FRAME_LEN],
    rx: [u8; MAX_FRAME_LEN],
}

impl<T: DatagramTransport, const N: usize> Client<T, N> {
    /// Create a client over an open transport.
    ///
    /// Fails with `InvalidClientId` when the id is empty or longer than the
    /// 23 bytes the protocol allows.
    pub fn new(transport: T, options: Options<'_>) -> Result<Self, Error> {
        if options.client_id.is_empty() || options.client_id.len() > MAX_CLIENT_ID_LEN {
            return Err(Error::InvalidClientId);
        }
        let client_id =
            String::try_from(options.client_id).map_err(|_| Error::InvalidClientId)?;
        Ok(Self {
            transport,
            session: Session::new(),
            client_id,
            keep_alive_seconds: options.keep_alive_seconds,
            clean_session: options.clean_session,
            response_timeout_ms: options.response_timeout_ms,
            max_frame_len: options.max_frame_len.min(MAX_FRAME_LEN),
            next_msg_id: 1,
            last_msg_id: 0,
            tx: [0; MAX_FRAME_LEN],
            rx: [0; MAX_FRAME_LEN],
        })
    }

    /// The session bookkeeping accumulated over this connection.
    pub fn session(&self) -> &Session<N> {
        &self.session
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport, for platform-specific
    /// tuning.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The message id used by the most recent acknowledged-mode request.
    pub fn last_msg_id(&self) -> u16 {
        self.last_msg_id
    }

    /// The keep-alive interval this client connects with, in seconds.
    pub fn keep_alive_seconds(&self) -> u16 {
        self.keep_alive_seconds
    }

    fn alloc_msg_id(&mut self) -> u16 {
        let id = self.next_msg_id;
        // Message id 0 is reserved for QoS 0 publishes.
        self.next_msg_id = match self.next_msg_id.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        self.last_msg_id = id;
        id
    }

    fn send_frame(&mut self, len: usize) -> Result<(), Error> {
        self.transport
            .send(&self.tx[..len])
            .map_err(|_| Error::SendFailed)
    }

    fn receive(&mut self) -> Result<Option<usize>, Error> {
        self.transport
            .poll_receive(&mut self.rx, self.response_timeout_ms)
            .map_err(|_| Error::ReceiveFailed)
    }

    fn expect_frame(&mut self) -> Result<usize, Error> {
        self.receive()?.ok_or(Error::NoServerResponse)
    }

    fn peek(&self, len: usize) -> Result<MsgType, Error> {
        packet::peek_msg_type(&self.rx[..len], self.max_frame_len)
    }

    // --- connection establishment -------------------------------------

    /// Send a Connect and wait for the gateway's answer.
    ///
    /// Without a will this completes on ConnAck(accepted). With `will` set
    /// the gateway answers WillTopicReq instead, which is reported as
    /// [`ConnectStage::WillTopicRequested`] — a normal continuation, not a
    /// failure. Chain [`will_topic`](Self::will_topic) and
    /// [`will_msg`](Self::will_msg) to reach the connected state.
    pub fn connect(&mut self, will: bool) -> Result<ConnectStage, Error> {
        let msg = Connect {
            will,
            clean_session: self.clean_session,
            duration: self.keep_alive_seconds,
            client_id: self.client_id.as_str(),
        };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        let n = self.expect_frame()?;
        if will {
            match self.peek(n)? {
                MsgType::WillTopicReq => {
                    WillTopicReq::decode(&self.rx[..n])?;
                    return Ok(ConnectStage::WillTopicRequested);
                }
                _ => return Err(Error::WrongMessageType),
            }
        }
        self.read_connack(n)
    }

    fn read_connack(&mut self, len: usize) -> Result<ConnectStage, Error> {
        if self.peek(len)? != MsgType::ConnAck {
            return Err(Error::WrongMessageType);
        }
        let ack = ConnAck::decode(&self.rx[..len])?;
        match ack.code {
            ReturnCode::Accepted => Ok(ConnectStage::Connected),
            code => Err(Error::Rejected(code)),
        }
    }

    /// Answer a WillTopicReq, then wait for the WillMsgReq that follows.
    pub fn will_topic(&mut self, qos: QoS, retain: bool, topic: &str) -> Result<(), Error> {
        let n = WillTopic { qos, retain, topic }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::WillMsgReq {
            return Err(Error::WrongMessageType);
        }
        WillMsgReq::decode(&self.rx[..n])?;
        Ok(())
    }

    /// Answer a WillMsgReq, then wait for the ConnAck that completes the
    /// will handshake.
    pub fn will_msg(&mut self, message: &[u8]) -> Result<(), Error> {
        let n = WillMsg { message }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = self.expect_frame()?;
        self.read_connack(n).map(|_| ())
    }

    /// Replace the stored will topic mid-session.
    pub fn will_topic_update(
        &mut self,
        qos: QoS,
        retain: bool,
        topic: &str,
    ) -> Result<(), Error> {
        let n = WillTopicUpd { qos, retain, topic }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::WillTopicResp {
            return Err(Error::WrongMessageType);
        }
        match WillTopicResp::decode(&self.rx[..n])?.code {
            ReturnCode::Accepted => Ok(()),
            code => Err(Error::Rejected(code)),
        }
    }

    /// Replace the stored will message mid-session.
    pub fn will_msg_update(&mut self, message: &[u8]) -> Result<(), Error> {
        let n = WillMsgUpd { message }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::WillMsgResp {
            return Err(Error::WrongMessageType);
        }
        match WillMsgResp::decode(&self.rx[..n])?.code {
            ReturnCode::Accepted => Ok(()),
            code => Err(Error::Rejected(code)),
        }
    }

    // --- topic management ---------------------------------------------

    /// Register a topic name for publishing and record the granted id.
    ///
    /// The capacity of the publish-id list is checked before anything is
    /// sent, so a full session never costs a network round trip.
    pub fn register(&mut self, topic_name: &str) -> Result<u16, Error> {
        if self.session.publish_capacity_left() == 0 {
            return Err(Error::CapacityExceeded);
        }
        let msg_id = self.alloc_msg_id();
        let msg = Register {
            topic_id: 0,
            msg_id,
            topic_name,
        };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::RegAck {
            return Err(Error::WrongMessageType);
        }
        let ack = RegAck::decode(&self.rx[..n])?;
        if ack.code != ReturnCode::Accepted {
            return Err(Error::Rejected(ack.code));
        }
        if ack.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        self.session.record_publish_topic(ack.topic_id)?;
        Ok(ack.topic_id)
    }

    /// Subscribe to a topic filter and record the granted id.
    ///
    /// A SubAck carrying topic id 0 means the filter contained a wildcard;
    /// concrete ids will arrive later through Register messages from the
    /// gateway.
    pub fn subscribe(
        &mut self,
        filter: TopicFilter<'_>,
        qos: QoS,
    ) -> Result<Subscription, Error> {
        if qos == QoS::Connectionless {
            return Err(Error::InvalidQos);
        }
        let msg_id = self.alloc_msg_id();
        let msg = Subscribe {
            dup: false,
            qos,
            msg_id,
            filter,
        };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::SubAck {
            return Err(Error::WrongMessageType);
        }
        let ack = SubAck::decode(&self.rx[..n])?;
        if ack.code != ReturnCode::Accepted {
            return Err(Error::Rejected(ack.code));
        }
        if ack.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        if ack.granted_qos != qos {
            return Err(Error::QosMismatch);
        }
        self.session.record_subscription(ack.topic_id)
    }

    /// Unsubscribe from a topic filter.
    pub fn unsubscribe(&mut self, filter: TopicFilter<'_>) -> Result<(), Error> {
        let msg_id = self.alloc_msg_id();
        let msg = Unsubscribe { msg_id, filter };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::UnsubAck {
            return Err(Error::WrongMessageType);
        }
        let ack = UnsubAck::decode(&self.rx[..n])?;
        if ack.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        Ok(())
    }

    // --- publishing ---------------------------------------------------

    /// Publish a payload, running the acknowledgement exchange the QoS
    /// demands.
    ///
    /// - QoS 0 and "-1" send one frame and return; the message id is 0.
    /// - QoS 1 waits for a PubAck and verifies its return code, message id
    ///   and topic id, each mismatch reported distinctly.
    /// - QoS 2 runs Publish → PubRec → PubRel → PubComp. A missing PubRec
    ///   comes back as [`Error::NoPubRec`] (retransmit the Publish), a
    ///   missing PubComp as [`Error::NoPubComp`] (retransmit the PubRel via
    ///   [`pub_rel_exchange`](Self::pub_rel_exchange)).
    pub fn publish(
        &mut self,
        topic: TopicId<'_>,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<(), Error> {
        self.publish_dup(topic, qos, retain, payload, false)
    }

    /// [`publish`](Self::publish) with control over the dup flag, for
    /// retransmissions.
    pub fn publish_dup(
        &mut self,
        topic: TopicId<'_>,
        qos: QoS,
        retain: bool,
        payload: &[u8],
        dup: bool,
    ) -> Result<(), Error> {
        let msg_id = match qos {
            QoS::AtMostOnce | QoS::Connectionless => 0,
            QoS::AtLeastOnce | QoS::ExactlyOnce => {
                if dup {
                    self.last_msg_id
                } else {
                    self.alloc_msg_id()
                }
            }
        };
        let msg = Publish {
            dup,
            retain,
            qos,
            topic,
            msg_id,
            payload,
        };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        match qos {
            QoS::AtMostOnce | QoS::Connectionless => Ok(()),
            QoS::AtLeastOnce => self.await_pub_ack(msg_id, topic.numeric()),
            QoS::ExactlyOnce => {
                self.await_pub_rec(msg_id)?;
                self.pub_rel_exchange(msg_id)
            }
        }
    }

    fn await_pub_ack(&mut self, msg_id: u16, topic_id: Option<u16>) -> Result<(), Error> {
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::PubAck {
            return Err(Error::WrongMessageType);
        }
        let ack = PubAck::decode(&self.rx[..n])?;
        if ack.code != ReturnCode::Accepted {
            return Err(Error::Rejected(ack.code));
        }
        if ack.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        if let Some(expected) = topic_id {
            if ack.topic_id != expected {
                return Err(Error::TopicIdMismatch);
            }
        }
        Ok(())
    }

    fn await_pub_rec(&mut self, msg_id: u16) -> Result<(), Error> {
        let n = match self.receive()? {
            Some(n) => n,
            None => return Err(Error::NoPubRec),
        };
        if self.peek(n)? != MsgType::PubRec {
            return Err(Error::NoPubRec);
        }
        let rec = PubRec::decode(&self.rx[..n])?;
        if rec.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        Ok(())
    }

    /// Send a PubRel and wait for the matching PubComp.
    ///
    /// This is the resumption point after [`Error::NoPubComp`]: the PubRel,
    /// not the original Publish, is what gets retransmitted once the
    /// exchange has progressed past PubRec.
    pub fn pub_rel_exchange(&mut self, msg_id: u16) -> Result<(), Error> {
        let n = PubRel { msg_id }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = match self.receive()? {
            Some(n) => n,
            None => return Err(Error::NoPubComp),
        };
        if self.peek(n)? != MsgType::PubComp {
            return Err(Error::NoPubComp);
        }
        let comp = PubComp::decode(&self.rx[..n])?;
        if comp.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        Ok(())
    }

    // --- keep-alive and sleep -----------------------------------------

    /// Send a keep-alive PingReq without waiting for the response.
    pub fn send_ping(&mut self) -> Result<(), Error> {
        let n = PingReq { client_id: "" }.encode(&mut self.tx)?;
        self.send_frame(n)
    }

    /// Wait one reply window for a PingResp.
    pub fn await_ping_resp(&mut self) -> Result<(), Error> {
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::PingResp {
            return Err(Error::WrongMessageType);
        }
        PingResp::decode(&self.rx[..n])?;
        Ok(())
    }

    /// A complete keep-alive exchange.
    pub fn ping(&mut self) -> Result<(), Error> {
        self.send_ping()?;
        self.await_ping_resp()
    }

    /// Wake from sleep long enough to drain buffered messages.
    ///
    /// Sends a PingReq carrying the client id, which tells the gateway a
    /// sleeping client is polling. Every buffered Publish is classified and
    /// acknowledged according to its QoS exactly as when connected, and
    /// handed to `on_publish`; a Publish for a topic the session is not
    /// subscribed to is rejected with PubAck(InvalidTopicId). The drain
    /// ends when the gateway sends PingResp.
    pub fn sleep_poll<F>(&mut self, mut on_publish: F) -> Result<SleepStatus, Error>
    where
        F: FnMut(InboundPublish),
    {
        let msg = PingReq {
            client_id: self.client_id.as_str(),
        };
        let n = msg.encode(&mut self.tx)?;
        self.send_frame(n)?;

        let mut delivered = false;
        loop {
            let n = self.expect_frame()?;
            match self.peek(n)? {
                MsgType::Publish => {
                    let publish = self.decode_inbound_publish(n)?;
                    if self.session.is_subscribed_to(publish.topic_id) {
                        match publish.qos {
                            QoS::AtLeastOnce => self.pub_ack(
                                publish.topic_id,
                                publish.msg_id,
                                ReturnCode::Accepted,
                            )?,
                            QoS::ExactlyOnce => {
                                self.pub_rec(publish.msg_id)?;
                                self.await_pub_rel_then_comp(publish.msg_id)?;
                            }
                            QoS::AtMostOnce | QoS::Connectionless => {}
                        }
                        delivered = true;
                        on_publish(publish);
                    } else {
                        self.pub_ack(
                            publish.topic_id,
                            publish.msg_id,
                            ReturnCode::RejectedInvalidTopicId,
                        )?;
                    }
                }
                MsgType::PingResp => {
                    return Ok(if delivered {
                        SleepStatus::MessagesDelivered
                    } else {
                        SleepStatus::NoMessages
                    });
                }
                _ => return Err(Error::WrongMessageType),
            }
        }
    }

    fn await_pub_rel_then_comp(&mut self, msg_id: u16) -> Result<(), Error> {
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::PubRel {
            return Err(Error::WrongMessageType);
        }
        let rel = PubRel::decode(&self.rx[..n])?;
        if rel.msg_id != msg_id {
            return Err(Error::MsgIdMismatch);
        }
        self.pub_comp(msg_id)
    }

    // --- disconnect ---------------------------------------------------

    /// End the session, or enter sleep when a duration is given, and wait
    /// for the gateway's confirming Disconnect.
    pub fn disconnect(&mut self, duration: Option<u16>) -> Result<(), Error> {
        let n = Disconnect { duration }.encode(&mut self.tx)?;
        self.send_frame(n)?;
        let n = self.expect_frame()?;
        if self.peek(n)? != MsgType::Disconnect {
            return Err(Error::WrongMessageType);
        }
        Disconnect::decode(&self.rx[..n])?;
        Ok(())
    }

    // --- inbound classification ---------------------------------------

    /// Poll one reply window for any inbound message and classify it.
    ///
    /// Returns `Ok(None)` when the window elapsed quietly. This is the
    /// state machine's inbound tap while connected; the exchange methods
    /// above consume their own replies.
    pub fn poll_inbound(&mut self) -> Result<Option<Inbound>, Error> {
        let Some(n) = self.receive()? else {
            return Ok(None);
        };
        let inbound = match self.peek(n)? {
            MsgType::Publish => Inbound::Publish(self.decode_inbound_publish(n)?),
            MsgType::Register => {
                let msg = Register::decode(&self.rx[..n])?;
                Inbound::Register {
                    topic_id: msg.topic_id,
                    msg_id: msg.msg_id,
                }
            }
            MsgType::PubRel => Inbound::PubRel {
                msg_id: PubRel::decode(&self.rx[..n])?.msg_id,
            },
            MsgType::PingReq => {
                PingReq::decode(&self.rx[..n])?;
                Inbound::PingReq
            }
            MsgType::PingResp => {
                PingResp::decode(&self.rx[..n])?;
                Inbound::PingResp
            }
            MsgType::Disconnect => Inbound::Disconnect {
                duration: Disconnect::decode(&self.rx[..n])?.duration,
            },
            other => Inbound::Other(other),
        };
        Ok(Some(inbound))
    }

    fn decode_inbound_publish(&self, len: usize) -> Result<InboundPublish, Error> {
        let msg = Publish::decode(&self.rx[..len])?;
        let topic_id = msg.topic.numeric().ok_or(Error::InvalidTopicIdType)?;
        let payload =
            Vec::from_slice(msg.payload).map_err(|_| Error::CapacityExceeded)?;
        Ok(InboundPublish {
            qos: msg.qos,
            retain: msg.retain,
            dup: msg.dup,
            topic_id,
            msg_id: msg.msg_id,
            payload,
        })
    }

    /// Handle an inbound Register pushed by the gateway.
    ///
    /// A binding for a topic the session already subscribes to is
    /// acknowledged; with an active wildcard subscription the id becomes
    /// the bound wildcard id; anything else is rejected with
    /// RegAck(InvalidTopicId). Returns whether the binding was accepted.
    pub fn handle_register(&mut self, topic_id: u16, msg_id: u16) -> Result<bool, Error> {
        if self.session.is_subscribed_to(topic_id) {
            self.reg_ack(topic_id, msg_id, ReturnCode::Accepted)?;
            Ok(true)
        } else if self.session.has_wildcard() {
            self.reg_ack(topic_id, msg_id, ReturnCode::Accepted)?;
            self.session.bind_wildcard(topic_id);
            Ok(true)
        } else {
            self.reg_ack(topic_id, msg_id, ReturnCode::RejectedInvalidTopicId)?;
            Ok(false)
        }
    }

    // --- acknowledgement senders --------------------------------------

    /// Send a PubAck for an inbound Publish.
    pub fn pub_ack(
        &mut self,
        topic_id: u16,
        msg_id: u16,
        code: ReturnCode,
    ) -> Result<(), Error> {
        let n = PubAck {
            topic_id,
            msg_id,
            code,
        }
        .encode(&mut self.tx)?;
        self.send_frame(n)
    }

    /// Send a PubRec for an inbound QoS 2 Publish.
    pub fn pub_rec(&mut self, msg_id: u16) -> Result<(), Error> {
        let n = PubRec { msg_id }.encode(&mut self.tx)?;
        self.send_frame(n)
    }

    /// Send a PubComp answering an inbound PubRel.
    pub fn pub_comp(&mut self, msg_id: u16) -> Result<(), Error> {
        let n = PubComp { msg_id }.encode(&mut self.tx)?;
        self.send_frame(n)
    }

    /// Send a RegAck answering an inbound Register.
    pub fn reg_ack(
        &mut self,
        topic_id: u16,
        msg_id: u16,
        code: ReturnCode,
    ) -> Result<(), Error> {
        let n = RegAck {
            topic_id,
            msg_id,
            code,
        }
        .encode(&mut self.tx)?;
        self.send_frame(n)
    }

    /// Send a PingResp answering an inbound PingReq.
    pub fn ping_resp(&mut self) -> Result<(), Error> {
        let n = PingResp.encode(&mut self.tx)?;
        self.send_frame(n)
    }
}

impl<T: DatagramTransport + Close, const N: usize> Client<T, N> {
    /// Release the transport. Closing is idempotent at the transport's
    /// discretion.
    pub fn close(self) -> Result<(), <T as Close>::Error> {
        self.transport.close()
    }
}
