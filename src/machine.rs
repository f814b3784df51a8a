//! The client connection state machine
//!
//! [`Machine`] is the top-level driver: an explicit finite state machine
//! that owns a [`Client`] and decides, one run-to-completion step at a time,
//! what the connection does next. It reacts to inbound message
//! classification and to timers the caller feeds in as a monotonic
//! millisecond clock, and it owns every retry decision the sequencer
//! deliberately does not make.
//!
//! This is also the only module that logs. Transitions are logged at debug
//! level and anomalies at warn, so the protocol layers below stay silent
//! and pure.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use crate::client::{Client, ConnectStage, Inbound, InboundPublish};
use crate::error::Error;
use crate::packet::{QoS, ReturnCode};
use crate::session::MAX_TOPICS;
use crate::topic::{TopicFilter, TopicId};
use crate::transport::DatagramTransport;

/// The states of the client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Connect sent, awaiting ConnAck or WillTopicReq.
    Connecting,
    /// WillTopic sent, awaiting WillMsgReq.
    WillTopicReq,
    /// WillMsg sent, awaiting the final ConnAck.
    WillMsgReq,
    /// The hub: servicing commands, timers and inbound traffic.
    Connected,
    /// Register sent, awaiting RegAck.
    Registering,
    /// Subscribe sent, awaiting SubAck.
    Subscribing,
    /// Unsubscribe sent, awaiting UnsubAck.
    Unsubscribing,
    /// A publish exchange is in flight.
    Publishing,
    /// Acknowledging an inbound QoS 1 publish.
    ReceivingQos1,
    /// PubRec sent for an inbound QoS 2 publish, awaiting PubRel.
    ReceivingQos2,
    /// Disconnected with a duration; the gateway buffers messages.
    Sleeping,
    /// PingReq sent, awaiting PingResp.
    ClientPing,
    /// Answering a PingReq from the gateway.
    ServerPing,
    /// Disconnect sent, awaiting the gateway's confirmation.
    Disconnecting,
    /// Terminal: the transport can be released.
    Disconnected,
}

/// What to do when the ping retry budget is exhausted.
///
/// The protocol does not pin this down and deployed stacks disagree, so it
/// is a configuration choice rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingPolicy {
    /// Give up on this ping cycle, reset the keep-alive timer and return to
    /// Connected. The gateway may still consider the client alive.
    Lenient,
    /// Treat the gateway as gone: send a best-effort Disconnect and stop.
    Fatal,
}

/// Tunable policy for the state machine.
#[derive(Debug, Clone, Copy)]
pub struct MachineConfig {
    /// How many times an unanswered exchange is retried before giving up.
    pub retry_limit: u8,
    /// Seconds subtracted from the keep-alive interval when scheduling
    /// pings, so the ping lands before the gateway's deadline.
    pub keep_alive_margin_s: u16,
    /// Seconds subtracted from the sleep duration when scheduling the
    /// wake-up poll.
    pub sleep_margin_s: u16,
    /// Behavior when ping retries are exhausted.
    pub ping_policy: PingPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            keep_alive_margin_s: 5,
            sleep_margin_s: 5,
            ping_policy: PingPolicy::Lenient,
        }
    }
}

/// The will data announced during connection establishment.
#[derive(Debug, Clone, Copy)]
pub struct WillConfig<'a> {
    pub topic: &'a str,
    pub message: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Work the application hands to the machine while connected.
#[derive(Debug, Clone, Copy)]
pub enum Command<'a> {
    /// Register a topic name for publishing.
    Register { topic_name: &'a str },
    /// Subscribe to a topic filter.
    Subscribe { filter: TopicFilter<'a>, qos: QoS },
    /// Unsubscribe from a topic filter.
    Unsubscribe { filter: TopicFilter<'a> },
    /// Publish a payload at the given QoS.
    Publish {
        topic: TopicId<'a>,
        qos: QoS,
        retain: bool,
        payload: &'a [u8],
    },
    /// Replace the stored will topic.
    UpdateWillTopic {
        qos: QoS,
        retain: bool,
        topic: &'a str,
    },
    /// Replace the stored will message.
    UpdateWillMsg { message: &'a [u8] },
    /// Disconnect with a duration and start the sleep/wake cycle.
    Sleep { duration_s: u16 },
    /// End the session for good.
    Disconnect,
}

/// The state machine driving one MQTT-SN client.
pub struct Machine<T: DatagramTransport, const N: usize = MAX_TOPICS> {
    client: Client<T, N>,
    config: MachineConfig,
    state: State,
    retries: u8,
    last_ping_ms: u64,
    sleep_duration_s: u16,
    wake_at_ms: u64,
    awaiting_rel_msg_id: u16,
}

impl<T: DatagramTransport, const N: usize> Machine<T, N> {
    /// Wrap a client in a state machine. The machine starts disconnected;
    /// call [`connect`](Self::connect) to bring the session up.
    pub fn new(client: Client<T, N>, config: MachineConfig) -> Self {
        Self {
            client,
            config,
            state: State::Disconnected,
            retries: 0,
            last_ping_ms: 0,
            sleep_duration_s: 0,
            wake_at_ms: 0,
            awaiting_rel_msg_id: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The driven client, for session inspection.
    pub fn client(&self) -> &Client<T, N> {
        &self.client
    }

    /// Mutable access to the driven client.
    pub fn client_mut(&mut self) -> &mut Client<T, N> {
        &mut self.client
    }

    /// Tear the machine apart, returning the client so the caller can
    /// release the transport.
    pub fn release(self) -> Client<T, N> {
        self.client
    }

    fn transition(&mut self, to: State) {
        if self.state != to {
            log::debug!("mqtt-sn: {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        self.transition(State::Disconnected);
        error
    }

    // --- connection establishment -------------------------------------

    /// Establish the session, retrying an unanswered Connect up to the
    /// retry limit.
    ///
    /// With a will configured this chains the full handshake: Connect →
    /// WillTopicReq → WillTopic → WillMsgReq → WillMsg → ConnAck. Any
    /// rejection or protocol breakdown ends in `Disconnected` with the
    /// specific error.
    pub fn connect(&mut self, now_ms: u64, will: Option<&WillConfig<'_>>) -> Result<(), Error> {
        self.transition(State::Connecting);
        let mut attempts = 0u8;
        let stage = loop {
            match self.client.connect(will.is_some()) {
                Ok(stage) => break stage,
                Err(Error::NoServerResponse) if attempts < self.config.retry_limit => {
                    attempts += 1;
                    log::debug!("mqtt-sn: no ConnAck, retrying connect ({})", attempts);
                }
                Err(e) => return Err(self.fail(e)),
            }
        };

        match stage {
            ConnectStage::Connected => {
                self.last_ping_ms = now_ms;
                self.transition(State::Connected);
                Ok(())
            }
            ConnectStage::WillTopicRequested => {
                let Some(will) = will else {
                    return Err(self.fail(Error::WrongMessageType));
                };
                self.transition(State::WillTopicReq);
                if let Err(e) = self.client.will_topic(will.qos, will.retain, will.topic) {
                    return Err(self.fail(e));
                }
                self.transition(State::WillMsgReq);
                if let Err(e) = self.client.will_msg(will.message) {
                    return Err(self.fail(e));
                }
                self.last_ping_ms = now_ms;
                self.transition(State::Connected);
                Ok(())
            }
        }
    }

    // --- the dispatch loop --------------------------------------------

    /// Run one step of the machine.
    ///
    /// `now_ms` is a monotonic millisecond clock supplied by the caller.
    /// A pending `command` takes priority over timers and inbound traffic,
    /// matching the hub's servicing order. Messages delivered to the
    /// application arrive through `on_publish`. The returned state is the
    /// state after the step; `Disconnected` is terminal.
    pub fn step<F>(
        &mut self,
        now_ms: u64,
        command: Option<Command<'_>>,
        mut on_publish: F,
    ) -> Result<State, Error>
    where
        F: FnMut(InboundPublish),
    {
        match self.state {
            State::Connected => self.step_connected(now_ms, command, &mut on_publish),
            State::ClientPing => self.step_client_ping(now_ms),
            State::ReceivingQos2 => self.step_receiving_qos2(),
            State::Sleeping => self.step_sleeping(now_ms, &mut on_publish),
            // Every other state resolves within the step that entered it.
            state => Ok(state),
        }
    }

    fn step_connected<F>(
        &mut self,
        now_ms: u64,
        command: Option<Command<'_>>,
        on_publish: &mut F,
    ) -> Result<State, Error>
    where
        F: FnMut(InboundPublish),
    {
        if let Some(command) = command {
            return self.run_command(now_ms, command);
        }

        if self.keep_alive_due(now_ms) {
            self.client.send_ping().map_err(|e| self.fail(e))?;
            self.retries = 0;
            self.transition(State::ClientPing);
            return Ok(self.state);
        }

        match self.client.poll_inbound()? {
            None => Ok(State::Connected),
            Some(Inbound::Publish(publish)) => self.accept_publish(publish, on_publish),
            Some(Inbound::Register { topic_id, msg_id }) => {
                let accepted = self.client.handle_register(topic_id, msg_id)?;
                if !accepted {
                    log::warn!("mqtt-sn: rejected Register for unknown topic {}", topic_id);
                }
                Ok(State::Connected)
            }
            Some(Inbound::PingReq) => {
                self.transition(State::ServerPing);
                self.client.ping_resp().map_err(|e| self.fail(e))?;
                self.transition(State::Connected);
                Ok(State::Connected)
            }
            Some(Inbound::Disconnect { .. }) => {
                log::warn!("mqtt-sn: gateway disconnected us");
                self.transition(State::Disconnected);
                Ok(State::Disconnected)
            }
            Some(other) => {
                log::warn!("mqtt-sn: ignoring unexpected inbound {:?}", other);
                Ok(State::Connected)
            }
        }
    }

    fn accept_publish<F>(
        &mut self,
        publish: InboundPublish,
        on_publish: &mut F,
    ) -> Result<State, Error>
    where
        F: FnMut(InboundPublish),
    {
        if !self.client.session().is_subscribed_to(publish.topic_id) {
            log::warn!(
                "mqtt-sn: publish for unsubscribed topic {}, rejecting",
                publish.topic_id
            );
            self.client.pub_ack(
                publish.topic_id,
                publish.msg_id,
                ReturnCode::RejectedInvalidTopicId,
            )?;
            return Ok(State::Connected);
        }
        match publish.qos {
            QoS::AtMostOnce | QoS::Connectionless => {
                on_publish(publish);
                Ok(State::Connected)
            }
            QoS::AtLeastOnce => {
                self.transition(State::ReceivingQos1);
                self.client
                    .pub_ack(publish.topic_id, publish.msg_id, ReturnCode::Accepted)?;
                on_publish(publish);
                self.transition(State::Connected);
                Ok(State::Connected)
            }
            QoS::ExactlyOnce => {
                self.client.pub_rec(publish.msg_id)?;
                self.awaiting_rel_msg_id = publish.msg_id;
                self.retries = 0;
                self.transition(State::ReceivingQos2);
                on_publish(publish);
                Ok(State::ReceivingQos2)
            }
        }
    }

    fn step_client_ping(&mut self, now_ms: u64) -> Result<State, Error> {
        match self.client.await_ping_resp() {
            Ok(()) => {
                self.retries = 0;
                self.last_ping_ms = now_ms;
                self.transition(State::Connected);
                Ok(State::Connected)
            }
            Err(Error::NoServerResponse) => {
                if self.retries < self.config.retry_limit {
                    self.retries += 1;
                    log::debug!("mqtt-sn: no PingResp, retrying ping ({})", self.retries);
                    self.client.send_ping().map_err(|e| self.fail(e))?;
                    Ok(State::ClientPing)
                } else {
                    match self.config.ping_policy {
                        PingPolicy::Lenient => {
                            log::warn!("mqtt-sn: ping retries exhausted, staying connected");
                            self.retries = 0;
                            self.last_ping_ms = now_ms;
                            self.transition(State::Connected);
                            Ok(State::Connected)
                        }
                        PingPolicy::Fatal => {
                            log::warn!("mqtt-sn: ping retries exhausted, disconnecting");
                            let _ = self.client.disconnect(None);
                            self.transition(State::Disconnected);
                            Err(Error::NoServerResponse)
                        }
                    }
                }
            }
            Err(Error::WrongMessageType) => {
                // Something other than PingResp showed up; abandon the ping
                // cycle and let the hub reclassify traffic.
                self.transition(State::Connected);
                Ok(State::Connected)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn step_receiving_qos2(&mut self) -> Result<State, Error> {
        match self.client.poll_inbound()? {
            Some(Inbound::PubRel { msg_id }) if msg_id == self.awaiting_rel_msg_id => {
                self.client.pub_comp(msg_id)?;
                self.transition(State::Connected);
                Ok(State::Connected)
            }
            Some(Inbound::PubRel { msg_id }) => {
                log::warn!(
                    "mqtt-sn: PubRel msg id {} does not match pending {}",
                    msg_id,
                    self.awaiting_rel_msg_id
                );
                self.transition(State::Connected);
                Err(Error::MsgIdMismatch)
            }
            None => {
                if self.retries < self.config.retry_limit {
                    self.retries += 1;
                    Ok(State::ReceivingQos2)
                } else {
                    log::warn!("mqtt-sn: no PubRel for inbound QoS 2 publish");
                    self.transition(State::Connected);
                    Err(Error::NoServerResponse)
                }
            }
            Some(other) => {
                log::warn!("mqtt-sn: expected PubRel, got {:?}", other);
                self.transition(State::Connected);
                Err(Error::WrongMessageType)
            }
        }
    }

    fn step_sleeping<F>(&mut self, now_ms: u64, on_publish: &mut F) -> Result<State, Error>
    where
        F: FnMut(InboundPublish),
    {
        if now_ms < self.wake_at_ms {
            return Ok(State::Sleeping);
        }
        match self.client.sleep_poll(|publish| on_publish(publish)) {
            Ok(status) => {
                log::debug!("mqtt-sn: sleep poll: {:?}", status);
                self.arm_sleep(now_ms);
                Ok(State::Sleeping)
            }
            Err(e) => {
                log::warn!("mqtt-sn: sleep poll failed: {:?}", e);
                self.transition(State::Connected);
                Err(e)
            }
        }
    }

    // --- command execution --------------------------------------------

    fn run_command(&mut self, now_ms: u64, command: Command<'_>) -> Result<State, Error> {
        match command {
            Command::Register { topic_name } => {
                self.transition(State::Registering);
                let result = self.client.register(topic_name);
                self.transition(State::Connected);
                result.map(|_| State::Connected)
            }
            Command::Subscribe { filter, qos } => {
                self.transition(State::Subscribing);
                let result = self.client.subscribe(filter, qos);
                self.transition(State::Connected);
                result.map(|_| State::Connected)
            }
            Command::Unsubscribe { filter } => {
                self.transition(State::Unsubscribing);
                let result = self.client.unsubscribe(filter);
                self.transition(State::Connected);
                result.map(|_| State::Connected)
            }
            Command::Publish {
                topic,
                qos,
                retain,
                payload,
            } => self.run_publish(topic, qos, retain, payload),
            Command::UpdateWillTopic { qos, retain, topic } => {
                let result = self.client.will_topic_update(qos, retain, topic);
                result.map(|_| State::Connected)
            }
            Command::UpdateWillMsg { message } => {
                let result = self.client.will_msg_update(message);
                result.map(|_| State::Connected)
            }
            Command::Sleep { duration_s } => {
                self.transition(State::Disconnecting);
                if let Err(e) = self.client.disconnect(Some(duration_s)) {
                    self.transition(State::Connected);
                    return Err(e);
                }
                self.sleep_duration_s = duration_s;
                self.arm_sleep(now_ms);
                self.transition(State::Sleeping);
                Ok(State::Sleeping)
            }
            Command::Disconnect => {
                self.transition(State::Disconnecting);
                let result = self.client.disconnect(None);
                self.transition(State::Disconnected);
                result.map(|_| State::Disconnected)
            }
        }
    }

    /// A publish with the retry policy the QoS 2 exchange demands: a
    /// missing PubRec retransmits the original Publish (dup set), a missing
    /// PubComp retransmits only the PubRel.
    fn run_publish(
        &mut self,
        topic: TopicId<'_>,
        qos: QoS,
        retain: bool,
        payload: &[u8],
    ) -> Result<State, Error> {
        self.transition(State::Publishing);
        let mut attempts = 0u8;
        let result = loop {
            let sent = if attempts == 0 {
                self.client.publish(topic, qos, retain, payload)
            } else {
                self.client.publish_dup(topic, qos, retain, payload, true)
            };
            match sent {
                Ok(()) => break Ok(()),
                Err(Error::NoPubRec | Error::NoServerResponse)
                    if attempts < self.config.retry_limit =>
                {
                    attempts += 1;
                    log::debug!("mqtt-sn: republishing msg ({})", attempts);
                }
                Err(Error::NoPubComp) => break self.retry_pub_rel(),
                Err(e) => break Err(e),
            }
        };
        self.transition(State::Connected);
        result.map(|_| State::Connected)
    }

    fn retry_pub_rel(&mut self) -> Result<(), Error> {
        let msg_id = self.client.last_msg_id();
        let mut attempts = 0u8;
        loop {
            match self.client.pub_rel_exchange(msg_id) {
                Ok(()) => return Ok(()),
                Err(Error::NoPubComp) if attempts < self.config.retry_limit => {
                    attempts += 1;
                    log::debug!("mqtt-sn: resending PubRel ({})", attempts);
                }
                Err(e) => return Err(e),
            }
        }
    }

    // --- timers -------------------------------------------------------

    fn keep_alive_due(&self, now_ms: u64) -> bool {
        let keep_alive = self.client.keep_alive_seconds();
        if keep_alive == 0 {
            return false;
        }
        let interval = keep_alive.saturating_sub(self.config.keep_alive_margin_s).max(1);
        now_ms.saturating_sub(self.last_ping_ms) >= u64::from(interval) * 1000
    }

    fn arm_sleep(&mut self, now_ms: u64) {
        let interval = self
            .sleep_duration_s
            .saturating_sub(self.config.sleep_margin_s)
            .max(1);
        self.wake_at_ms = now_ms + u64::from(interval) * 1000;
    }
}
