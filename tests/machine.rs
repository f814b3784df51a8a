mod common;

use common::*;
use libmqttsn::client::{Client, Options};
use libmqttsn::error::Error;
use libmqttsn::machine::{Command, Machine, MachineConfig, PingPolicy, State, WillConfig};
use libmqttsn::packet::{QoS, ReturnCode};
use libmqttsn::topic::{TopicFilter, TopicId};

fn machine(transport: ScriptedTransport, config: MachineConfig) -> Machine<ScriptedTransport> {
    let client = Client::new(
        transport,
        Options {
            keep_alive_seconds: 20,
            ..Options::new("c1")
        },
    )
    .unwrap();
    Machine::new(client, config)
}

fn no_deliveries(_publish: libmqttsn::client::InboundPublish) {
    panic!("no deliveries expected");
}

#[test]
fn clean_connect_consumes_zero_retries() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());

    machine.connect(0, None).unwrap();
    assert_eq!(machine.state(), State::Connected);
    assert_eq!(machine.client().transport().sent.len(), 1);
}

#[test]
fn connect_retries_then_succeeds() {
    let transport = ScriptedTransport::new()
        .silence()
        .silence()
        .reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());

    machine.connect(0, None).unwrap();
    assert_eq!(machine.state(), State::Connected);
    assert_eq!(machine.client().transport().sent_types(), vec![0x04; 3]);
}

#[test]
fn connect_retry_exhaustion_disconnects() {
    let transport = ScriptedTransport::new();
    let mut machine = machine(
        transport,
        MachineConfig {
            retry_limit: 2,
            ..MachineConfig::default()
        },
    );

    assert_eq!(machine.connect(0, None), Err(Error::NoServerResponse));
    assert_eq!(machine.state(), State::Disconnected);
    // Initial attempt plus two retries.
    assert_eq!(machine.client().transport().sent.len(), 3);
}

#[test]
fn connect_rejection_disconnects() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::RejectedNotSupported));
    let mut machine = machine(transport, MachineConfig::default());

    assert_eq!(
        machine.connect(0, None),
        Err(Error::Rejected(ReturnCode::RejectedNotSupported))
    );
    assert_eq!(machine.state(), State::Disconnected);
}

#[test]
fn will_handshake_reaches_connected() {
    let transport = ScriptedTransport::new()
        .reply(&will_topic_req())
        .reply(&will_msg_req())
        .reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());

    let will = WillConfig {
        topic: "nodes/c1/status",
        message: b"offline",
        qos: QoS::AtLeastOnce,
        retain: true,
    };
    machine.connect(0, Some(&will)).unwrap();
    assert_eq!(machine.state(), State::Connected);
    assert_eq!(
        machine.client().transport().sent_types(),
        vec![0x04, 0x07, 0x09]
    );
}

#[test]
fn keep_alive_timer_drives_a_ping_cycle() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();

    // Keep-alive 20s with a 5s margin: due at 15s.
    assert_eq!(machine.step(14_000, None, no_deliveries), Ok(State::Connected));
    assert_eq!(machine.step(15_000, None, no_deliveries), Ok(State::ClientPing));
    machine.client_mut().transport_mut().push_reply(&ping_resp());
    assert_eq!(machine.step(15_400, None, no_deliveries), Ok(State::Connected));
    assert_eq!(machine.client().transport().sent_types(), vec![0x04, 0x16]);
}

#[test]
fn lenient_ping_policy_returns_to_connected() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(
        transport,
        MachineConfig {
            retry_limit: 1,
            ping_policy: PingPolicy::Lenient,
            ..MachineConfig::default()
        },
    );
    machine.connect(0, None).unwrap();

    assert_eq!(machine.step(15_000, None, no_deliveries), Ok(State::ClientPing));
    // First silent window retries, second exhausts the budget.
    assert_eq!(machine.step(15_400, None, no_deliveries), Ok(State::ClientPing));
    assert_eq!(machine.step(15_800, None, no_deliveries), Ok(State::Connected));
    // Connect plus two PingReq transmissions; no Disconnect.
    assert_eq!(machine.client().transport().sent_types(), vec![0x04, 0x16, 0x16]);
}

#[test]
fn fatal_ping_policy_disconnects() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(
        transport,
        MachineConfig {
            retry_limit: 1,
            ping_policy: PingPolicy::Fatal,
            ..MachineConfig::default()
        },
    );
    machine.connect(0, None).unwrap();

    machine.step(15_000, None, no_deliveries).unwrap();
    machine.step(15_400, None, no_deliveries).unwrap();
    assert_eq!(
        machine.step(15_800, None, no_deliveries),
        Err(Error::NoServerResponse)
    );
    assert_eq!(machine.state(), State::Disconnected);
    // The best-effort Disconnect went out last.
    assert_eq!(
        machine.client().transport().sent_types().last(),
        Some(&0x18)
    );
}

fn connected_subscribed() -> Machine<ScriptedTransport> {
    let transport = ScriptedTransport::new()
        .reply(&conn_ack(ReturnCode::Accepted))
        .reply(&sub_ack(QoS::ExactlyOnce, 9, 1, ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();
    machine
        .step(
            0,
            Some(Command::Subscribe {
                filter: TopicFilter::Name("sensors/temp"),
                qos: QoS::ExactlyOnce,
            }),
            no_deliveries,
        )
        .unwrap();
    machine
}

#[test]
fn inbound_qos0_publish_is_delivered() {
    let mut machine = connected_subscribed();
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::AtMostOnce, 9, 0, b"21.0"));

    let mut delivered = Vec::new();
    let state = machine.step(0, None, |p| delivered.push(p)).unwrap();
    assert_eq!(state, State::Connected);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload.as_slice(), b"21.0");
}

#[test]
fn inbound_qos1_publish_is_acked_and_delivered() {
    let mut machine = connected_subscribed();
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::AtLeastOnce, 9, 5, b"22.5"));

    let mut delivered = Vec::new();
    let state = machine.step(0, None, |p| delivered.push(p)).unwrap();
    assert_eq!(state, State::Connected);
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &pub_ack(9, 5, ReturnCode::Accepted)
    );
}

#[test]
fn inbound_qos2_publish_completes_across_steps() {
    let mut machine = connected_subscribed();
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::ExactlyOnce, 9, 6, b"x"));

    let mut delivered = Vec::new();
    let state = machine.step(0, None, |p| delivered.push(p)).unwrap();
    assert_eq!(state, State::ReceivingQos2);
    assert_eq!(delivered.len(), 1);
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &pub_rec(6)
    );

    machine.client_mut().transport_mut().push_reply(&pub_rel(6));
    let state = machine.step(0, None, no_deliveries).unwrap();
    assert_eq!(state, State::Connected);
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &pub_comp(6)
    );
}

#[test]
fn withheld_pubrel_does_not_silently_reconnect() {
    let mut machine = connected_subscribed();
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::ExactlyOnce, 9, 6, b"x"));
    machine.step(0, None, |_| {}).unwrap();

    // Silent windows keep the machine waiting until the retry budget is
    // spent, then the failure is reported.
    let mut outcome = Ok(State::ReceivingQos2);
    for _ in 0..=u32::from(MachineConfig::default().retry_limit) {
        outcome = machine.step(0, None, no_deliveries);
    }
    assert_eq!(outcome, Err(Error::NoServerResponse));
    assert_eq!(machine.state(), State::Connected);
}

#[test]
fn unsubscribed_publish_is_rejected_with_invalid_topic_id() {
    let mut machine = connected_subscribed();
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::AtLeastOnce, 77, 5, b"?"));

    let state = machine.step(0, None, no_deliveries).unwrap();
    assert_eq!(state, State::Connected);
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &pub_ack(77, 5, ReturnCode::RejectedInvalidTopicId)
    );
}

#[test]
fn register_push_binds_the_wildcard_id() {
    let transport = ScriptedTransport::new()
        .reply(&conn_ack(ReturnCode::Accepted))
        .reply(&sub_ack(QoS::AtMostOnce, 0, 1, ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();
    machine
        .step(
            0,
            Some(Command::Subscribe {
                filter: TopicFilter::Name("sensors/#"),
                qos: QoS::AtMostOnce,
            }),
            no_deliveries,
        )
        .unwrap();

    machine
        .client_mut()
        .transport_mut()
        .push_reply(&register_push(42, 9, "sensors/room1"));
    machine.step(0, None, no_deliveries).unwrap();
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &reg_ack(42, 9, ReturnCode::Accepted)
    );

    // Publishes on the bound id are now deliverable.
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::AtMostOnce, 42, 0, b"hi"));
    let mut delivered = Vec::new();
    machine.step(0, None, |p| delivered.push(p)).unwrap();
    assert_eq!(delivered.len(), 1);
}

#[test]
fn register_push_for_unknown_topic_is_rejected() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();

    machine
        .client_mut()
        .transport_mut()
        .push_reply(&register_push(42, 9, "sensors/room1"));
    machine.step(0, None, no_deliveries).unwrap();
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &reg_ack(42, 9, ReturnCode::RejectedInvalidTopicId)
    );
}

#[test]
fn server_ping_is_answered() {
    let transport = ScriptedTransport::new().reply(&conn_ack(ReturnCode::Accepted));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();

    machine.client_mut().transport_mut().push_reply(&ping_req(""));
    let state = machine.step(0, None, no_deliveries).unwrap();
    assert_eq!(state, State::Connected);
    assert_eq!(machine.client().transport().sent.last().unwrap(), &ping_resp());
}

#[test]
fn publish_command_retransmits_until_pubrec_arrives() {
    let transport = ScriptedTransport::new()
        .reply(&conn_ack(ReturnCode::Accepted))
        .silence()
        .reply(&pub_rec(1))
        .reply(&pub_comp(1));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();

    let state = machine
        .step(
            0,
            Some(Command::Publish {
                topic: TopicId::Normal(7),
                qos: QoS::ExactlyOnce,
                retain: false,
                payload: b"x",
            }),
            no_deliveries,
        )
        .unwrap();
    assert_eq!(state, State::Connected);

    let sent = &machine.client().transport().sent;
    // Connect, Publish, Publish again with dup set, PubRel.
    assert_eq!(machine.client().transport().sent_types(), vec![0x04, 0x0C, 0x0C, 0x10]);
    assert_ne!(sent[1][2] & 0x80, 0x80);
    assert_eq!(sent[2][2] & 0x80, 0x80);
}

#[test]
fn sleep_cycle_drains_buffered_publishes() {
    let transport = ScriptedTransport::new()
        .reply(&conn_ack(ReturnCode::Accepted))
        .reply(&sub_ack(QoS::AtMostOnce, 9, 1, ReturnCode::Accepted))
        .reply(&disconnect(Some(10)));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();
    machine
        .step(
            0,
            Some(Command::Subscribe {
                filter: TopicFilter::Name("sensors/temp"),
                qos: QoS::AtMostOnce,
            }),
            no_deliveries,
        )
        .unwrap();

    let state = machine
        .step(0, Some(Command::Sleep { duration_s: 10 }), no_deliveries)
        .unwrap();
    assert_eq!(state, State::Sleeping);

    // Not yet time to wake: nothing happens.
    assert_eq!(machine.step(1_000, None, no_deliveries), Ok(State::Sleeping));
    let frames_before = machine.client().transport().sent.len();
    assert_eq!(machine.client().transport().sent.len(), frames_before);

    // At the wake point the machine polls with its client id and drains.
    machine
        .client_mut()
        .transport_mut()
        .push_reply(&inbound_publish(QoS::AtMostOnce, 9, 0, b"buffered"));
    machine.client_mut().transport_mut().push_reply(&ping_resp());

    let mut delivered = Vec::new();
    let state = machine.step(5_000, None, |p| delivered.push(p)).unwrap();
    assert_eq!(state, State::Sleeping);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload.as_slice(), b"buffered");
    assert_eq!(
        machine.client().transport().sent.last().unwrap(),
        &ping_req("c1")
    );
}

#[test]
fn disconnect_command_is_terminal() {
    let transport = ScriptedTransport::new()
        .reply(&conn_ack(ReturnCode::Accepted))
        .reply(&disconnect(None));
    let mut machine = machine(transport, MachineConfig::default());
    machine.connect(0, None).unwrap();

    let state = machine
        .step(0, Some(Command::Disconnect), no_deliveries)
        .unwrap();
    assert_eq!(state, State::Disconnected);
    // Terminal: further steps are inert.
    assert_eq!(machine.step(0, None, no_deliveries), Ok(State::Disconnected));
    machine.release().close().unwrap();
}
