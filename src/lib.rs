//! # libmqttsn - MQTT-SN client stack
//!
//! A Rust implementation of the MQTT-SN v1.2 client side for constrained
//! devices and sensor networks: a bit-exact wire codec, per-connection
//! session bookkeeping, a message sequencer for every protocol exchange and
//! an explicit state machine that drives connection establishment,
//! keep-alive supervision and sleep/wake cycles over any unreliable
//! datagram transport. The crate supports `no_std` environments.
//!
//! ## Architecture
//!
//! - [`packet`]: encode/decode for every MQTT-SN message type, with
//!   length-prefix framing, the packed flags byte and the three topic
//!   addressing modes handled bit-for-bit.
//! - [`topic`]: the tagged topic identifier model, including the QoS "-1"
//!   long-name form.
//! - [`session`]: bounded per-connection topic-id bookkeeping.
//! - [`client`]: the message sequencer, one method per protocol exchange,
//!   validating correlation fields before any session state changes.
//! - [`machine`]: the finite state machine that owns retries, timers and
//!   the sleep cycle, and the only module that logs.
//! - [`transport`]: the datagram transport traits the engine consumes.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmqttsn = "0.1.0"
//! ```
//!
//! Bring your own transport by implementing
//! [`transport::DatagramTransport`] for whatever carries datagrams on your
//! platform, then connect:
//!
//! ```rust,no_run
//! use libmqttsn::client::{Client, Options};
//! use libmqttsn::machine::{Command, Machine, MachineConfig};
//! use libmqttsn::packet::QoS;
//! use libmqttsn::topic::TopicFilter;
//! # struct UdpTransport;
//! # impl libmqttsn::transport::DatagramTransport for UdpTransport {
//! #     type Error = ();
//! #     fn send(&mut self, _frame: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     fn poll_receive(&mut self, _buf: &mut [u8], _timeout_ms: u32)
//! #     -> Result<Option<usize>, Self::Error> { Ok(None) }
//! # }
//! # fn now_ms() -> u64 { 0 }
//!
//! let transport = UdpTransport;
//! let client: Client<_> = Client::new(transport, Options::new("sensor_7")).unwrap();
//! let mut machine = Machine::new(client, MachineConfig::default());
//!
//! // machine.connect(now_ms(), None)?;
//! // machine.step(now_ms(), Some(Command::Subscribe {
//! //     filter: TopicFilter::Name("commands/#"),
//! //     qos: QoS::AtLeastOnce,
//! // }), |message| {
//! //     // handle inbound publishes
//! // })?;
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `async`: Declare async transport trait variants
//! - `defmt`: Enable defmt formatting for error types

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Common error types for the protocol stack.
pub mod error;

/// The MQTT-SN wire codec: framing, flags and every message type.
pub mod packet;

/// The topic identifier model and subscription filters.
pub mod topic;

/// Bounded per-connection session bookkeeping.
pub mod session;

/// The message sequencer driving one protocol exchange at a time.
pub mod client;

/// The client connection state machine.
pub mod machine;

/// Datagram transport traits consumed by the engine.
pub mod transport;

/// Re-exports of the types most applications touch.
pub mod prelude {
    pub use crate::client::{Client, Options};
    pub use crate::error::Error;
    pub use crate::machine::{Command, Machine, MachineConfig, PingPolicy, State, WillConfig};
    pub use crate::packet::{QoS, ReturnCode};
    pub use crate::session::Session;
    pub use crate::topic::{TopicFilter, TopicId};
    pub use crate::transport::{Close, DatagramTransport};
}
