//! A datagram transport abstraction for MQTT-SN clients
//!
//! MQTT-SN runs over any unreliable datagram service: UDP, ZigBee, a serial
//! forwarder, or a loopback pair in tests. This module defines the small set
//! of traits the protocol engine consumes, so the engine itself never touches
//! sockets. Implementations map these calls onto whatever networking stack
//! the target platform provides.
//!

#![allow(missing_docs)]
#![allow(async_fn_in_trait)]
#![deny(unsafe_code)]

/// A connected, best-effort datagram channel to one gateway.
///
/// The remote address is the implementor's concern: the protocol engine hands
/// over a fully serialized frame and expects it delivered to the gateway this
/// transport was opened against, or an error. Delivery is unreliable by
/// design; retries live in the protocol layer, not here.
pub trait DatagramTransport {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Send one frame to the gateway.
    ///
    /// Either the whole frame is handed to the network or an error is
    /// returned; partial sends are not part of the contract.
    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Wait up to `timeout_ms` milliseconds for one inbound datagram.
    ///
    /// Returns `Ok(Some(n))` with the datagram length when one arrived,
    /// `Ok(None)` when the window elapsed with nothing to read. The bounded
    /// wait is what lets the driving loop service its keep-alive and sleep
    /// timers even on a silent link; implementations must not block past the
    /// timeout.
    fn poll_receive(&mut self, buf: &mut [u8], timeout_ms: u32)
    -> Result<Option<usize>, Self::Error>;
}

/// Releasing a transport endpoint.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the endpoint. Closing an already-closed endpoint is a no-op.
    fn close(self) -> Result<(), Self::Error>;
}

// Async variants, declaration-only: the core engine is synchronous and
// poll-driven, but async platforms can expose the same surface.
#[cfg(feature = "async")]
pub trait AsyncDatagramTransport {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Send one frame to the gateway asynchronously.
    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
    /// Wait up to `timeout_ms` milliseconds for one inbound datagram.
    async fn poll_receive(
        &mut self,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<Option<usize>, Self::Error>;
}

#[cfg(feature = "async")]
pub trait AsyncClose {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the endpoint asynchronously.
    async fn close(self) -> Result<(), Self::Error>;
}
