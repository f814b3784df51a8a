//! Common error types for the MQTT-SN client stack

use crate::packet::ReturnCode;

/// A common error type for MQTT-SN protocol operations.
///
/// This enum covers every failure the codec, the session bookkeeping and the
/// message sequencer can report. It is designed to be simple and portable
/// for `no_std` environments.
///
/// The variants fall into a few families with different recovery rules:
///
/// - Framing errors ([`BufferTooShort`], [`Malformed`], [`FrameTooLarge`])
///   are local to one encode/decode call and never retryable as-is.
/// - Correlation errors ([`MsgIdMismatch`], [`TopicIdMismatch`],
///   [`WrongMessageType`], [`QosMismatch`]) mean the peer and the client have
///   desynchronized; the state machine abandons the exchange rather than
///   retrying blindly.
/// - [`Rejected`] carries the server's return code verbatim and is never
///   retried automatically.
/// - Transport errors ([`SendFailed`], [`ReceiveFailed`],
///   [`NoServerResponse`]) are fatal to the current exchange; the state
///   machine decides between retry and disconnect.
/// - [`CapacityExceeded`] reports a full bounded topic list instead of
///   silently truncating it.
///
/// [`BufferTooShort`]: Error::BufferTooShort
/// [`Malformed`]: Error::Malformed
/// [`FrameTooLarge`]: Error::FrameTooLarge
/// [`MsgIdMismatch`]: Error::MsgIdMismatch
/// [`TopicIdMismatch`]: Error::TopicIdMismatch
/// [`WrongMessageType`]: Error::WrongMessageType
/// [`QosMismatch`]: Error::QosMismatch
/// [`Rejected`]: Error::Rejected
/// [`SendFailed`]: Error::SendFailed
/// [`ReceiveFailed`]: Error::ReceiveFailed
/// [`NoServerResponse`]: Error::NoServerResponse
/// [`CapacityExceeded`]: Error::CapacityExceeded
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The destination buffer is smaller than the exact encoded frame size.
    /// Nothing has been written to the buffer.
    BufferTooShort,
    /// A received frame is internally inconsistent: its declared length does
    /// not match the bytes available, or a field is truncated or carries an
    /// unknown value.
    Malformed,
    /// A received frame declares a length larger than the configured maximum
    /// frame size. The frame was not decoded.
    FrameTooLarge,
    /// The message-type byte of a received frame does not match the type the
    /// current exchange expects.
    WrongMessageType,
    /// An acknowledgement carried a message id that does not match the one
    /// sent in the corresponding request.
    MsgIdMismatch,
    /// An acknowledgement carried a topic id that does not match the one
    /// sent in the corresponding request.
    TopicIdMismatch,
    /// A SubAck granted a different QoS level than the one requested.
    QosMismatch,
    /// The server answered with a non-accepted return code, passed through
    /// verbatim.
    Rejected(ReturnCode),
    /// A topic id type tag outside the range accepted on the wire (0, 1, 2)
    /// was supplied or received.
    InvalidTopicIdType,
    /// A QoS level not valid for the attempted operation was supplied.
    InvalidQos,
    /// The client identifier is empty or longer than the 23 bytes the
    /// protocol allows.
    InvalidClientId,
    /// A bounded topic-id list is full; the entry was not recorded.
    CapacityExceeded,
    /// The transport failed to send a frame.
    SendFailed,
    /// The transport failed while receiving.
    ReceiveFailed,
    /// No reply arrived within the reply window.
    NoServerResponse,
    /// A QoS 2 publish got no PubRec; the original Publish is the frame to
    /// retransmit.
    NoPubRec,
    /// A QoS 2 publish got no PubComp after PubRel; the PubRel is the frame
    /// to retransmit.
    NoPubComp,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::BufferTooShort => defmt::write!(f, "BufferTooShort"),
            Error::Malformed => defmt::write!(f, "Malformed"),
            Error::FrameTooLarge => defmt::write!(f, "FrameTooLarge"),
            Error::WrongMessageType => defmt::write!(f, "WrongMessageType"),
            Error::MsgIdMismatch => defmt::write!(f, "MsgIdMismatch"),
            Error::TopicIdMismatch => defmt::write!(f, "TopicIdMismatch"),
            Error::QosMismatch => defmt::write!(f, "QosMismatch"),
            Error::Rejected(code) => defmt::write!(f, "Rejected({})", *code as u8),
            Error::InvalidTopicIdType => defmt::write!(f, "InvalidTopicIdType"),
            Error::InvalidQos => defmt::write!(f, "InvalidQos"),
            Error::InvalidClientId => defmt::write!(f, "InvalidClientId"),
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::SendFailed => defmt::write!(f, "SendFailed"),
            Error::ReceiveFailed => defmt::write!(f, "ReceiveFailed"),
            Error::NoServerResponse => defmt::write!(f, "NoServerResponse"),
            Error::NoPubRec => defmt::write!(f, "NoPubRec"),
            Error::NoPubComp => defmt::write!(f, "NoPubComp"),
        }
    }
}
