//! Topic addressing model
//!
//! MQTT-SN keeps frames small by replacing topic names with two byte
//! identifiers wherever it can. A topic can be addressed three ways on the
//! wire: by a gateway-assigned numeric id obtained through Register, by a
//! predefined id agreed out of band, or by a two character short name that
//! needs no registration at all. A fourth, out-of-band form exists only for
//! QoS "-1" publishes, where a full topic name rides inside the Publish
//! frame because no registration ever happened.

use crate::error::Error;
use crate::packet::QoS;

/// Wire tag for normal (registered) topic ids.
pub(crate) const KIND_NORMAL: u8 = 0b00;
/// Wire tag for predefined topic ids.
pub(crate) const KIND_PREDEFINED: u8 = 0b01;
/// Wire tag for short topic names.
pub(crate) const KIND_SHORT: u8 = 0b10;

/// One of the ways a topic can be addressed in a Publish message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicId<'a> {
    /// A numeric id assigned by the gateway via the Register exchange.
    Normal(u16),
    /// A numeric id agreed out of band between client and gateway.
    Predefined(u16),
    /// A two character topic name, usable without registration.
    Short([u8; 2]),
    /// A full topic name that has not been registered. Only valid in a
    /// QoS "-1" publish, where the name itself travels inside the frame.
    LongPending(&'a str),
}

impl TopicId<'_> {
    /// The topic id type tag this identifier encodes to, validated against
    /// the QoS of the publish carrying it.
    ///
    /// Rejects the combination of a pending long name with any QoS other
    /// than "-1" before any buffer is sized.
    pub(crate) fn wire_kind(&self, qos: QoS) -> Result<u8, Error> {
        match self {
            Self::Normal(_) => Ok(KIND_NORMAL),
            Self::Predefined(_) => Ok(KIND_PREDEFINED),
            Self::Short(_) => Ok(KIND_SHORT),
            Self::LongPending(_) => {
                if qos == QoS::Connectionless {
                    Ok(KIND_NORMAL)
                } else {
                    Err(Error::InvalidTopicIdType)
                }
            }
        }
    }

    /// The two bytes written into the topic id field of a Publish frame.
    ///
    /// For a pending long name this is the name length, per the QoS "-1"
    /// special arrangement.
    pub(crate) fn id_field(&self) -> [u8; 2] {
        match self {
            Self::Normal(id) | Self::Predefined(id) => id.to_be_bytes(),
            Self::Short(name) => *name,
            Self::LongPending(name) => (name.len() as u16).to_be_bytes(),
        }
    }

    /// The numeric form used for acknowledgement correlation, if one exists.
    ///
    /// Short names compare as their big-endian byte value, matching how
    /// gateways echo them back in PubAck.
    pub fn numeric(&self) -> Option<u16> {
        match self {
            Self::Normal(id) | Self::Predefined(id) => Some(*id),
            Self::Short(name) => Some(u16::from_be_bytes(*name)),
            Self::LongPending(_) => None,
        }
    }
}

/// How a Subscribe or Unsubscribe names the topic it wants.
///
/// Subscriptions address topics either by full name (which may contain
/// wildcards; the gateway resolves it and answers with an id), by a
/// predefined id, or by a short name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFilter<'a> {
    /// A full topic name, wildcards allowed.
    Name(&'a str),
    /// A predefined topic id.
    Predefined(u16),
    /// A two character short topic name.
    Short([u8; 2]),
}

impl TopicFilter<'_> {
    pub(crate) fn wire_kind(&self) -> u8 {
        match self {
            Self::Name(_) => KIND_NORMAL,
            Self::Predefined(_) => KIND_PREDEFINED,
            Self::Short(_) => KIND_SHORT,
        }
    }

    /// Bytes this filter occupies in a Subscribe/Unsubscribe frame.
    pub(crate) fn encoded_len(&self) -> usize {
        match self {
            Self::Name(name) => name.len(),
            Self::Predefined(_) | Self::Short(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_pending_only_valid_for_qos_minus_one() {
        let topic = TopicId::LongPending("sensors/remote/temp");
        assert_eq!(topic.wire_kind(QoS::Connectionless), Ok(KIND_NORMAL));
        assert_eq!(
            topic.wire_kind(QoS::AtLeastOnce),
            Err(Error::InvalidTopicIdType)
        );
    }

    #[test]
    fn id_field_per_variant() {
        assert_eq!(TopicId::Normal(0x1234).id_field(), [0x12, 0x34]);
        assert_eq!(TopicId::Predefined(7).id_field(), [0x00, 0x07]);
        assert_eq!(TopicId::Short(*b"ab").id_field(), [b'a', b'b']);
        assert_eq!(TopicId::LongPending("abc").id_field(), [0x00, 0x03]);
    }

    #[test]
    fn numeric_correlation_values() {
        assert_eq!(TopicId::Normal(9).numeric(), Some(9));
        assert_eq!(
            TopicId::Short(*b"ab").numeric(),
            Some(u16::from_be_bytes(*b"ab"))
        );
        assert_eq!(TopicId::LongPending("x/y").numeric(), None);
    }

}
