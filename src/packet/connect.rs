//! Connect, ConnAck and Disconnect messages

use crate::error::Error;
use crate::packet::{
    Flags, MsgType, ReturnCode, check_frame, frame_len, get_u16, put_u16, start_frame,
};

/// Protocol id carried in every Connect frame; 0x01 is MQTT-SN.
const PROTOCOL_ID: u8 = 0x01;

/// A Connect request.
///
/// `duration` is the keep-alive interval in seconds. When `will` is set the
/// gateway answers with WillTopicReq instead of ConnAck and prompts the
/// client through the will handshake before completing the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connect<'a> {
    pub will: bool,
    pub clean_session: bool,
    pub duration: u16,
    pub client_id: &'a str,
}

impl<'a> Connect<'a> {
    /// Exact body length of the encoded frame (type byte and fields).
    pub fn len(&self) -> usize {
        5 + self.client_id.len()
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = self.len();
        let mut at = start_frame(buf, body, MsgType::Connect)?;
        buf[at] = Flags {
            will: self.will,
            clean_session: self.clean_session,
            ..Flags::default()
        }
        .byte();
        buf[at + 1] = PROTOCOL_ID;
        put_u16(buf, at + 2, self.duration);
        at += 4;
        buf[at..at + self.client_id.len()].copy_from_slice(self.client_id.as_bytes());
        Ok(frame_len(body))
    }

    /// Parse a received Connect frame.
    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::Connect)?;
        if body.len() < 4 {
            return Err(Error::Malformed);
        }
        let flags = Flags::from_byte(body[0]);
        if body[1] != PROTOCOL_ID {
            return Err(Error::Malformed);
        }
        let client_id = core::str::from_utf8(&body[4..]).map_err(|_| Error::Malformed)?;
        Ok(Self {
            will: flags.will,
            clean_session: flags.clean_session,
            duration: get_u16(body, 2),
            client_id,
        })
    }
}

/// A ConnAck reply carrying the gateway's verdict on a Connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnAck {
    pub code: ReturnCode,
}

impl ConnAck {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let at = start_frame(buf, 2, MsgType::ConnAck)?;
        buf[at] = self.code as u8;
        Ok(frame_len(2))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::ConnAck)?;
        if body.len() != 1 {
            return Err(Error::Malformed);
        }
        Ok(Self {
            code: ReturnCode::from_byte(body[0])?,
        })
    }
}

/// A Disconnect message.
///
/// Sent without a duration it ends the session; with a duration it asks the
/// gateway to treat the client as sleeping for that many seconds, buffering
/// messages until the client pings for them. The gateway confirms either
/// form with a Disconnect of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnect {
    pub duration: Option<u16>,
}

impl Disconnect {
    pub fn len(&self) -> usize {
        match self.duration {
            Some(_) => 3,
            None => 1,
        }
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = self.len();
        let at = start_frame(buf, body, MsgType::Disconnect)?;
        if let Some(duration) = self.duration {
            put_u16(buf, at, duration);
        }
        Ok(frame_len(body))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::Disconnect)?;
        let duration = match body.len() {
            0 => None,
            2 => Some(get_u16(body, 0)),
            _ => return Err(Error::Malformed),
        };
        Ok(Self { duration })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_layout() {
        let msg = Connect {
            will: false,
            clean_session: true,
            duration: 20,
            client_id: "c1",
        };
        let mut buf = [0u8; 16];
        let n = msg.encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x08, 0x04, 0x04, 0x01, 0x00, 0x14, b'c', b'1']);
        assert_eq!(Connect::decode(&buf[..n]).unwrap(), msg);
    }

    #[test]
    fn connect_with_will_sets_flag_bit() {
        let msg = Connect {
            will: true,
            clean_session: false,
            duration: 60,
            client_id: "node",
        };
        let mut buf = [0u8; 16];
        let n = msg.encode(&mut buf).unwrap();
        assert_eq!(buf[2], 0x08);
        assert_eq!(Connect::decode(&buf[..n]).unwrap(), msg);
    }

    #[test]
    fn connect_client_id_boundaries() {
        for id in ["", "abcdefghijklmnopqrstuvw"] {
            let msg = Connect {
                will: false,
                clean_session: true,
                duration: 0,
                client_id: id,
            };
            let mut buf = [0u8; 32];
            let n = msg.encode(&mut buf).unwrap();
            assert_eq!(n, 6 + id.len());
            assert_eq!(Connect::decode(&buf[..n]).unwrap().client_id, id);
        }
    }

    #[test]
    fn connect_buffer_one_byte_short() {
        let msg = Connect {
            will: false,
            clean_session: true,
            duration: 20,
            client_id: "c1",
        };
        let mut buf = [0u8; 7];
        assert_eq!(msg.encode(&mut buf), Err(Error::BufferTooShort));
        assert_eq!(buf, [0u8; 7]);
    }

    #[test]
    fn connect_rejects_wrong_protocol_id() {
        let frame = [0x07, 0x04, 0x00, 0x02, 0x00, 0x0A, b'x'];
        assert_eq!(Connect::decode(&frame), Err(Error::Malformed));
    }

    #[test]
    fn connack_accepted_and_rejected() {
        let frame = [0x03, 0x05, 0x00];
        assert_eq!(
            ConnAck::decode(&frame).unwrap().code,
            ReturnCode::Accepted
        );
        let frame = [0x03, 0x05, 0x03];
        assert_eq!(
            ConnAck::decode(&frame).unwrap().code,
            ReturnCode::RejectedNotSupported
        );
        let frame = [0x03, 0x05, 0x07];
        assert_eq!(ConnAck::decode(&frame), Err(Error::Malformed));
    }

    #[test]
    fn connack_wrong_type_byte() {
        let frame = [0x03, 0x0B, 0x00];
        assert_eq!(ConnAck::decode(&frame), Err(Error::WrongMessageType));
    }

    #[test]
    fn disconnect_with_and_without_duration() {
        let mut buf = [0u8; 8];
        let n = Disconnect { duration: None }.encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x02, 0x18]);
        assert_eq!(Disconnect::decode(&buf[..n]).unwrap().duration, None);

        let n = Disconnect {
            duration: Some(300),
        }
        .encode(&mut buf)
        .unwrap();
        assert_eq!(&buf[..n], &[0x04, 0x18, 0x01, 0x2C]);
        assert_eq!(Disconnect::decode(&buf[..n]).unwrap().duration, Some(300));
    }

}
