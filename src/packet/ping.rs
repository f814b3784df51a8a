//! PingReq and PingResp messages

use crate::error::Error;
use crate::packet::{MsgType, check_frame, frame_len, start_frame};

/// A PingReq message.
///
/// An empty client id is an ordinary keep-alive probe. A sleeping client
/// includes its client id to ask the gateway for any messages buffered while
/// it slept; the gateway then delivers them and finishes with PingResp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingReq<'a> {
    pub client_id: &'a str,
}

impl<'a> PingReq<'a> {
    pub fn len(&self) -> usize {
        1 + self.client_id.len()
    }

    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let body = self.len();
        let at = start_frame(buf, body, MsgType::PingReq)?;
        buf[at..at + self.client_id.len()].copy_from_slice(self.client_id.as_bytes());
        Ok(frame_len(body))
    }

    pub fn decode(frame: &'a [u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::PingReq)?;
        let client_id = core::str::from_utf8(body).map_err(|_| Error::Malformed)?;
        Ok(Self { client_id })
    }
}

/// A PingResp message, two bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResp;

impl PingResp {
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        start_frame(buf, 1, MsgType::PingResp)?;
        Ok(frame_len(1))
    }

    pub fn decode(frame: &[u8]) -> Result<Self, Error> {
        let body = check_frame(frame, MsgType::PingResp)?;
        if !body.is_empty() {
            return Err(Error::Malformed);
        }
        Ok(Self)
    }
}
