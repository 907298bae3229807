// Copyright (c) 2026 the rocket-controller contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Frames and unframes the length-prefixed typed messages validators
//! exchange on their peer-to-peer protocol.
//!
//! The codec is pure: no I/O, no state, just `{ type_u16, length_u32,
//! payload_bytes } <-> (type_id, DecodedMessage)`. It is still expressed
//! against `tokio_util::codec::{Encoder, Decoder}`, even though the
//! controller never drives it with a live `Framed` stream -- every call
//! site hands it one already-buffered message at a time.

use crate::error::ControllerError;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

/// The validator peer protocol's status-change message type id. `newEvent
/// == 1` denotes "accepted ledger" -- the only event the
/// [`crate::iteration::IterationController`] cares about.
pub const STATUS_CHANGE_TYPE: u16 = 34;

/// Recognised status-change payload, decoded eagerly because the iteration
/// controller needs its fields. All other type ids are passed through
/// opaque.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TmStatusChange {
    pub new_status: i32,
    pub new_event: i32,
    pub ledger_seq: u32,
    pub ledger_hash: Vec<u8>,
    pub ledger_hash_previous: Vec<u8>,
    pub network_time: u64,
    pub first_seq: u32,
    pub last_seq: u32,
}

impl TmStatusChange {
    /// Whether this event denotes a newly accepted ledger.
    pub fn is_accepted_ledger(&self) -> bool {
        self.new_event == 1
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DecodedMessage {
    StatusChange(TmStatusChange),
    /// An opaque message of a type the controller does not interpret.
    Opaque(Bytes),
}

impl DecodedMessage {
    pub fn as_bytes(&self) -> Bytes {
        match self {
            DecodedMessage::StatusChange(status) => {
                Bytes::from(bincode::serialize(status).expect("TmStatusChange always serializes"))
            }
            DecodedMessage::Opaque(bytes) => bytes.clone(),
        }
    }
}

/// The wire framing of a single peer-protocol message.
#[derive(Default, Clone, Copy)]
pub struct PeerCodec;

impl Decoder for PeerCodec {
    type Item = (u16, DecodedMessage);
    type Error = ControllerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // type_u16 (2) + length_u32 (4) is the minimum header size.
        if src.len() < 6 {
            return Ok(None);
        }

        let mut header = &src[..6];
        let type_id = header.get_u16();
        let length = header.get_u32() as usize;

        if src.len() < 6 + length {
            // Not enough data buffered yet for the full payload.
            return Ok(None);
        }

        src.advance(6);
        let payload = src.split_to(length).freeze();

        let message = if type_id == STATUS_CHANGE_TYPE {
            match bincode::deserialize::<TmStatusChange>(&payload) {
                Ok(status) => DecodedMessage::StatusChange(status),
                Err(error) => return Err(ControllerError::Codec(error.to_string())),
            }
        } else {
            DecodedMessage::Opaque(payload)
        };

        Ok(Some((type_id, message)))
    }
}

impl Encoder<(u16, Bytes)> for PeerCodec {
    type Error = ControllerError;

    fn encode(&mut self, (type_id, payload): (u16, Bytes), dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(6 + payload.len());
        dst.put_u16(type_id);
        dst.put_u32(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}

/// Decodes a single already-buffered peer message, per the controller's
/// contract: `decode(raw) -> (type_id, message)`.
pub fn decode(raw: &[u8]) -> Result<(u16, DecodedMessage), ControllerError> {
    let mut buf = BytesMut::from(raw);
    match PeerCodec.decode(&mut buf)? {
        Some(decoded) => Ok(decoded),
        None => Err(ControllerError::Codec(format!("truncated frame ({} bytes)", raw.len()))),
    }
}

/// Encodes a message back into its wire form, per the controller's
/// contract: `encode(message, type_id) -> bytes`.
pub fn encode(type_id: u16, payload: impl Into<Bytes>) -> Vec<u8> {
    let mut buf = BytesMut::new();
    // Infallible for well-formed payloads; `Encoder::encode` only errors on
    // buffer growth failures, which `reserve` above already prevents.
    PeerCodec.encode((type_id, payload.into()), &mut buf).expect("encoding a frame cannot fail");
    buf.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_status() -> TmStatusChange {
        TmStatusChange {
            new_status: 2,
            new_event: 1,
            ledger_seq: 3,
            ledger_hash: b"abcdef".to_vec(),
            ledger_hash_previous: b"123456".to_vec(),
            network_time: 1000,
            first_seq: 0,
            last_seq: 2,
        }
    }

    #[test]
    fn round_trips_a_status_change() {
        let status = sample_status();
        let payload = bincode::serialize(&status).unwrap();
        let raw = encode(STATUS_CHANGE_TYPE, payload);

        let (type_id, message) = decode(&raw).unwrap();
        assert_eq!(type_id, STATUS_CHANGE_TYPE);
        match message {
            DecodedMessage::StatusChange(decoded) => assert_eq!(decoded, status),
            DecodedMessage::Opaque(_) => panic!("expected a decoded status change"),
        }
    }

    #[test]
    fn unknown_types_pass_through_opaque() {
        let raw = encode(60, b"arbitrary-ping-payload".to_vec());
        let (type_id, message) = decode(&raw).unwrap();
        assert_eq!(type_id, 60);
        match message {
            DecodedMessage::Opaque(bytes) => assert_eq!(&bytes[..], b"arbitrary-ping-payload"),
            DecodedMessage::StatusChange(_) => panic!("type 60 must not be decoded as status change"),
        }
    }

    #[test]
    fn truncated_frame_is_a_codec_error() {
        let err = decode(&[0, 34, 0, 0, 0, 10, 1, 2]).unwrap_err();
        assert!(matches!(err, ControllerError::Codec(_)));
    }
}
