//! Frame encoding, parsing, fragmentation, and reassembly.
//!
//! Wire format (byte-exact, big-endian CRC):
//!
//! ```text
//! DATA: 0x01 | msg_id:u8 | seq:u8 | total:u8 | plen:u8 | payload[plen] | crc:u16
//! ACK:  0x02 | msg_id:u8 | seq:u8 | crc:u16
//! ```
//!
//! The CRC covers every preceding byte of the frame, including the type byte.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::FrameError;

pub const TYPE_DATA: u8 = 0x01;
pub const TYPE_ACK: u8 = 0x02;

const DATA_HEADER_LEN: usize = 5; // type, msg_id, seq, total, plen
const ACK_LEN: usize = 5; // type, msg_id, seq, crc(2)
const CRC_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data {
        msg_id: u8,
        seq: u8,
        total: u8,
        payload: Bytes,
    },
    Ack {
        msg_id: u8,
        seq: u8,
    },
}

impl Frame {
    /// Type byte identifying this frame, used by `LossyChannel` to pick
    /// per-direction drop/corrupt probabilities without a full parse.
    pub fn type_byte(&self) -> u8 {
        match self {
            Frame::Data { .. } => TYPE_DATA,
            Frame::Ack { .. } => TYPE_ACK,
        }
    }

    pub fn encode_data(msg_id: u8, seq: u8, total: u8, payload: &[u8]) -> Bytes {
        debug_assert!(payload.len() <= u8::MAX as usize);
        let mut buf = BytesMut::with_capacity(DATA_HEADER_LEN + payload.len() + CRC_LEN);
        buf.put_u8(TYPE_DATA);
        buf.put_u8(msg_id);
        buf.put_u8(seq);
        buf.put_u8(total);
        buf.put_u8(payload.len() as u8);
        buf.put_slice(payload);
        let crc = crc16(&buf);
        buf.put_u16(crc);
        buf.freeze()
    }

    pub fn encode_ack(msg_id: u8, seq: u8) -> Bytes {
        let mut buf = BytesMut::with_capacity(ACK_LEN);
        buf.put_u8(TYPE_ACK);
        buf.put_u8(msg_id);
        buf.put_u8(seq);
        let crc = crc16(&buf);
        buf.put_u16(crc);
        buf.freeze()
    }

    /// Validate length, type byte, and CRC, then decode. A frame failing any
    /// check is "as if it had never arrived" — callers are expected to treat
    /// the `Err` as silence, except `ProtocolViolation` which is worth logging.
    pub fn parse(bytes: &[u8]) -> Result<Frame, FrameError> {
        if bytes.len() < ACK_LEN {
            return Err(FrameError::TooShort);
        }
        let type_byte = bytes[0];
        match type_byte {
            TYPE_ACK => {
                if bytes.len() != ACK_LEN {
                    return Err(FrameError::TruncatedPayload);
                }
                let body = &bytes[..ACK_LEN - CRC_LEN];
                let expected = u16::from_be_bytes([bytes[ACK_LEN - CRC_LEN], bytes[ACK_LEN - CRC_LEN + 1]]);
                let computed = crc16(body);
                if expected != computed {
                    return Err(FrameError::BadCrc { expected, computed });
                }
                let mut cursor = body;
                cursor.advance(1); // type byte, already matched
                let msg_id = cursor.get_u8();
                let seq = cursor.get_u8();
                Ok(Frame::Ack { msg_id, seq })
            }
            TYPE_DATA => {
                if bytes.len() < DATA_HEADER_LEN + CRC_LEN {
                    return Err(FrameError::TooShort);
                }
                let plen = bytes[4] as usize;
                let expected_len = DATA_HEADER_LEN + plen + CRC_LEN;
                if bytes.len() != expected_len {
                    return Err(FrameError::TruncatedPayload);
                }
                let body = &bytes[..expected_len - CRC_LEN];
                let crc_off = expected_len - CRC_LEN;
                let expected = u16::from_be_bytes([bytes[crc_off], bytes[crc_off + 1]]);
                let computed = crc16(body);
                if expected != computed {
                    return Err(FrameError::BadCrc { expected, computed });
                }
                let mut cursor = body;
                cursor.advance(1);
                let msg_id = cursor.get_u8();
                let seq = cursor.get_u8();
                let total = cursor.get_u8();
                let _plen = cursor.get_u8();
                let payload = Bytes::copy_from_slice(cursor);
                if seq >= total {
                    return Err(FrameError::ProtocolViolation { seq, total });
                }
                Ok(Frame::Data {
                    msg_id,
                    seq,
                    total,
                    payload,
                })
            }
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// Split `payload` into `ceil(len / max_payload)` ordered `(seq, total, chunk)`
/// fragments, the last possibly shorter. An empty payload still produces a
/// single zero-length fragment (`total == 1`) so every message has at least
/// one frame to acknowledge.
pub fn fragment(
    payload: &[u8],
    max_payload: usize,
) -> Result<Vec<(u8, u8, Bytes)>, crate::error::SendError> {
    if max_payload == 0 || max_payload > 250 {
        return Err(crate::error::SendError::InvalidMaxPayload(max_payload));
    }
    let max_total = 255usize * max_payload;
    if payload.len() > max_total {
        return Err(crate::error::SendError::Oversize {
            len: payload.len(),
            max: max_total,
        });
    }

    let total = if payload.is_empty() {
        1
    } else {
        payload.len().div_ceil(max_payload)
    } as u8;

    let mut out = Vec::with_capacity(total as usize);
    for seq in 0..total {
        let start = seq as usize * max_payload;
        let end = (start + max_payload).min(payload.len());
        out.push((seq, total, Bytes::copy_from_slice(&payload[start..end])));
    }
    Ok(out)
}

/// Concatenate `total` fragments, in order, from the in-order parts accumulated
/// so far. See `reassembly::ReassemblyBuffer`, which owns the actual storage;
/// this free function is the pure concatenation step it calls internally.
pub fn reassemble(parts: &[Bytes]) -> Bytes {
    let mut out = BytesMut::with_capacity(parts.iter().map(|p| p.len()).sum());
    for p in parts {
        out.extend_from_slice(p);
    }
    out.freeze()
}
