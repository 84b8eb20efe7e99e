//! Error taxonomy for framing, sending, and receiving.
//!
//! `FrameError` covers everything local to decoding a single frame: malformed
//! bytes, a CRC mismatch, or a frame shape that a correctly-behaving peer could
//! never produce. None of these ever escape the transport — callers treat them
//! as "this frame did not arrive" and log at most.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame shorter than the minimum header size")]
    TooShort,
    #[error("unknown frame type byte {0:#04x}")]
    UnknownType(u8),
    #[error("declared payload length does not match the bytes available")]
    TruncatedPayload,
    #[error("crc mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    BadCrc { expected: u16, computed: u16 },
    #[error("protocol violation: seq {seq} >= total {total}")]
    ProtocolViolation { seq: u8, total: u8 },
}

/// Returned by a `Channel::recv` that waited its full timeout with nothing to show.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("channel receive timed out")]
pub struct RecvTimeout;

/// Pre-send validation failure. Surfaced to the caller before any frame is
/// produced, per the "reject at the sender" resolution for oversize messages
/// and degenerate fragment sizes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("payload of {len} bytes exceeds the maximum of {max} bytes (255 x max_payload)")]
    Oversize { len: usize, max: usize },
    #[error("max_payload must be in 1..=250, got {0}")]
    InvalidMaxPayload(usize),
    #[error("window must be in 1..=127, got {0}")]
    InvalidWindow(u8),
}

/// Returned by `recv_message` when a caller-supplied deadline elapses before a
/// full message is reassembled. The core receiver state machine has no deadline
/// of its own (`spec.md` S5): this is purely the caller's opt-in ceiling.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("recv_message deadline elapsed before a message completed")]
pub struct ReceiveTimeout;
