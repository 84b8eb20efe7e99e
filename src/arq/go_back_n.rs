//! Go-Back-N: windowed ARQ, cumulative ACKs, full-window retransmit on loss.
//!
//! `spec.md` S4.5/S4.6.

use std::time::Duration;

use bytes::Bytes;

use crate::channel::Channel;
use crate::clock::{Clock, RetransmitTimer};
use crate::config::TransportConfig;
use crate::error::{FrameError, ReceiveTimeout, SendError};
use crate::reassembly::ReassemblyBuffer;
use crate::stats::SendOutcome;
use crate::wire::{self, Frame};

pub struct Sender<'a> {
    channel: &'a dyn Channel,
    clock: &'a dyn Clock,
    config: TransportConfig,
}

impl<'a> Sender<'a> {
    pub fn new(channel: &'a dyn Channel, clock: &'a dyn Clock, config: TransportConfig) -> Self {
        Self {
            channel,
            clock,
            config,
        }
    }

    pub fn send_message(&self, msg_id: u8, payload: &[u8]) -> Result<SendOutcome, SendError> {
        self.config.validate()?;
        let fragments = wire::fragment(payload, self.config.max_payload)?;
        let total = fragments.len() as u8;
        let window = self.config.window;
        let start = self.clock.now();

        let send_frame = |seq: u8| {
            let (_, _, chunk) = &fragments[seq as usize];
            self.channel
                .send(Frame::encode_data(msg_id, seq, total, chunk));
        };

        let mut base: u8 = 0;
        let mut next_seq: u8 = 0;
        let mut retries: u32 = 0;
        let mut timer = RetransmitTimer::new();

        // Fill the window up to capacity. Arms the timer exactly when a frame
        // is sent into a window that was previously empty (`base == next_seq`
        // "before the increment"), per `spec.md` S4.5.
        let fill_window = |base: u8, next_seq: &mut u8, timer: &mut RetransmitTimer| {
            while *next_seq < total && *next_seq - base < window {
                if base == *next_seq {
                    timer.arm(self.clock, self.config.timeout);
                }
                send_frame(*next_seq);
                *next_seq += 1;
            }
        };

        fill_window(base, &mut next_seq, &mut timer);

        while base < total {
            let remaining = timer.remaining(self.clock);
            match self.channel.recv(remaining.max(Duration::from_micros(1))) {
                Ok(bytes) => match Frame::parse(&bytes) {
                    Ok(Frame::Ack { msg_id: m, seq: k }) if m == msg_id && k >= base => {
                        // Cumulative: everything up to and including k is received.
                        base = k + 1;
                        if base == next_seq {
                            timer.cancel();
                        } else {
                            timer.arm(self.clock, self.config.timeout);
                        }
                        fill_window(base, &mut next_seq, &mut timer);
                    }
                    Ok(_) => {} // stale ack, wrong msg_id, or a DATA frame arriving out of turn
                    Err(FrameError::ProtocolViolation { seq, total }) => {
                        tracing::warn!(msg_id, seq, total, "go-back-n sender saw a protocol violation");
                    }
                    Err(err) => {
                        tracing::trace!(?err, "go-back-n sender dropped unparseable frame");
                    }
                },
                Err(_timeout) => {
                    if !timer.expired(self.clock) {
                        continue; // spurious wakeup; loop re-evaluates `remaining`
                    }
                    tracing::debug!(msg_id, base, next_seq, retries, "go-back-n retransmit timeout");
                    if retries == self.config.max_retries {
                        return Ok(SendOutcome::unreachable(
                            retries,
                            self.clock.now().duration_since(start),
                        ));
                    }
                    retries += 1;
                    for seq in base..next_seq {
                        send_frame(seq);
                    }
                    timer.arm(self.clock, self.config.timeout);
                }
            }
        }

        Ok(SendOutcome::success(
            retries,
            self.clock.now().duration_since(start),
        ))
    }
}

pub enum Event {
    Ack(Bytes),
    Deliver { ack: Bytes, payload: Bytes },
    None,
}

#[derive(Default)]
pub struct Receiver {
    msg_id: Option<u8>,
    buffer: ReassemblyBuffer,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `spec.md` S4.6.
    pub fn on_frame(&mut self, bytes: &[u8]) -> Event {
        let frame = match Frame::parse(bytes) {
            Ok(f) => f,
            Err(FrameError::ProtocolViolation { seq, total }) => {
                tracing::warn!(seq, total, "go-back-n receiver saw a protocol violation");
                return Event::None;
            }
            Err(err) => {
                tracing::trace!(?err, "go-back-n receiver dropped unparseable frame");
                return Event::None;
            }
        };
        let (msg_id, seq, total, payload) = match frame {
            Frame::Data {
                msg_id,
                seq,
                total,
                payload,
            } => (msg_id, seq, total, payload),
            Frame::Ack { .. } => return Event::None,
        };

        if self.msg_id != Some(msg_id) {
            self.msg_id = Some(msg_id);
            self.buffer.begin(msg_id, total);
        }

        let expected = self.buffer.expected_seq();
        if seq == expected {
            self.buffer.push(payload);
            let new_expected = self.buffer.expected_seq();
            let ack = Frame::encode_ack(msg_id, new_expected - 1);
            if self.buffer.is_complete() {
                let payload = self.buffer.finish();
                self.msg_id = None;
                Event::Deliver { ack, payload }
            } else {
                Event::Ack(ack)
            }
        } else if expected > 0 {
            // Duplicate or ahead of window: re-assert the cumulative ACK so
            // the sender's `base` advances as fast as possible.
            Event::Ack(Frame::encode_ack(msg_id, expected - 1))
        } else {
            Event::None
        }
    }

    pub fn recv_message(
        &mut self,
        channel: &dyn Channel,
        clock: &dyn Clock,
        poll_timeout: Duration,
        deadline: Option<quanta::Instant>,
    ) -> Result<Bytes, ReceiveTimeout> {
        loop {
            if let Some(deadline) = deadline {
                if clock.now() >= deadline {
                    return Err(ReceiveTimeout);
                }
            }
            match channel.recv(poll_timeout) {
                Ok(bytes) => match self.on_frame(&bytes) {
                    Event::Ack(ack) => channel.send(ack),
                    Event::Deliver { ack, payload } => {
                        channel.send(ack);
                        return Ok(payload);
                    }
                    Event::None => {}
                },
                Err(_timeout) => continue,
            }
        }
    }
}
