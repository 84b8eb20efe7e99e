//! Stop-and-Wait: window size 1, sender waits for each ACK before advancing.
//!
//! `spec.md` S4.3/S4.4.

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

    /// Send one message to completion (or exhaustion of `max_retries`),
    /// blocking the calling thread for the duration of the transfer.
    pub fn send_message(&self, msg_id: u8, payload: &[u8]) -> Result<SendOutcome, SendError> {
        self.config.validate()?;
        let fragments = wire::fragment(payload, self.config.max_payload)?;
        let total = fragments.len() as u8;
        let start = self.clock.now();
        let mut retries_total: u32 = 0;

        for (seq, _total, chunk) in fragments {
            let mut retries_this_seq: u32 = 0;
            loop {
                let frame = Frame::encode_data(msg_id, seq, total, &chunk);
                self.channel.send(frame);

                let mut timer = RetransmitTimer::new();
                timer.arm(self.clock, self.config.timeout);

                let acked = self.wait_for_ack(msg_id, seq, &mut timer);
                if acked {
                    break;
                }

                tracing::debug!(msg_id, seq, retries_this_seq, "stop-and-wait retransmit timeout");

                if retries_this_seq == self.config.max_retries {
                    return Ok(SendOutcome::unreachable(
                        retries_total,
                        self.clock.now().duration_since(start),
                    ));
                }
                retries_this_seq += 1;
                retries_total += 1;
            }
        }

        Ok(SendOutcome::success(
            retries_total,
            self.clock.now().duration_since(start),
        ))
    }

    /// Block until the matching ACK arrives or the timer expires.
    fn wait_for_ack(&self, msg_id: u8, seq: u8, timer: &mut RetransmitTimer) -> bool {
        loop {
            let remaining = timer.remaining(self.clock);
            if remaining.is_zero() {
                return false;
            }
            match self.channel.recv(remaining) {
                Ok(bytes) => match Frame::parse(&bytes) {
                    Ok(Frame::Ack {
                        msg_id: m,
                        seq: s,
                    }) if m == msg_id && s == seq => {
                        timer.cancel();
                        return true;
                    }
                    Ok(_) => continue, // stale ack, or a DATA frame arriving out of turn
                    Err(FrameError::ProtocolViolation { seq, total }) => {
                        tracing::warn!(seq, total, "stop-and-wait sender saw a protocol violation");
                        continue;
                    }
                    Err(err) => {
                        tracing::trace!(?err, "stop-and-wait sender dropped unparseable frame");
                        continue;
                    }
                },
                Err(_timeout) => continue, // loop re-checks `remaining`, which will now be zero
            }
        }
    }
}

pub enum Event {
    /// Re-send the ACK for a duplicate, or acknowledge a newly accepted fragment.
    Ack(Bytes),
    /// The final fragment of a message was just accepted; `ack` must still be sent.
    Deliver { ack: Bytes, payload: Bytes },
    /// Nothing to do: parse failure, stale/irrelevant frame, or an ACK (wrong role).
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

    /// Feed one raw frame through the receiver state machine. `spec.md` S4.4.
    pub fn on_frame(&mut self, bytes: &[u8]) -> Event {
        let frame = match Frame::parse(bytes) {
            Ok(f) => f,
            Err(FrameError::ProtocolViolation { seq, total }) => {
                tracing::warn!(seq, total, "stop-and-wait receiver saw a protocol violation");
                return Event::None;
            }
            Err(err) => {
                tracing::trace!(?err, "stop-and-wait receiver dropped unparseable frame");
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
            let ack = Frame::encode_ack(msg_id, seq);
            if self.buffer.is_complete() {
                let payload = self.buffer.finish();
                self.msg_id = None;
                Event::Deliver { ack, payload }
            } else {
                Event::Ack(ack)
            }
        } else if seq < expected {
            // Duplicate: our prior ACK was lost. Re-send it, discard the payload.
            Event::Ack(Frame::encode_ack(msg_id, seq))
        } else {
            // seq > expected: not producible by a well-behaved Stop-and-Wait
            // peer. Defensive drop, matching `spec.md`'s ProtocolViolation handling.
            tracing::warn!(msg_id, seq, expected, "stop-and-wait receiver saw seq ahead of window");
            Event::None
        }
    }

    /// Drive the receiver state machine, blocking until one full message is
    /// reassembled or an optional caller deadline elapses.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    // ─── Receiver state machine ─────────────────────────────────

    #[test]
    fn accepts_in_order_fragment_and_acks() {
        let mut rx = Receiver::new();
        let frame = Frame::encode_data(1, 0, 2, b"ab");
        match rx.on_frame(&frame) {
            Event::Ack(ack) => assert_eq!(Frame::parse(&ack).unwrap(), Frame::Ack { msg_id: 1, seq: 0 }),
            _ => panic!("expected Ack"),
        }
    }

    #[test]
    fn delivers_on_final_fragment() {
        let mut rx = Receiver::new();
        rx.on_frame(&Frame::encode_data(1, 0, 2, b"ab"));
        match rx.on_frame(&Frame::encode_data(1, 1, 2, b"cd")) {
            Event::Deliver { payload, .. } => assert_eq!(payload, Bytes::from_static(b"abcd")),
            _ => panic!("expected Deliver"),
        }
    }

    #[test]
    fn duplicate_fragment_reacks_without_reaccepting() {
        let mut rx = Receiver::new();
        rx.on_frame(&Frame::encode_data(1, 0, 2, b"ab"));
        match rx.on_frame(&Frame::encode_data(1, 0, 2, b"ab")) {
            Event::Ack(ack) => assert_eq!(Frame::parse(&ack).unwrap(), Frame::Ack { msg_id: 1, seq: 0 }),
            _ => panic!("expected re-Ack of duplicate"),
        }
        assert_eq!(rx.buffer.expected_seq(), 1);
    }

    #[test]
    fn seq_ahead_of_window_is_dropped() {
        let mut rx = Receiver::new();
        // expected_seq starts at 0; seq=1 is ahead.
        assert!(matches!(
            rx.on_frame(&Frame::encode_data(1, 1, 3, b"x")),
            Event::None
        ));
    }

    #[test]
    fn garbage_bytes_are_dropped_silently() {
        let mut rx = Receiver::new();
        assert!(matches!(rx.on_frame(&[0xFF, 0xFF]), Event::None));
    }

    #[test]
    fn new_msg_id_resets_expected_seq() {
        let mut rx = Receiver::new();
        rx.on_frame(&Frame::encode_data(1, 0, 2, b"ab"));
        match rx.on_frame(&Frame::encode_data(2, 0, 1, b"z")) {
            Event::Deliver { payload, .. } => assert_eq!(payload, Bytes::from_static(b"z")),
            _ => panic!("expected fresh message to be accepted"),
        }
    }

    // ─── End-to-end single-threaded drive ───────────────────────

    #[test]
    fn e1_lossless_channel_delivers_with_zero_retries() {
        let (a, b) = crate::channel::LoopbackChannel::pair();
        let clock = SystemClock;
        let config = TransportConfig::default().with_max_payload(4);
        let sender = Sender::new(&a, &clock, config);

        let handle = std::thread::spawn(move || {
            let mut rx = Receiver::new();
            rx.recv_message(&b, &SystemClock, Duration::from_millis(50), None)
        });

        let outcome = sender.send_message(0, b"abcdefghij").unwrap();
        assert!(outcome.ok);
        assert_eq!(outcome.retries, 0);

        let delivered = handle.join().unwrap().unwrap();
        assert_eq!(delivered, Bytes::from_static(b"abcdefghij"));
    }

    #[test]
    fn e6_unreachable_after_max_retries_when_data_always_dropped() {
        use crate::config::LossConfig;

        let (a, _b) = crate::channel::LoopbackChannel::pair();
        let lossy = crate::channel::LossyChannel::new(a, LossConfig::default().with_drop_data(1.0), 42);
        let clock = SystemClock;
        let config = TransportConfig::default()
            .with_max_retries(2)
            .with_timeout(Duration::from_millis(5));
        let sender = Sender::new(&lossy, &clock, config);

        let outcome = sender.send_message(0, b"!").unwrap();
        assert!(!outcome.ok);
        assert_eq!(outcome.retries, 2);
    }
}
