//! Channel abstraction: a symmetric `send`/`recv(timeout)` byte-pipe capability.
//!
//! The real acoustic modem is out of scope here (`spec.md` S1) — `LoopbackChannel`
//! is the in-memory stand-in every test drives, and `LossyChannel` wraps any
//! `Channel` to reproduce the modem's drop/corruption behavior for the property
//! tests in `spec.md` S8.

use std::sync::Mutex;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::RecvTimeout;
use crate::wire::TYPE_ACK;

/// Capability set `{send, recv}`. Both the acoustic modem and the lossy
/// simulator satisfy this; nothing upstream depends on which.
pub trait Channel: Send + Sync {
    fn send(&self, frame: Bytes);
    fn recv(&self, timeout: Duration) -> Result<Bytes, RecvTimeout>;
}

/// An in-memory full-duplex pipe backed by `crossbeam-channel`. `pair()` wires
/// up two endpoints whose forward and reverse directions cross over, so each
/// side's `send` lands in the other's `recv`.
#[derive(Clone)]
pub struct LoopbackChannel {
    tx: crossbeam_channel::Sender<Bytes>,
    rx: crossbeam_channel::Receiver<Bytes>,
}

impl LoopbackChannel {
    pub fn pair() -> (LoopbackChannel, LoopbackChannel) {
        let (tx_fwd, rx_fwd) = crossbeam_channel::unbounded();
        let (tx_rev, rx_rev) = crossbeam_channel::unbounded();
        (
            LoopbackChannel {
                tx: tx_fwd,
                rx: rx_rev,
            },
            LoopbackChannel {
                tx: tx_rev,
                rx: rx_fwd,
            },
        )
    }
}

impl Channel for LoopbackChannel {
    fn send(&self, frame: Bytes) {
        // The peer may already be gone in a one-shot test; that's not this
        // side's problem to report.
        let _ = self.tx.send(frame);
    }

    fn recv(&self, timeout: Duration) -> Result<Bytes, RecvTimeout> {
        self.rx.recv_timeout(timeout).map_err(|_| RecvTimeout)
    }
}

/// Wraps any `Channel` and, on every `send`, independently decides to drop the
/// frame, corrupt one byte of it, or deliver it untouched. Drop/corrupt
/// probabilities differ by direction, determined by the frame's type byte
/// (`spec.md` S4.2) rather than by which endpoint is sending.
pub struct LossyChannel<C> {
    inner: C,
    config: crate::config::LossConfig,
    rng: Mutex<StdRng>,
}

impl<C: Channel + Clone + 'static> LossyChannel<C> {
    pub fn new(inner: C, config: crate::config::LossConfig, seed: u64) -> Self {
        Self {
            inner,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<C: Channel + Clone + 'static> Channel for LossyChannel<C> {
    fn send(&self, frame: Bytes) {
        let is_ack = frame.first().copied() == Some(TYPE_ACK);
        let (drop_p, corrupt_p) = if is_ack {
            (self.config.drop_ack, self.config.corrupt_ack)
        } else {
            (self.config.drop_data, self.config.corrupt_data)
        };

        let mut rng = self.rng.lock().expect("channel rng poisoned");

        if drop_p > 0.0 && rng.random_bool(drop_p.clamp(0.0, 1.0)) {
            tracing::debug!(is_ack, "lossy channel dropped frame");
            return;
        }

        let frame = if !frame.is_empty() && corrupt_p > 0.0 && rng.random_bool(corrupt_p.clamp(0.0, 1.0)) {
            let mut buf = BytesMut::from(&frame[..]);
            let idx = rng.random_range(0..buf.len());
            let mut flip = rng.random::<u8>();
            if flip == 0 {
                flip = 1;
            }
            buf[idx] ^= flip;
            tracing::debug!(is_ack, idx, "lossy channel corrupted frame");
            buf.freeze()
        } else {
            frame
        };

        drop(rng);

        let latency = self.config.latency;
        if latency.is_zero() {
            self.inner.send(frame);
        } else {
            let inner = self.inner.clone();
            std::thread::spawn(move || {
                std::thread::sleep(latency);
                inner.send(frame);
            });
        }
    }

    fn recv(&self, timeout: Duration) -> Result<Bytes, RecvTimeout> {
        self.inner.recv(timeout)
    }
}
