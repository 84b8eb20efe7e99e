//! Configuration knobs, mirroring the teacher's `SenderConfig`/`ReceiverConfig`
//! shape: a plain struct, a `Default` impl carrying the spec's defaults, and
//! validation that rejects out-of-range values before any frame is built.

use std::time::Duration;

use crate::error::SendError;

/// Options shared by both ARQ protocols. `window` is ignored by Stop-and-Wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportConfig {
    /// Bytes per fragment. Range 1..=250.
    pub max_payload: usize,
    /// Retransmission timeout.
    pub timeout: Duration,
    /// Go-Back-N window size. Range 1..=127. Unused by Stop-and-Wait.
    pub window: u8,
    /// Retransmissions allowed before a send fails as `Unreachable`.
    pub max_retries: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload: 32,
            timeout: Duration::from_millis(200),
            window: 4,
            max_retries: 20,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<(), SendError> {
        if self.max_payload == 0 || self.max_payload > 250 {
            return Err(SendError::InvalidMaxPayload(self.max_payload));
        }
        if self.window == 0 || self.window > 127 {
            return Err(SendError::InvalidWindow(self.window));
        }
        Ok(())
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_window(mut self, window: u8) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Independent per-direction drop/corrupt probabilities and a delivery latency,
/// consumed by `channel::LossyChannel`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossConfig {
    pub drop_data: f64,
    pub drop_ack: f64,
    pub corrupt_data: f64,
    pub corrupt_ack: f64,
    pub latency: Duration,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            drop_data: 0.0,
            drop_ack: 0.0,
            corrupt_data: 0.0,
            corrupt_ack: 0.0,
            latency: Duration::ZERO,
        }
    }
}

impl LossConfig {
    pub fn with_drop_data(mut self, p: f64) -> Self {
        self.drop_data = p;
        self
    }

    pub fn with_drop_ack(mut self, p: f64) -> Self {
        self.drop_ack = p;
        self
    }

    pub fn with_corrupt_data(mut self, p: f64) -> Self {
        self.corrupt_data = p;
        self
    }

    pub fn with_corrupt_ack(mut self, p: f64) -> Self {
        self.corrupt_ack = p;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}
