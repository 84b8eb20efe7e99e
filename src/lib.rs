//! Reliable ARQ transport over a lossy, corrupting, low-bandwidth byte channel.
//!
//! Layers a framing/integrity format and two Automatic-Repeat-reQuest protocols
//! on top of an opaque bidirectional byte pipe, so that handing a payload of up
//! to a few kilobytes to [`arq::stop_and_wait::Sender`] or
//! [`arq::go_back_n::Sender`] yields either eventual full, ordered delivery or a
//! bounded-effort [`stats::SendOutcome::unreachable`].
//!
//! - [`crc`] / [`wire`] — frame integrity and wire encoding.
//! - [`channel`] — the `send`/`recv(timeout)` capability and its lossy variant.
//! - [`clock`] — the monotonic time source and the single retransmission timer.
//! - [`arq`] — Stop-and-Wait and Go-Back-N sender/receiver state machines.
//! - [`reassembly`] / [`msgid`] — shared receiver and sender bookkeeping.
//! - [`config`] / [`stats`] / [`error`] — configuration, outcomes, and errors.
//!
//! The physical acoustic modem, command-line drivers, and any statistics
//! printing harness are out of scope: this crate only implements the
//! engine the modem's byte pipe plugs into as a [`channel::Channel`].

pub mod arq;
pub mod channel;
pub mod clock;
pub mod config;
pub mod crc;
pub mod error;
pub mod msgid;
pub mod reassembly;
pub mod stats;
pub mod wire;

pub use channel::{Channel, LoopbackChannel, LossyChannel};
pub use clock::{Clock, RetransmitTimer, SystemClock};
pub use config::{LossConfig, TransportConfig};
pub use error::{FrameError, ReceiveTimeout, RecvTimeout, SendError};
pub use msgid::MsgIdGenerator;
pub use stats::SendOutcome;
pub use wire::Frame;
