//! Outcome types returned by the sender and receiver APIs.
//!
//! Shaped after `strata-transport`'s `SenderStats`/`ReceiverStats`, but scoped
//! to exactly what `spec.md` S6 promises per call rather than a running
//! cumulative counter — this crate has no long-lived session object to hang
//! cumulative stats off of.

use std::time::Duration;

/// Result of one `send_message` call.
///
/// `ok == false` means retransmissions were exhausted (`Unreachable`); this
/// crate reports that as `SendOutcome { ok: false, .. }` rather than a Rust
/// `Err`, since the failure still carries a meaningful `retries`/`duration`
/// pair the same way a success does. See DESIGN.md for this Open Question's
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOutcome {
    pub ok: bool,
    pub retries: u32,
    pub duration: Duration,
}

impl SendOutcome {
    pub fn success(retries: u32, duration: Duration) -> Self {
        Self {
            ok: true,
            retries,
            duration,
        }
    }

    pub fn unreachable(retries: u32, duration: Duration) -> Self {
        Self {
            ok: false,
            retries,
            duration,
        }
    }
}
