//! The two ARQ protocols: Stop-and-Wait (window 1) and Go-Back-N (windowed,
//! cumulative-ACK, full-window retransmit on loss). Each submodule owns a
//! sender half and a receiver half; neither protocol's receiver buffers
//! out-of-order fragments, so both share `crate::reassembly::ReassemblyBuffer`.

pub mod go_back_n;
pub mod stop_and_wait;
