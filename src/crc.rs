//! CRC-16 integrity check over a frame's header and payload.
//!
//! Uses the `crc` crate's `CRC_16_IBM_3740` catalog entry, which is the current
//! name for the algorithm historically called CRC-16/CCITT-FALSE (poly 0x1021,
//! init 0xFFFF, no input/output reflection, no xorout). Both endpoints must use
//! the identical algorithm; this is the one this crate picks.

use crc::{Crc, CRC_16_IBM_3740};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the 16-bit check value over `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}
