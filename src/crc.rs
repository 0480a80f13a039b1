//! ArduPilot CRC32 ("AP-CRC32").
//!
//! Polynomial `0x04C11DB7`, initial value `0`, non-reflected input/output,
//! no final XOR. Built on the `crc` crate rather than a hand-rolled table.

use crc::{Algorithm, Crc};

/// The ArduPilot variant of CRC-32: non-reflected, polynomial `0x04C11DB7`.
///
/// `check` and `residue` are the crate's self-test constants for the
/// standard `"123456789"` test vector; since this variant is not a named
/// entry in the `crc` crate's catalog, they are left at `0` (unverified —
/// the `Crc::checksum` path used here never consults them).
const AP_CRC32: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04C1_1DB7,
    init: 0x0000_0000,
    refin: false,
    refout: false,
    xorout: 0x0000_0000,
    check: 0x0000_0000,
    residue: 0x0000_0000,
};

/// A reusable digest instance for the ArduPilot CRC32 variant.
pub static AP_CRC32_DIGEST: Crc<u32> = Crc::<u32>::new(&AP_CRC32);

/// Computes the AP-CRC32 checksum of `bytes`.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    AP_CRC32_DIGEST.checksum(bytes)
}
