//! Protocol CRC definitions
//!
//! All three protocol CRCs are LSB-first with zero init and no output
//! xor. The transmitter documents them by their right-shifting
//! polynomials; the `crc` crate takes the bit-reversed (normal form)
//! polynomial together with `refin`/`refout`, so each constant below
//! carries both spellings.

use crc::{Algorithm, Crc};

/// Metadata CRC-16 over `metadata << 9`, protocol polynomial 0xA8F4.
pub const CRC16_META: Crc<u16> = Crc::<u16>::new(&Algorithm {
    width: 16,
    poly: 0x2F15, // reverse of 0xA8F4
    init: 0x0,
    refin: true,
    refout: true,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
});

/// Payload CRC-32 over the 43072-bit polar message, protocol
/// polynomial 0xD419CC15.
pub const CRC32_PAYLOAD: Crc<u32> = Crc::<u32>::new(&Algorithm {
    width: 32,
    poly: 0xA833982B, // reverse of 0xD419CC15
    init: 0x0,
    refin: true,
    refout: true,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
});

/// Erasure-recovery CRC-32 over the reassembled payload, protocol
/// polynomial 0x8F6E37A0.
pub const CRC32_CHUNKS: Crc<u32> = Crc::<u32>::new(&Algorithm {
    width: 32,
    poly: 0x05EC76F1, // reverse of 0x8F6E37A0
    init: 0x0,
    refin: true,
    refout: true,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
});

/// Metadata checksum as transmitted: CRC-16 of the 64-bit value
/// `metadata << 9`, fed as eight little-endian bytes.
pub fn metadata_checksum(metadata: u64) -> u16 {
    CRC16_META.checksum(&(metadata << 9).to_le_bytes())
}
