//! Burst metadata
//!
//! The 55-bit metadata word carried by the preamble: an 8-bit
//! operation mode and a 47-bit call sign, CRC-16 protected on the
//! wire. The mode selects the burst geometry and code profile.

pub mod callsign;

pub use callsign::{format_call, parse_call, CallsignError, CALL_LIMIT};

/// Burst geometry of one operation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeInfo {
    pub carrier_count: usize,
    pub symbol_count: usize,
    pub mod_bits: usize,
}

/// Geometry table for the supported modes 6..=13.
pub fn mode_info(mode: u8) -> Option<ModeInfo> {
    let (carrier_count, symbol_count, mod_bits) = match mode {
        6 => (432, 50, 3),
        7 => (400, 54, 3),
        8 => (400, 81, 2),
        9 => (360, 90, 2),
        10 => (512, 42, 3),
        11 => (384, 56, 3),
        12 => (384, 84, 2),
        13 => (256, 126, 2),
        _ => return None,
    };
    Some(ModeInfo { carrier_count, symbol_count, mod_bits })
}

/// Pack mode and call sign into the metadata word.
pub fn pack_metadata(mode: u8, call: u64) -> u64 {
    (call << 8) | mode as u64
}

/// Split a metadata word into mode and call sign.
pub fn unpack_metadata(md: u64) -> (u8, u64) {
    ((md & 255) as u8, md >> 8)
}
