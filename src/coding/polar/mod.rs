//! CA-SCL polar payload decoding
//!
//! Ties the pieces together for one burst: rate-match the demapped
//! soft bits into the order-16 mother code, run the sixteen-lane list
//! decoder, re-encode survivors systematically and pick the first one
//! in metric order whose CRC-32 comes out zero.

pub mod encoder;
pub mod frozen;
pub mod list;

use bitvec::prelude::*;

use crate::coding::crc::CRC32_PAYLOAD;
use frozen::{FrozenTable, FrozenTables, CODE_BITS, CRC_BITS, DATA_BITS};
use list::{ListDecoder, LANES};

/// Rate-matching and modulation profile of one operation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeProfile {
    pub cons_bits: usize,
    pub mesg_bits: usize,
}

impl CodeProfile {
    /// Profile for an operation mode in 6..=13.
    pub fn of_mode(mode: u8) -> Option<Self> {
        match mode {
            6..=9 => Some(Self { cons_bits: 64800, mesg_bits: 43808 }),
            10..=13 => Some(Self { cons_bits: 64512, mesg_bits: 44096 }),
            _ => None,
        }
    }
}

pub struct Polar {
    tables: FrozenTables,
    list: ListDecoder,
    code: Vec<f32>,
    scratch: Vec<u8>,
    mesg: Vec<u8>,
    packed: Vec<u8>,
}

impl Polar {
    pub fn new() -> Self {
        Self {
            tables: FrozenTables::construct(),
            list: ListDecoder::new(CODE_BITS),
            code: vec![0.0; CODE_BITS],
            scratch: vec![0u8; CODE_BITS],
            mesg: Vec::new(),
            packed: vec![0u8; CRC_BITS / 8],
        }
    }

    pub fn table(&self, profile: CodeProfile) -> &FrozenTable {
        match profile.cons_bits {
            64800 => &self.tables.long,
            _ => &self.tables.short,
        }
    }

    /// Expand `cons_bits` received soft bits into the mother code:
    /// frozen channels and the CRC-gated message prefix take received
    /// values in reverse order, shortened information channels are
    /// known-zero and get a saturated soft bit.
    fn lengthen(&mut self, input: &[f32], profile: CodeProfile) {
        let table = match profile.cons_bits {
            64800 => &self.tables.long,
            _ => &self.tables.short,
        };
        let mut j = profile.cons_bits;
        let mut k = profile.mesg_bits as isize;
        for i in (0..CODE_BITS).rev() {
            let data = if table.is_frozen(i) {
                true
            } else {
                k -= 1;
                k < CRC_BITS as isize
            };
            self.code[i] = if data {
                j -= 1;
                input[j]
            } else {
                9000.0
            };
        }
        debug_assert_eq!(j, 0);
        debug_assert_eq!(k, 0);
    }

    /// Decode one burst's soft bits (`cons_bits` entries of `input`
    /// are used) and write 43040 payload bits LSB-first into
    /// `payload`. False when no list survivor passes the CRC.
    pub fn decode(&mut self, payload: &mut [u8], input: &[f32], mode: u8) -> bool {
        let profile = match CodeProfile::of_mode(mode) {
            Some(p) => p,
            None => return false,
        };
        self.lengthen(input, profile);

        let table = match profile.cons_bits {
            64800 => &self.tables.long,
            _ => &self.tables.short,
        };
        let metrics = self.list.decode(&self.code, table);

        let mut order: Vec<usize> = (0..LANES).collect();
        order.sort_by(|&a, &b| metrics[a].total_cmp(&metrics[b]));

        self.mesg.resize(profile.mesg_bits, 0);
        for &lane in &order {
            self.list.message(lane, &mut self.mesg);

            // systematic re-encode: transform the u-domain decisions
            // and read the information channels back out
            encoder::expand(&mut self.scratch, &self.mesg, table);
            encoder::transform(&mut self.scratch);
            encoder::extract(&mut self.mesg, &self.scratch, table);

            self.packed.fill(0);
            let bits = self.packed.view_bits_mut::<Lsb0>();
            for (i, &b) in self.mesg.iter().take(CRC_BITS).enumerate() {
                bits.set(i, b != 0);
            }
            if CRC32_PAYLOAD.checksum(&self.packed) == 0 {
                payload[..DATA_BITS / 8].copy_from_slice(&self.packed[..DATA_BITS / 8]);
                return true;
            }
        }
        false
    }
}

impl Default for Polar {
    fn default() -> Self {
        Self::new()
    }
}

/// Transmit-side rate matching, the inverse of `lengthen`: collect the
/// mother-code bits at frozen channels and the CRC-gated message
/// prefix in channel order. Used by the loopback tests.
pub fn shorten(output: &mut [f32], codeword: &[u8], table: &FrozenTable, profile: CodeProfile) {
    let mut j = 0;
    let mut k = 0;
    for (i, &c) in codeword.iter().enumerate() {
        let data = if table.is_frozen(i) {
            true
        } else {
            let taken = k < CRC_BITS;
            k += 1;
            taken
        };
        if data {
            output[j] = if c != 0 { -1.0 } else { 1.0 };
            j += 1;
        }
    }
    debug_assert_eq!(j, profile.cons_bits);
}
