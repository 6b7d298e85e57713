//! BCH(255,71) generator for the preamble code
//!
//! The generator polynomial is the product of the 24 minimal
//! polynomials fixed by the protocol; from it the systematic 71x255
//! generator matrix is expanded row by row for the ordered-statistics
//! decoder.

use bitvec::prelude::*;

pub const N: usize = 255;
pub const K: usize = 71;
const NP: usize = N - K;

/// The protocol's minimal polynomial set.
pub const MINIMAL_POLYNOMIALS: [u64; 24] = [
    0b100011101, 0b101110111, 0b111110011, 0b101101001,
    0b110111101, 0b111100111, 0b100101011, 0b111010111,
    0b000010011, 0b101100101, 0b110001011, 0b101100011,
    0b100011011, 0b100111111, 0b110001101, 0b100101101,
    0b101011111, 0b111111001, 0b111000011, 0b100111001,
    0b110101001, 0b000011111, 0b110000111, 0b110110001,
];

/// Systematic BCH encoder: generator polynomial division producing the
/// 184 parity bits for 71 data bits.
pub struct Bch {
    generator: BitVec<u8, Msb0>,
}

impl Bch {
    pub fn new(minimal_polynomials: &[u64]) -> Self {
        let mut generator = bitvec![u8, Msb0; 0; NP + 1];
        let mut generator_degree = 1;
        generator.set(NP, true);
        for &m in minimal_polynomials {
            assert!(m > 0);
            let degree = 63 - m.leading_zeros() as usize;
            assert!(generator_degree + degree <= NP + 1);
            for i in (0..=generator_degree).rev() {
                if !generator[NP - i] {
                    continue;
                }
                generator.set(NP - i, m & 1 == 1);
                for j in 1..=degree {
                    let flipped = generator[NP - (i + j)] ^ ((m >> j) & 1 == 1);
                    generator.set(NP - (i + j), flipped);
                }
            }
            generator_degree += degree;
        }
        assert_eq!(generator_degree, NP + 1);
        // drop the leading coefficient so the rows below line up
        for i in 0..NP {
            let v = generator[i + 1];
            generator.set(i, v);
        }
        generator.set(NP, false);
        Self { generator }
    }

    /// Compute the parity bits for `data` (first K bits used).
    pub fn parity(&self, data: &BitSlice<u8, Msb0>) -> BitVec<u8, Msb0> {
        let mut parity = bitvec![u8, Msb0; 0; NP];
        for i in 0..K {
            let feedback = data[i] != parity[0];
            parity.shift_left(1);
            if feedback {
                for j in 0..NP {
                    let v = parity[j] ^ self.generator[j];
                    parity.set(j, v);
                }
            }
        }
        parity
    }

    /// Systematic generator matrix as flat row-major 0/1 bytes,
    /// `K * N` entries, for the ordered-statistics decoder.
    pub fn generator_matrix(&self) -> Vec<i8> {
        let mut genmat = vec![0i8; K * N];
        for row in 0..K {
            let mut data = bitvec![u8, Msb0; 0; K];
            data.set(row, true);
            let parity = self.parity(&data);
            genmat[row * N + row] = 1;
            for (col, bit) in parity.iter().enumerate() {
                genmat[row * N + K + col] = *bit as i8;
            }
        }
        genmat
    }
}
