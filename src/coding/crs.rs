//! Cauchy Reed-Solomon erasure coding over GF(2^16)
//!
//! MDS code whose generator is a Cauchy matrix: block i carries
//! sum_j m_j / (x_i + y_j) with x_i the block identifier and
//! y_j = 65535 - j the message row points. Any `count` blocks with
//! distinct identifiers recover the `count` message rows through the
//! closed-form Cauchy inverse. Byte pairs are little-endian field
//! symbols, and every symbol position is an independent codeword, so
//! damage never spreads across positions.

use crate::coding::galois::GaloisField;

pub struct CauchyReedSolomon {
    gf: GaloisField,
}

impl CauchyReedSolomon {
    pub fn new() -> Self {
        Self { gf: GaloisField::new() }
    }

    fn row_point(j: usize) -> u16 {
        65535 - j as u16
    }

    /// Encode one code block for identifier `ident` from `count`
    /// message rows laid out back to back in `message`, each
    /// `block_bytes` long. Identifiers must stay clear of the row
    /// points, which the 12-block surface guarantees.
    pub fn encode(
        &self,
        block: &mut [u8],
        message: &[u8],
        ident: u16,
        block_bytes: usize,
        count: usize,
    ) {
        let words = block_bytes / 2;
        block[..block_bytes].fill(0);
        for j in 0..count {
            let a = self.gf.rcp(ident ^ Self::row_point(j));
            let row = &message[j * block_bytes..(j + 1) * block_bytes];
            for w in 0..words {
                let m = u16::from_le_bytes([row[2 * w], row[2 * w + 1]]);
                let acc = u16::from_le_bytes([block[2 * w], block[2 * w + 1]]);
                let sum = acc ^ self.gf.mul(a, m);
                block[2 * w..2 * w + 2].copy_from_slice(&sum.to_le_bytes());
            }
        }
    }

    /// Recover message row `row` from `count` received blocks stored
    /// back to back in `blocks` with their identifiers in `idents`.
    pub fn decode(
        &self,
        message: &mut [u8],
        blocks: &[u8],
        idents: &[u16],
        row: usize,
        block_bytes: usize,
        count: usize,
    ) {
        let words = block_bytes / 2;
        message[..block_bytes].fill(0);
        let y_r = Self::row_point(row);

        // Cauchy inverse row: the coefficient of received block i is
        //   prod_k (x_i + y_k) * prod_k (x_k + y_r)
        //   / ((x_i + y_r) * prod_{k!=i} (x_i + x_k) * prod_{k!=r} (y_r + y_k))
        let mut num_col = 1u16; // prod_k (x_k + y_r)
        let mut den_row = 1u16; // prod_{k!=r} (y_r + y_k)
        for k in 0..count {
            num_col = self.gf.mul(num_col, idents[k] ^ y_r);
            if k != row {
                den_row = self.gf.mul(den_row, y_r ^ Self::row_point(k));
            }
        }

        for i in 0..count {
            let x_i = idents[i];
            let mut num_row = 1u16; // prod_k (x_i + y_k)
            let mut den_col = 1u16; // prod_{k!=i} (x_i + x_k)
            for k in 0..count {
                num_row = self.gf.mul(num_row, x_i ^ Self::row_point(k));
                if k != i {
                    den_col = self.gf.mul(den_col, x_i ^ idents[k]);
                }
            }
            let num = self.gf.mul(num_row, num_col);
            let den = self
                .gf
                .mul(x_i ^ y_r, self.gf.mul(den_col, den_row));
            let coeff = self.gf.div(num, den);

            let block = &blocks[i * block_bytes..(i + 1) * block_bytes];
            for w in 0..words {
                let b = u16::from_le_bytes([block[2 * w], block[2 * w + 1]]);
                let acc = u16::from_le_bytes([message[2 * w], message[2 * w + 1]]);
                let sum = acc ^ self.gf.mul(coeff, b);
                message[2 * w..2 * w + 2].copy_from_slice(&sum.to_le_bytes());
            }
        }
    }
}

impl Default for CauchyReedSolomon {
    fn default() -> Self {
        Self::new()
    }
}
