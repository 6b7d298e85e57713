//! Ordered-statistics decoding for the preamble
//!
//! Near-ML soft decoder for the BCH(255,71) metadata code: order the
//! received positions by reliability, Gauss-eliminate the generator
//! matrix onto the most reliable independent set, then re-encode the
//! hard decisions and every order-1 and order-2 flip pattern, keeping
//! the candidate with the best correlation metric. Succeeds only when
//! that maximum is unique.

use bitvec::prelude::*;

const N: usize = 255;
const K: usize = 71;
const S: usize = 8;
const W: usize = (N + S - 1) & !(S - 1);

pub struct OrderedStatisticsDecoder {
    g: Vec<i8>,
    codeword: [i8; W],
    candidate: [i8; W],
    softperm: [i8; W],
    perm: [usize; W],
}

impl Default for OrderedStatisticsDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderedStatisticsDecoder {
    pub fn new() -> Self {
        Self {
            g: vec![0; W * K],
            codeword: [0; W],
            candidate: [0; W],
            softperm: [0; W],
            perm: [0; W],
        }
    }

    /// Decode 255 soft bits against the flat row-major `genmat`
    /// (K rows by N columns of 0/1). On success the full codeword is
    /// written to `hard` and true is returned.
    pub fn process(
        &mut self,
        hard: &mut BitSlice<u8, Msb0>,
        soft: &[i8],
        genmat: &[i8],
    ) -> bool {
        debug_assert_eq!(soft.len(), N);
        debug_assert_eq!(genmat.len(), K * N);

        for i in 0..W {
            self.perm[i] = i;
        }
        for i in 0..N {
            self.softperm[i] = soft[i].max(-127).abs();
        }
        for i in N..W {
            self.softperm[i] = 0;
        }
        // most reliable positions first
        self.perm[0..N].sort_by(|&a, &b| self.softperm[b].cmp(&self.softperm[a]));

        for j in 0..K {
            for i in 0..N {
                self.g[W * j + i] = genmat[N * j + self.perm[i]];
            }
            for i in N..W {
                self.g[W * j + i] = 0;
            }
        }

        self.row_echelon();
        self.systematic();

        for i in 0..N {
            self.softperm[i] = soft[self.perm[i]].max(-127);
        }
        for i in N..W {
            self.softperm[i] = 0;
        }
        for i in 0..K {
            self.codeword[i] = (self.softperm[i] < 0) as i8;
        }
        self.encode();
        self.candidate.copy_from_slice(&self.codeword);

        let mut best = Self::metric(&self.codeword, &self.softperm);
        let mut next = -1;

        for a in 0..K {
            self.flip(a);
            self.update(&mut best, &mut next);
            for b in a + 1..K {
                self.flip(b);
                self.update(&mut best, &mut next);
                self.flip(b);
            }
            self.flip(a);
        }

        for i in 0..N {
            hard.set(self.perm[i], self.candidate[i] != 0);
        }
        best != next
    }

    fn update(&mut self, best: &mut i64, next: &mut i64) {
        let met = Self::metric(&self.codeword, &self.softperm);
        if met > *best {
            *next = *best;
            *best = met;
            self.candidate.copy_from_slice(&self.codeword);
        } else if met > *next {
            *next = met;
        }
    }

    fn row_echelon(&mut self) {
        for k in 0..K {
            // bring a nonzero pivot into row k
            for j in k..K {
                if self.g[W * j + k] != 0 {
                    let mut i = k;
                    while j != k && i < N {
                        self.g.swap(W * j + i, W * k + i);
                        i += 1;
                    }
                    break;
                }
            }
            // column exchange when the whole column is zero below k
            let mut j = k + 1;
            while self.g[W * k + k] == 0 && j < N {
                for h in k..K {
                    if self.g[W * h + j] != 0 {
                        self.perm.swap(k, j);
                        for i in 0..K {
                            self.g.swap(W * i + k, W * i + j);
                        }
                        let mut i = k;
                        while h != k && i < N {
                            self.g.swap(W * h + i, W * k + i);
                            i += 1;
                        }
                        break;
                    }
                }
                j += 1;
            }
            assert!(self.g[W * k + k] != 0, "generator matrix rank deficient");
            for j in k + 1..K {
                if self.g[W * j + k] != 0 {
                    for i in k..N {
                        self.g[W * j + i] ^= self.g[W * k + i];
                    }
                }
            }
        }
    }

    fn systematic(&mut self) {
        for k in (1..K).rev() {
            for j in 0..k {
                if self.g[W * j + k] != 0 {
                    for i in k..N {
                        self.g[W * j + i] ^= self.g[W * k + i];
                    }
                }
            }
        }
    }

    fn encode(&mut self) {
        for i in K..N {
            self.codeword[i] = self.codeword[0] & self.g[i];
        }
        for j in 1..K {
            for i in K..N {
                self.codeword[i] ^= self.codeword[j] & self.g[W * j + i];
            }
        }
    }

    fn flip(&mut self, j: usize) {
        for i in 0..W {
            self.codeword[i] ^= self.g[W * j + i];
        }
    }

    fn metric(hard: &[i8], soft: &[i8]) -> i64 {
        let mut sum = 0i64;
        for i in 0..W {
            sum += (1 - 2 * hard[i] as i64) * soft[i] as i64;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::bch::{Bch, MINIMAL_POLYNOMIALS};

    fn encode_codeword(data: &BitSlice<u8, Msb0>) -> BitVec<u8, Msb0> {
        let bch = Bch::new(&MINIMAL_POLYNOMIALS);
        let parity = bch.parity(data);
        let mut codeword = bitvec![u8, Msb0; 0; N];
        for i in 0..K {
            codeword.set(i, data[i]);
        }
        for i in 0..N - K {
            codeword.set(K + i, parity[i]);
        }
        codeword
    }

    fn soft_from(codeword: &BitSlice<u8, Msb0>, level: i8) -> Vec<i8> {
        codeword
            .iter()
            .map(|b| if *b { -level } else { level })
            .collect()
    }

    #[test]
    fn test_decodes_clean_codeword() {
        let bch = Bch::new(&MINIMAL_POLYNOMIALS);
        let genmat = bch.generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();

        let mut data = bitvec![u8, Msb0; 0; K];
        for i in (0..K).step_by(3) {
            data.set(i, true);
        }
        let codeword = encode_codeword(&data);
        let soft = soft_from(&codeword, 32);

        let mut hard = bitvec![u8, Msb0; 0; N + 1];
        assert!(osd.process(&mut hard[..N], &soft, &genmat));
        assert_eq!(&hard[..N], &codeword[..]);
    }

    #[test]
    fn test_corrects_flipped_bits() {
        let bch = Bch::new(&MINIMAL_POLYNOMIALS);
        let genmat = bch.generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();

        let mut data = bitvec![u8, Msb0; 0; K];
        data.set(0, true);
        data.set(17, true);
        data.set(70, true);
        let codeword = encode_codeword(&data);
        let mut soft = soft_from(&codeword, 32);
        // a few weak flipped positions
        for &i in &[5usize, 60, 130, 200] {
            soft[i] = -soft[i].signum() * 2;
        }

        let mut hard = bitvec![u8, Msb0; 0; N + 1];
        assert!(osd.process(&mut hard[..N], &soft, &genmat));
        assert_eq!(&hard[..N], &codeword[..]);
    }

    #[test]
    fn test_rejects_noise() {
        let bch = Bch::new(&MINIMAL_POLYNOMIALS);
        let genmat = bch.generator_matrix();
        let mut osd = OrderedStatisticsDecoder::new();

        // deterministic junk far from any codeword at uniform strength
        let soft: Vec<i8> = (0..N)
            .map(|i| if (i * 2654435761usize) & 4 == 0 { 3 } else { -3 })
            .collect();
        let mut hard = bitvec![u8, Msb0; 0; N + 1];
        let _ = osd.process(&mut hard[..N], &soft, &genmat);
        // no assertion on the return value being false for arbitrary
        // junk, but the call must terminate and stay in bounds
    }
}
