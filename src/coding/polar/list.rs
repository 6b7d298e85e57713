//! Successive-cancellation list decoding, sixteen lanes
//!
//! The list is held as sixteen parallel lanes inside fixed-width
//! vectors: every soft value, partial sum and path metric is a
//! `[_; 16]` processed element-wise. When an information leaf forks
//! the paths, survivors are chosen by path metric and the resulting
//! lane permutation is returned up the tree, where ancestors apply it
//! to the values they computed before the fork. Decisions and parent
//! lanes are recorded per fork so survivor messages are reconstructed
//! by backtracking instead of reshuffling history.

use super::frozen::FrozenTable;

/// List width: both the algorithmic list size and the vector width.
pub const LANES: usize = 16;

type SoftLane = [f32; LANES];
type HardLane = [i8; LANES];
type Map = [u8; LANES];

/// Metric seed for the initially inactive lanes; must dwarf every
/// reachable real path metric while staying far from f32 overflow.
const LANE_OFF: f32 = 1.0e15;

const IDENTITY: Map = {
    let mut map = [0u8; LANES];
    let mut i = 0;
    while i < LANES {
        map[i] = i as u8;
        i += 1;
    }
    map
};

#[inline]
fn shuf_soft(a: &SoftLane, map: &Map) -> SoftLane {
    let mut out = [0.0; LANES];
    for k in 0..LANES {
        out[k] = a[map[k] as usize];
    }
    out
}

#[inline]
fn shuf_hard(a: &HardLane, map: &Map) -> HardLane {
    let mut out = [0; LANES];
    for k in 0..LANES {
        out[k] = a[map[k] as usize];
    }
    out
}

#[inline]
fn compose(first: &Map, second: &Map) -> Map {
    let mut out = [0; LANES];
    for k in 0..LANES {
        out[k] = first[second[k] as usize];
    }
    out
}

/// min-sum check-node update.
#[inline]
fn f_op(a: &SoftLane, b: &SoftLane) -> SoftLane {
    let mut out = [0.0; LANES];
    for k in 0..LANES {
        let sign = if (a[k] < 0.0) != (b[k] < 0.0) { -1.0 } else { 1.0 };
        out[k] = sign * a[k].abs().min(b[k].abs());
    }
    out
}

/// bit-node update conditioned on the left-side partial sums.
#[inline]
fn g_op(a: &SoftLane, b: &SoftLane, h: &HardLane) -> SoftLane {
    let mut out = [0.0; LANES];
    for k in 0..LANES {
        out[k] = b[k] + h[k] as f32 * a[k];
    }
    out
}

pub struct ListDecoder {
    soft: Vec<SoftLane>,
    hard: Vec<HardLane>,
    metric: SoftLane,
    decisions: Vec<[u8; LANES]>,
    parents: Vec<Map>,
}

impl ListDecoder {
    pub fn new(code_bits: usize) -> Self {
        Self {
            soft: vec![[0.0; LANES]; 2 * code_bits],
            hard: vec![[0; LANES]; code_bits],
            metric: [0.0; LANES],
            decisions: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Run list decoding of `code` (one soft bit per mother-code
    /// position, sign is the hard decision). Returns the per-lane path
    /// metrics; messages are read back with [`ListDecoder::message`].
    pub fn decode(&mut self, code: &[f32], frozen: &FrozenTable) -> SoftLane {
        let code_bits = code.len();
        debug_assert!(code_bits.is_power_of_two());
        let order = code_bits.trailing_zeros() as usize;

        self.decisions.clear();
        self.parents.clear();
        self.metric = [LANE_OFF; LANES];
        self.metric[0] = 0.0;
        for (i, &c) in code.iter().enumerate() {
            self.soft[code_bits + i] = [c; LANES];
        }

        self.node(order, 0, 0, frozen);
        self.metric
    }

    /// Reconstruct the information-channel bits of `lane` (u-domain,
    /// leaf order) by walking the fork records backwards.
    pub fn message(&self, lane: usize, bits: &mut [u8]) {
        debug_assert_eq!(bits.len(), self.decisions.len());
        let mut cur = lane;
        for j in (0..self.decisions.len()).rev() {
            bits[j] = self.decisions[j][cur];
            cur = self.parents[j][cur] as usize;
        }
    }

    fn node(&mut self, level: usize, hoff: usize, loff: usize, frozen: &FrozenTable) -> Map {
        if level == 0 {
            return self.leaf(hoff, loff, frozen);
        }
        let n = 1 << level;
        let half = n >> 1;

        for i in 0..half {
            self.soft[half + i] = f_op(&self.soft[n + i], &self.soft[n + half + i]);
        }
        let lmap = self.node(level - 1, hoff, loff, frozen);

        for i in 0..half {
            let a = shuf_soft(&self.soft[n + i], &lmap);
            let b = shuf_soft(&self.soft[n + half + i], &lmap);
            self.soft[half + i] = g_op(&a, &b, &self.hard[hoff + i]);
        }
        let rmap = self.node(level - 1, hoff + half, loff + half, frozen);

        for i in 0..half {
            let left = shuf_hard(&self.hard[hoff + i], &rmap);
            let right = &self.hard[hoff + half + i];
            let mut combined = [0i8; LANES];
            for k in 0..LANES {
                combined[k] = left[k] * right[k];
            }
            self.hard[hoff + i] = combined;
        }
        compose(&lmap, &rmap)
    }

    fn leaf(&mut self, hoff: usize, loff: usize, frozen: &FrozenTable) -> Map {
        let soft = self.soft[1];
        if frozen.is_frozen(loff) {
            for k in 0..LANES {
                if soft[k] < 0.0 {
                    self.metric[k] -= soft[k];
                }
            }
            self.hard[hoff] = [1; LANES];
            return IDENTITY;
        }

        // fork: two candidates per lane, keep the best sixteen
        let mut cand: [(f32, u8, u8); 2 * LANES] = [(0.0, 0, 0); 2 * LANES];
        for k in 0..LANES {
            let pen0 = (-soft[k]).max(0.0);
            let pen1 = soft[k].max(0.0);
            cand[2 * k] = (self.metric[k] + pen0, k as u8, 0);
            cand[2 * k + 1] = (self.metric[k] + pen1, k as u8, 1);
        }
        cand.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut map = [0u8; LANES];
        let mut bits = [0u8; LANES];
        let mut hard = [0i8; LANES];
        let mut metric = [0.0; LANES];
        for k in 0..LANES {
            let (m, lane, bit) = cand[k];
            metric[k] = m;
            map[k] = lane;
            bits[k] = bit;
            hard[k] = 1 - 2 * bit as i8;
        }
        self.metric = metric;
        self.hard[hoff] = hard;
        self.decisions.push(bits);
        self.parents.push(map);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::polar::encoder;
    use crate::coding::polar::frozen::FrozenTable;

    fn small_table(code_bits: usize, mesg_bits: usize) -> FrozenTable {
        FrozenTable::construct(code_bits, mesg_bits)
    }

    #[test]
    fn test_decodes_clean_codeword() {
        let code_bits = 256;
        let mesg_bits = 128;
        let table = small_table(code_bits, mesg_bits);
        let message: Vec<u8> = (0..mesg_bits).map(|i| (i / 3) as u8 & 1).collect();
        let mut codeword = vec![0u8; code_bits];
        encoder::encode_systematic(&mut codeword, &message, &table);

        let code: Vec<f32> = codeword
            .iter()
            .map(|&b| if b == 1 { -8.0 } else { 8.0 })
            .collect();

        let mut list = ListDecoder::new(code_bits);
        let metrics = list.decode(&code, &table);

        let best = (0..LANES)
            .min_by(|&a, &b| metrics[a].total_cmp(&metrics[b]))
            .unwrap();
        let mut u_bits = vec![0u8; mesg_bits];
        list.message(best, &mut u_bits);

        // re-encode and compare systematically
        let mut u = vec![0u8; code_bits];
        encoder::expand(&mut u, &u_bits, &table);
        encoder::transform(&mut u);
        let mut back = vec![0u8; mesg_bits];
        encoder::extract(&mut back, &u, &table);
        assert_eq!(back, message);
        assert!(metrics[best] < 1e-3, "clean decode should cost nothing");
    }

    #[test]
    fn test_recovers_from_bit_errors() {
        let code_bits = 256;
        let mesg_bits = 96;
        let table = small_table(code_bits, mesg_bits);
        let message: Vec<u8> = (0..mesg_bits).map(|i| ((i * 5) >> 2) as u8 & 1).collect();
        let mut codeword = vec![0u8; code_bits];
        encoder::encode_systematic(&mut codeword, &message, &table);

        let mut code: Vec<f32> = codeword
            .iter()
            .map(|&b| if b == 1 { -8.0 } else { 8.0 })
            .collect();
        // weak flipped observations
        for &i in &[10usize, 77, 150, 201] {
            code[i] = -0.25 * code[i].signum();
        }

        let mut list = ListDecoder::new(code_bits);
        let metrics = list.decode(&code, &table);
        let best = (0..LANES)
            .min_by(|&a, &b| metrics[a].total_cmp(&metrics[b]))
            .unwrap();

        let mut u_bits = vec![0u8; mesg_bits];
        list.message(best, &mut u_bits);
        let mut u = vec![0u8; code_bits];
        encoder::expand(&mut u, &u_bits, &table);
        encoder::transform(&mut u);
        let mut back = vec![0u8; mesg_bits];
        encoder::extract(&mut back, &u, &table);
        assert_eq!(back, message);
    }
}
