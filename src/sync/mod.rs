//! Schmidl-Cox burst synchronization
//!
//! Detects the training symbol at the head of a burst and estimates
//! symbol timing and carrier frequency offset.
//!
//! The training symbol occupies only every second subcarrier, so its
//! two halves repeat in time. A sliding correlation between the halves
//! yields a timing metric plateau and the fractional CFO; a
//! frequency-domain match against the known 127-length MLS pattern
//! then pins the integer CFO and the residual timing error.
//!
//! Reference: T. M. Schmidl and D. C. Cox, "Robust Frequency and
//! Timing Synchronization for OFDM," IEEE Trans. Commun., 1997.

use rustfft::num_complex::Complex32;
use rustfft::Fft;
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use crate::coding::psk::demod_or_erase;
use crate::dsp::fft::{forward_plan, inverse_plan};
use crate::dsp::phasor::Phasor;
use crate::dsp::sma::{Delay, SlidingSum};

/// Hysteresis comparator for the timing metric.
struct SchmittTrigger {
    low: f32,
    high: f32,
    previous: bool,
}

impl SchmittTrigger {
    fn new(low: f32, high: f32) -> Self {
        Self { low, high, previous: false }
    }

    fn put(&mut self, input: f32) -> bool {
        if self.previous {
            if input < self.low {
                self.previous = false;
            }
        } else if input > self.high {
            self.previous = true;
        }
        self.previous
    }
}

struct FallingEdgeTrigger {
    previous: bool,
}

impl FallingEdgeTrigger {
    fn new() -> Self {
        Self { previous: false }
    }

    fn put(&mut self, input: bool) -> bool {
        let tmp = self.previous;
        self.previous = input;
        tmp && !input
    }
}

/// Burst correlator.
///
/// `symbol_len` is the repetition period of the training symbol, i.e.
/// half the OFDM symbol length. The window slice handed to `put` must
/// cover at least `search_pos + 2 * symbol_len + 1` samples.
pub struct SchmidlCox {
    search_pos: usize,
    symbol_len: usize,
    guard_len: usize,
    match_len: usize,
    match_del: usize,
    kern: Vec<Complex32>,
    tmp0: Vec<Complex32>,
    tmp1: Vec<Complex32>,
    tmp2: Vec<Complex32>,
    fft_fwd: Arc<dyn Fft<f32>>,
    fft_bwd: Arc<dyn Fft<f32>>,
    cor: SlidingSum<Complex32>,
    pwr: SlidingSum<f32>,
    matc: SlidingSum<f32>,
    delay: Delay,
    threshold: SchmittTrigger,
    falling: FallingEdgeTrigger,
    index_max: usize,
    timing_max: f32,
    phase_max: f32,
    /// Timing estimate: window index of the training symbol body start.
    pub symbol_pos: usize,
    /// Carrier frequency offset estimate in radians per sample.
    pub cfo_rad: f32,
    frac_cfo: f32,
}

impl SchmidlCox {
    /// `sequence` is the reference half-spectrum of the training
    /// symbol (`symbol_len` bins, MLS values on the occupied bins).
    pub fn new(
        sequence: &[Complex32],
        search_pos: usize,
        symbol_len: usize,
        guard_len: usize,
    ) -> Self {
        assert_eq!(sequence.len(), symbol_len);
        let match_len = guard_len | 1;
        let match_del = (match_len - 1) / 2;
        let fft_fwd = forward_plan(symbol_len);
        let fft_bwd = inverse_plan(symbol_len);
        let mut kern = sequence.to_vec();
        fft_fwd.process(&mut kern);
        for k in kern.iter_mut() {
            *k = k.conj() / symbol_len as f32;
        }
        Self {
            search_pos,
            symbol_len,
            guard_len,
            match_len,
            match_del,
            kern,
            tmp0: vec![Complex32::new(0.0, 0.0); symbol_len],
            tmp1: vec![Complex32::new(0.0, 0.0); symbol_len],
            tmp2: vec![Complex32::new(0.0, 0.0); symbol_len],
            fft_fwd,
            fft_bwd,
            cor: SlidingSum::new(symbol_len, Complex32::new(0.0, 0.0)),
            pwr: SlidingSum::new(2 * symbol_len, 0.0),
            matc: SlidingSum::new(match_len, 0.0),
            delay: Delay::new(match_del),
            threshold: SchmittTrigger::new(0.17 * match_len as f32, 0.19 * match_len as f32),
            falling: FallingEdgeTrigger::new(),
            index_max: 0,
            timing_max: 0.0,
            phase_max: 0.0,
            symbol_pos: search_pos,
            cfo_rad: 0.0,
            frac_cfo: 0.0,
        }
    }

    fn bin(&self, carrier: isize) -> usize {
        (carrier + self.symbol_len as isize) as usize % self.symbol_len
    }

    /// Feed the current buffer window; true when a burst was pinned
    /// down. `symbol_pos` and `cfo_rad` are valid until the next
    /// detection.
    pub fn put(&mut self, samples: &[Complex32]) -> bool {
        let p = self.cor.put(
            samples[self.search_pos + self.symbol_len]
                * samples[self.search_pos + 2 * self.symbol_len].conj(),
        );
        let mut r = 0.5 * self.pwr.put(samples[self.search_pos + 2 * self.symbol_len].norm_sqr());
        let min_r = 0.0001 * self.symbol_len as f32;
        if r < min_r {
            r = min_r;
        }
        let timing = self.matc.put(p.norm_sqr() / (r * r));
        let phase = self.delay.put(p.arg());

        let collect = self.threshold.put(timing);
        let process = self.falling.put(collect);

        if !collect && !process {
            return false;
        }

        if self.timing_max < timing {
            self.timing_max = timing;
            self.phase_max = phase;
            self.index_max = self.match_del;
        } else {
            self.index_max += 1;
        }

        if !process {
            return false;
        }

        self.timing_max = 0.0;
        if self.index_max > self.search_pos {
            self.index_max = 0;
            return false;
        }
        self.frac_cfo = self.phase_max / self.symbol_len as f32;
        let test_pos = self.search_pos - self.index_max;
        self.index_max = 0;

        let mut osc = Phasor::new();
        osc.omega(self.frac_cfo);
        for i in 0..self.symbol_len {
            self.tmp1[i] = samples[i + test_pos + self.symbol_len] * osc.get();
        }
        self.tmp0.copy_from_slice(&self.tmp1);
        self.fft_fwd.process(&mut self.tmp0);
        for i in 0..self.symbol_len {
            self.tmp1[i] = demod_or_erase(self.tmp0[i], self.tmp0[self.bin(i as isize - 1)]);
        }
        self.tmp0.copy_from_slice(&self.tmp1);
        self.fft_fwd.process(&mut self.tmp0);
        for i in 0..self.symbol_len {
            self.tmp0[i] *= self.kern[i];
        }
        self.tmp2.copy_from_slice(&self.tmp0);
        self.fft_bwd.process(&mut self.tmp2);

        let mut shift = 0;
        let mut peak = 0.0f32;
        let mut next = 0.0f32;
        for (i, c) in self.tmp2.iter().enumerate() {
            let power = c.norm_sqr();
            if power > peak {
                next = peak;
                peak = power;
                shift = i;
            } else if power > next {
                next = power;
            }
        }
        if peak <= next * 4.0 {
            return false;
        }

        let pos_err =
            (self.tmp2[shift].arg() * self.symbol_len as f32 / TAU).round() as isize;
        if pos_err.unsigned_abs() > self.guard_len / 2 {
            return false;
        }
        debug_assert!(test_pos as isize >= pos_err);
        self.symbol_pos = (test_pos as isize - pos_err) as usize;

        self.cfo_rad = shift as f32 * (TAU / self.symbol_len as f32) - self.frac_cfo;
        if self.cfo_rad >= PI {
            self.cfo_rad -= TAU;
        }
        true
    }
}
