//! Analytic-signal front end
//!
//! Real-valued channels pass through a one-pole DC blocker and a
//! Kaiser-windowed Hilbert FIR that produces the complex baseband
//! signal the rest of the pipeline works on.

use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

/// Kahan compensated accumulator.
#[derive(Clone, PartialEq)]
struct Kahan {
    high: f32,
    low: f32,
}

impl Kahan {
    fn new(init: f32) -> Self {
        Self { high: init, low: 0.0 }
    }

    /// True when adding `input` would not change the sum.
    fn same(&self, input: f32) -> bool {
        let mut tmp = self.clone();
        tmp.add(input);
        &tmp == self
    }

    fn add(&mut self, input: f32) -> f32 {
        let tmp = input - self.low;
        let sum = self.high + tmp;
        self.low = (sum - self.high) - tmp;
        self.high = sum;
        sum
    }

    fn get(&self) -> f32 {
        self.high
    }
}

/// Kaiser window evaluator with shape parameter `a`.
struct Kaiser {
    a: f32,
}

impl Kaiser {
    fn new(a: f32) -> Self {
        Self { a }
    }

    /// Zeroth-order modified Bessel function of the first kind,
    /// summed until the Kahan accumulator saturates.
    fn i0(x: f32) -> f32 {
        let mut sum = Kahan::new(1.0);
        let mut val = 1.0;
        for n in 1..35 {
            val *= x / (2 * n) as f32;
            if sum.same(val * val) {
                return sum.get();
            }
            sum.add(val * val);
        }
        sum.get()
    }

    fn get(&self, n: usize, len: usize) -> f32 {
        let x = 2.0 * n as f32 / (len - 1) as f32 - 1.0;
        Self::i0(PI * self.a * (1.0 - x * x).sqrt()) / Self::i0(PI * self.a)
    }
}

/// One-pole DC blocking high-pass.
///
/// `samples(n)` tunes the pole so the blocker settles within roughly
/// `n` samples, mirroring the transmitter's conditioning.
pub struct BlockDc {
    x1: f32,
    y1: f32,
    a: f32,
    b: f32,
}

impl BlockDc {
    pub fn new() -> Self {
        Self { x1: 0.0, y1: 0.0, a: 0.0, b: 0.5 }
    }

    /// Parameterize for a settling window of `n` samples.
    pub fn samples(&mut self, n: usize) {
        self.a = (n as f32 - 1.0) / n as f32;
        self.b = (1.0 + self.a) / 2.0;
    }

    pub fn process(&mut self, x0: f32) -> f32 {
        let y0 = self.b * (x0 - self.x1) + self.a * self.y1;
        self.x1 = x0;
        self.y1 = y0;
        y0
    }
}

impl Default for BlockDc {
    fn default() -> Self {
        Self::new()
    }
}

/// Hilbert transform FIR producing the analytic signal of a real input.
///
/// Odd tap count with `(taps - 1) % 4 == 0`; even-index imaginary
/// coefficients vanish, so only the odd ones are stored. The window is
/// Kaiser with a = 2.0.
pub struct Hilbert {
    taps: usize,
    real: Vec<f32>,
    imco: Vec<f32>,
    reco: f32,
}

impl Hilbert {
    pub fn new(taps: usize) -> Self {
        assert_eq!((taps - 1) % 4, 0, "tap count must satisfy (taps - 1) % 4 == 0");
        let kaiser = Kaiser::new(2.0);
        let reco = kaiser.get((taps - 1) / 2, taps);
        let mut imco = vec![0.0; (taps - 1) / 4];
        for (i, co) in imco.iter_mut().enumerate() {
            *co = kaiser.get(2 * i + 1 + (taps - 1) / 2, taps) * 2.0
                / ((2 * i + 1) as f32 * PI);
        }
        Self { taps, real: vec![0.0; taps], imco, reco }
    }

    pub fn process(&mut self, input: f32) -> Complex32 {
        let mid = (self.taps - 1) / 2;
        let re = self.reco * self.real[mid];
        let mut im = 0.0;
        for (i, &co) in self.imco.iter().enumerate() {
            let k = 2 * i + 1;
            im += co * (self.real[mid - k] - self.real[mid + k]);
        }
        for i in 0..self.taps - 1 {
            self.real[i] = self.real[i + 1];
        }
        self.real[self.taps - 1] = input;
        Complex32::new(re, im)
    }
}
