//! Numerically controlled oscillator
//!
//! Complex phasor advanced by multiplication and renormalized each
//! step so the magnitude cannot drift during long bursts.

use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;

pub struct Phasor {
    prev: Complex32,
    delta: Complex32,
}

impl Phasor {
    pub fn new() -> Self {
        Self {
            prev: Complex32::new(1.0, 0.0),
            delta: Complex32::new(1.0, 0.0),
        }
    }

    /// Set angular increment in radians per sample. Resets phase.
    pub fn omega(&mut self, rad: f32) {
        self.prev = Complex32::new(1.0, 0.0);
        self.delta = Complex32::new(rad.cos(), rad.sin());
    }

    /// Set frequency in Hz at the given sample rate. Resets phase.
    pub fn omega_hz(&mut self, freq: f32, rate: f32) {
        self.omega(TAU * freq / rate);
    }

    /// Current phasor value; advances by one sample.
    pub fn get(&mut self) -> Complex32 {
        let tmp = self.prev;
        self.prev *= self.delta;
        self.prev /= self.prev.norm();
        tmp
    }
}

impl Default for Phasor {
    fn default() -> Self {
        Self::new()
    }
}
