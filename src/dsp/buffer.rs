//! Bip ring buffer
//!
//! Every sample is written twice, half a capacity apart, so one of the
//! two copies always sits inside a contiguous run of the most recent
//! `capacity` samples. Readers get a plain slice with the oldest sample
//! at index 0 and the newest at `capacity - 1`; appending shifts every
//! retained sample's index down by one.

use rustfft::num_complex::Complex32;

pub struct BipBuffer {
    buf: Vec<Complex32>,
    capacity: usize,
    pos0: usize,
    pos1: usize,
}

impl BipBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![Complex32::new(0.0, 0.0); 2 * capacity],
            capacity,
            pos0: 0,
            pos1: capacity,
        }
    }

    /// Append one sample and return the start index of the current
    /// contiguous window of `capacity` samples.
    pub fn put(&mut self, input: Complex32) -> usize {
        self.buf[self.pos0] = input;
        self.buf[self.pos1] = input;
        self.pos0 += 1;
        if self.pos0 >= 2 * self.capacity {
            self.pos0 = 0;
        }
        self.pos1 += 1;
        if self.pos1 >= 2 * self.capacity {
            self.pos1 = 0;
        }
        self.pos0.min(self.pos1)
    }

    /// Contiguous view of the last `capacity` samples, oldest first.
    pub fn window(&self) -> &[Complex32] {
        let start = self.pos0.min(self.pos1);
        &self.buf[start..start + self.capacity]
    }
}
