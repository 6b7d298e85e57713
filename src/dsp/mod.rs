//! DSP building blocks for the receive pipeline
//!
//! Leaf-level primitives shared by the burst correlator and the symbol
//! demodulator: cached FFT plans, the analytic-signal front end, the
//! sample ring buffer, sliding-window accumulators and the Theil-Sen
//! phase-slope estimator.

pub mod buffer;
pub mod fft;
pub mod filter;
pub mod phasor;
pub mod sma;
pub mod theil_sen;

pub use buffer::BipBuffer;
pub use fft::{forward_fft, inverse_fft};
pub use filter::{BlockDc, Hilbert};
pub use phasor::Phasor;
pub use sma::{Delay, SlidingSum};
pub use theil_sen::TheilSenEstimator;
