//! Phase-shift keying maps and soft demappers
//!
//! Gray-coded BPSK, QPSK and 8-PSK. Code values follow the NRZ
//! convention used on the wire: +1 is bit 0, -1 is bit 1; soft bits
//! keep that sign with LLR-proportional magnitude.

use rustfft::num_complex::Complex32;
use std::f32::consts::FRAC_1_SQRT_2;

const COS_PI_8: f32 = 0.923_879_5;
const SIN_PI_8: f32 = 0.382_683_43;

/// Differential demodulation with erasure marking. Both the all-zero
/// reference and implausibly large ratios (|.|^2 > 4) come out as the
/// zero erasure symbol.
pub fn demod_or_erase(curr: Complex32, prev: Complex32) -> Complex32 {
    if prev.norm_sqr() <= 0.0 {
        return Complex32::new(0.0, 0.0);
    }
    let cons = curr / prev;
    if cons.norm_sqr() > 4.0 {
        return Complex32::new(0.0, 0.0);
    }
    cons
}

/// Saturating quantizer for the preamble's 8-bit soft bits.
fn quant_i8(x: f32) -> i8 {
    x.round().clamp(i8::MIN as f32 + 1.0, i8::MAX as f32) as i8
}

/// BPSK soft decision on the real axis, quantized to i8.
pub fn bpsk_soft(c: Complex32, precision: f32) -> i8 {
    quant_i8(precision * c.re)
}

/// Map `mod_bits` NRZ code values onto a constellation point.
pub fn mod_map(b: &[f32], mod_bits: usize) -> Complex32 {
    match mod_bits {
        2 => Complex32::new(FRAC_1_SQRT_2 * b[0], FRAC_1_SQRT_2 * b[1]),
        3 => {
            let (re, im) = if b[0] >= 0.0 {
                (COS_PI_8, SIN_PI_8)
            } else {
                (SIN_PI_8, COS_PI_8)
            };
            Complex32::new(b[1] * re, b[2] * im)
        }
        _ => Complex32::new(0.0, 0.0),
    }
}

/// Hard decisions for `mod_bits` code values.
pub fn mod_hard(b: &mut [f32], c: Complex32, mod_bits: usize) {
    fn sign(x: f32) -> f32 {
        if x < 0.0 {
            -1.0
        } else {
            1.0
        }
    }
    match mod_bits {
        2 => {
            b[0] = sign(c.re);
            b[1] = sign(c.im);
        }
        3 => {
            b[0] = sign(c.re.abs() - c.im.abs());
            b[1] = sign(c.re);
            b[2] = sign(c.im);
        }
        _ => {}
    }
}

/// Soft decisions scaled by `precision`.
pub fn mod_soft(b: &mut [f32], c: Complex32, precision: f32, mod_bits: usize) {
    match mod_bits {
        2 => {
            b[0] = precision * c.re;
            b[1] = precision * c.im;
        }
        3 => {
            b[0] = precision * FRAC_1_SQRT_2 * (c.re.abs() - c.im.abs());
            b[1] = precision * c.re;
            b[2] = precision * c.im;
        }
        _ => {}
    }
}
