//! Cached FFT plans
//!
//! All transforms in the pipeline run at sizes fixed by the sample rate
//! (the OFDM symbol length and its half), so plans are built once and
//! shared through a process-wide cache.

use once_cell::sync::Lazy;
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

static FORWARD_PLANS: Lazy<Mutex<HashMap<usize, Arc<dyn Fft<f32>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static INVERSE_PLANS: Lazy<Mutex<HashMap<usize, Arc<dyn Fft<f32>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Get or create a forward FFT plan for the given size.
pub fn forward_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = FORWARD_PLANS.lock().unwrap();
    if let Some(plan) = cache.get(&n) {
        return Arc::clone(plan);
    }
    let plan = FftPlanner::new().plan_fft_forward(n);
    cache.insert(n, Arc::clone(&plan));
    plan
}

/// Get or create an inverse FFT plan for the given size.
pub fn inverse_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = INVERSE_PLANS.lock().unwrap();
    if let Some(plan) = cache.get(&n) {
        return Arc::clone(plan);
    }
    let plan = FftPlanner::new().plan_fft_inverse(n);
    cache.insert(n, Arc::clone(&plan));
    plan
}

/// Out-of-place forward FFT; `freq` receives the unnormalized spectrum.
pub fn forward_fft(freq: &mut [Complex32], time: &[Complex32]) {
    freq.copy_from_slice(time);
    forward_plan(freq.len()).process(freq);
}

/// Out-of-place inverse FFT without 1/N scaling, matching the forward
/// transform's convention. Callers normalize where needed.
pub fn inverse_fft(time: &mut [Complex32], freq: &[Complex32]) {
    time.copy_from_slice(freq);
    inverse_plan(time.len()).process(time);
}
