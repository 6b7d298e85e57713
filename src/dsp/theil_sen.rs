//! Theil-Sen estimator
//!
//! Robust line fit used to take residual phase slope (fractional
//! sample timing error) out of the equalized carriers: the median of
//! all pairwise slopes, then the median intercept. Resistant to the
//! erased and badly-faded carriers that would wreck a least-squares
//! fit.

pub struct TheilSenEstimator {
    temp: Vec<f32>,
    slope: f32,
    inter: f32,
}

impl TheilSenEstimator {
    pub fn new(max_len: usize) -> Self {
        Self {
            temp: Vec::with_capacity(max_len * (max_len - 1) / 2),
            slope: 0.0,
            inter: 0.0,
        }
    }

    /// Fit y over x; `x` and `y` must be the same length.
    pub fn compute(&mut self, x: &[f32], y: &[f32]) {
        debug_assert_eq!(x.len(), y.len());
        self.temp.clear();
        for i in 0..x.len() {
            for j in i + 1..x.len() {
                if x[j] != x[i] {
                    self.temp.push((y[j] - y[i]) / (x[j] - x[i]));
                }
            }
        }
        self.slope = Self::median(&mut self.temp);
        self.temp.clear();
        for i in 0..x.len() {
            self.temp.push(y[i] - self.slope * x[i]);
        }
        self.inter = Self::median(&mut self.temp);
    }

    fn median(values: &mut [f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        let mid = values.len() / 2;
        *values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    }

    /// Evaluate the fitted line.
    pub fn eval(&self, x: f32) -> f32 {
        self.inter + self.slope * x
    }
}
