//! Order statistics for robust clip ranges.

/// Samples sorted once so several percentiles can be read cheaply.
#[derive(Debug, Clone)]
pub struct SortedSamples {
    sorted: Vec<f32>,
}

impl SortedSamples {
    /// Sort a copy of `values`. NaN samples are dropped.
    pub fn new(values: &[f32]) -> Self {
        let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f32::total_cmp);
        Self { sorted }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Order statistic at rank `q/100 · (n−1)`, rounded down.
    ///
    /// Rounding towards the bottom of the distribution keeps the value an
    /// actual sample, so clipping to it is a fixed point.
    pub fn lower_percentile(&self, q: f32) -> Option<f32> {
        self.rank(q).map(|r| self.sorted[r.floor() as usize])
    }

    /// Order statistic at rank `q/100 · (n−1)`, rounded up.
    pub fn upper_percentile(&self, q: f32) -> Option<f32> {
        self.rank(q).map(|r| self.sorted[r.ceil() as usize])
    }

    fn rank(&self, q: f32) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let q = (q as f64).clamp(0.0, 100.0);
        Some(q / 100.0 * (self.sorted.len() - 1) as f64)
    }
}
