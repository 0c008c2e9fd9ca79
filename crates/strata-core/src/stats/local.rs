//! Sliding-window mean and variance of a layer.

use crate::error::Result;
use crate::image::Plane;
use crate::stats::box_filter::box_mean;

/// Floor applied to the local variance.
pub const LOCAL_VARIANCE_FLOOR: f32 = 1e-8;

/// Per-pixel local mean and variance of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalStats {
    pub mean: Plane,
    pub variance: Plane,
}

impl LocalStats {
    /// Local standard deviation at pixel index `i`.
    #[inline]
    pub fn std_dev(&self, i: usize) -> f32 {
        self.variance.pixels[i].sqrt()
    }
}

/// `M = box(layer)`, `V = max(box((layer − M)²), 1e-8)`.
///
/// The squared deviation is taken against each pixel's own local mean
/// before the second box pass.
pub fn local_statistics(layer: &Plane, size: usize) -> Result<LocalStats> {
    let mean = box_mean(layer, size)?;
    let squared = layer.zip_map(&mean, |v, m| {
        let d = v - m;
        d * d
    })?;
    let variance = box_mean(&squared, size)?.map(|v| v.max(LOCAL_VARIANCE_FLOOR));
    Ok(LocalStats { mean, variance })
}
