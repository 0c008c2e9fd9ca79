//! Spatial weight kernels for the adaptive filter.

use crate::error::{Result, StrataError};
use crate::params::KernelFalloff;

/// Smallest weight a generated kernel may hold.
pub const KERNEL_FLOOR: f64 = 1e-12;

/// A `(2·radius+1)²` grid of non-negative spatial weights, row-major.
///
/// Generated kernels are symmetric about the center and strictly positive.
/// Kernels built with [`SpatialKernel::from_weights`] only need to be
/// non-negative and may sum to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialKernel {
    radius: usize,
    weights: Vec<f64>,
    total: f64,
}

impl SpatialKernel {
    /// Build a kernel with the given falloff. `alpha` must be finite and
    /// non-negative.
    pub fn new(falloff: KernelFalloff, alpha: f32, radius: usize) -> Result<Self> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(StrataError::invalid(
                "alpha",
                format!("must be finite and non-negative, got {alpha}"),
            ));
        }
        let alpha = alpha as f64;
        let weight = |d2: f64| -> f64 {
            let w = match falloff {
                // alpha = 0 degenerates to a delta at the center; the floor
                // keeps every other weight positive.
                KernelFalloff::Gaussian if alpha == 0.0 => {
                    if d2 == 0.0 { 1.0 } else { 0.0 }
                }
                KernelFalloff::Gaussian => (-d2 / (2.0 * alpha * alpha)).exp(),
                KernelFalloff::ExponentialDecay => (-alpha * d2.sqrt()).exp(),
            };
            w.max(KERNEL_FLOOR)
        };

        let r = radius as isize;
        let mut weights = Vec::with_capacity((2 * radius + 1).pow(2));
        for dy in -r..=r {
            for dx in -r..=r {
                weights.push(weight((dx * dx + dy * dy) as f64));
            }
        }
        Ok(Self::from_parts(radius, weights))
    }

    /// Gaussian falloff with spatial scale `alpha`.
    pub fn gaussian(alpha: f32, radius: usize) -> Result<Self> {
        Self::new(KernelFalloff::Gaussian, alpha, radius)
    }

    /// Exponential falloff `exp(-rate·d)`.
    pub fn exponential_decay(rate: f32, radius: usize) -> Result<Self> {
        Self::new(KernelFalloff::ExponentialDecay, rate, radius)
    }

    /// Use caller-supplied weights, row-major over the footprint.
    pub fn from_weights(radius: usize, weights: Vec<f64>) -> Result<Self> {
        let expected = (2 * radius + 1).pow(2);
        if weights.len() != expected {
            return Err(StrataError::shape(format!(
                "radius {radius} kernel needs {expected} weights, got {}",
                weights.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(StrataError::invalid(
                "kernel",
                format!("weights must be finite and non-negative, got {w}"),
            ));
        }
        Ok(Self::from_parts(radius, weights))
    }

    fn from_parts(radius: usize, weights: Vec<f64>) -> Self {
        let total = weights.iter().sum();
        Self {
            radius,
            weights,
            total,
        }
    }

    /// Neighborhood radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Footprint edge length, `2·radius + 1`.
    pub fn size(&self) -> usize {
        2 * self.radius + 1
    }

    /// All weights, row-major.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weight at offset `(dx, dy)` from the center.
    pub fn weight(&self, dx: isize, dy: isize) -> f64 {
        let r = self.radius as isize;
        let size = self.size() as isize;
        self.weights[((dy + r) * size + dx + r) as usize]
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_symmetric_and_positive() {
        for falloff in [KernelFalloff::Gaussian, KernelFalloff::ExponentialDecay] {
            let kernel = SpatialKernel::new(falloff, 1.3, 4).unwrap();
            assert_eq!(kernel.size(), 9);
            assert_eq!(kernel.weights().len(), 81);
            for dy in -4..=4 {
                for dx in -4..=4 {
                    let w = kernel.weight(dx, dy);
                    assert!(
                        w > 0.0,
                        "{}: weight at ({dx}, {dy}) must be positive",
                        falloff.label()
                    );
                    assert_eq!(w, kernel.weight(-dx, dy));
                    assert_eq!(w, kernel.weight(dx, -dy));
                    assert_eq!(w, kernel.weight(dy, dx));
                }
            }
            assert_eq!(kernel.weight(0, 0), 1.0);
        }
    }

    #[test]
    fn test_zero_alpha_gaussian_is_a_floored_delta() {
        let kernel = SpatialKernel::gaussian(0.0, 2).unwrap();
        assert_eq!(kernel.weight(0, 0), 1.0);
        assert_eq!(kernel.weight(1, 0), KERNEL_FLOOR);
        assert_eq!(kernel.weight(2, 2), KERNEL_FLOOR);
    }

    #[test]
    fn test_zero_rate_decay_is_a_box() {
        let kernel = SpatialKernel::exponential_decay(0.0, 1).unwrap();
        assert!(kernel.weights().iter().all(|&w| w == 1.0));
        assert_eq!(kernel.total(), 9.0);
    }

    #[test]
    fn test_large_falloff_does_not_underflow() {
        let kernel = SpatialKernel::exponential_decay(10.0, 25).unwrap();
        assert_eq!(kernel.weight(25, 25), KERNEL_FLOOR);
    }

    #[test]
    fn test_gaussian_widens_with_alpha() {
        let narrow = SpatialKernel::gaussian(0.5, 3).unwrap();
        let wide = SpatialKernel::gaussian(2.0, 3).unwrap();
        assert!(wide.weight(2, 0) > narrow.weight(2, 0));
    }

    #[test]
    fn test_from_weights_validates() {
        assert!(SpatialKernel::from_weights(1, vec![1.0; 8]).is_err());
        assert!(SpatialKernel::from_weights(1, vec![-1.0; 9]).is_err());
        assert!(SpatialKernel::from_weights(1, vec![f64::NAN; 9]).is_err());
        let zero = SpatialKernel::from_weights(1, vec![0.0; 9]).unwrap();
        assert_eq!(zero.total(), 0.0);
    }

    #[test]
    fn test_negative_alpha_is_rejected() {
        assert!(matches!(
            SpatialKernel::gaussian(-1.0, 2),
            Err(StrataError::InvalidParameter { name: "alpha", .. })
        ));
    }
}
