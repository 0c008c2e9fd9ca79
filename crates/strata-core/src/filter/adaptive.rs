//! Locally adaptive, edge-preserving estimator.
//!
//! Each output pixel is a bilateral-style weighted mean of its neighborhood
//! where the range bandwidth comes from the neighborhood's own spatially
//! weighted variance instead of a global constant. Flat regions get a wide
//! range kernel and are smoothed heavily; edges and texture raise the local
//! variance and are smoothed less.
//!
//! # Algorithm
//! For the patch `P` around a pixel, with spatial weights `w`:
//! ```text
//! y_bar = Σ(w·P) / Σw
//! var   = max(Σ(w·(P − y_bar)²) / Σw, 1e-8)
//! p     = 1 / (2·var)
//! y₀    = y_bar
//! y₊    = Σ(w·e^(−p·(P − yₙ)²)·P) / Σ(w·e^(−p·(P − yₙ)²))
//! ```
//! The last step is iterated a bounded number of times, stopping once the
//! update falls below `1e-4` or the combined weight collapses below `1e-12`.
//!
//! Sums are accumulated in `f64` relative to the center sample `c`
//! (`c + Σ w·(P − c) / Σ w`), so a flat patch reproduces `c` exactly.
//!
//! # Complexity
//! O(W × H × (2r+1)² × rounds) per pass.

use crate::error::Result;
use crate::filter::kernel::SpatialKernel;
use crate::image::Plane;
use crate::params::KernelFalloff;

/// Floor applied to the local variance before deriving the range precision.
pub const VARIANCE_FLOOR: f64 = 1e-8;
/// Refinement stops once an update moves the estimate less than this.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-4;
/// Combined weight below which a refinement round is discarded.
pub const WEIGHT_COLLAPSE: f64 = 1e-12;
/// Default bound on refinement rounds per pixel.
pub const DEFAULT_REFINEMENT_ROUNDS: usize = 3;

/// Outcome of refining one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    /// Final estimate.
    pub value: f64,
    /// Refinement rounds that produced an update.
    pub rounds: usize,
    /// Whether the last update fell below the convergence tolerance.
    pub converged: bool,
}

/// The adaptive local filter: a spatial kernel plus a refinement bound.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveFilter {
    kernel: SpatialKernel,
    max_rounds: usize,
}

impl AdaptiveFilter {
    /// Gaussian-falloff filter with spatial scale `alpha`.
    pub fn new(alpha: f32, radius: usize) -> Result<Self> {
        Self::with_falloff(KernelFalloff::Gaussian, alpha, radius)
    }

    /// Filter with an explicit falloff shape.
    pub fn with_falloff(falloff: KernelFalloff, alpha: f32, radius: usize) -> Result<Self> {
        Ok(Self::from_kernel(SpatialKernel::new(falloff, alpha, radius)?))
    }

    /// Filter around a prebuilt kernel.
    pub fn from_kernel(kernel: SpatialKernel) -> Self {
        Self {
            kernel,
            max_rounds: DEFAULT_REFINEMENT_ROUNDS,
        }
    }

    /// Override the refinement bound. Zero rounds returns the weighted mean.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn kernel(&self) -> &SpatialKernel {
        &self.kernel
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Run one full pass over `image`, producing a new plane of the same
    /// shape. Every pixel reads only from `image`.
    pub fn apply(&self, image: &Plane) -> Result<Plane> {
        image.validate()?;

        let mut patch = vec![0.0_f64; self.kernel.weights().len()];
        let mut pixels = Vec::with_capacity(image.pixels.len());
        let mut unconverged = 0usize;

        for y in 0..image.height {
            for x in 0..image.width {
                self.gather(image, x, y, &mut patch);
                let refined = self.refine(&patch, image.get(x, y) as f64);
                if !refined.converged {
                    unconverged += 1;
                }
                pixels.push(refined.value as f32);
            }
        }

        tracing::trace!(
            width = image.width,
            height = image.height,
            radius = self.kernel.radius(),
            unconverged,
            "adaptive filter pass"
        );

        Ok(Plane {
            width: image.width,
            height: image.height,
            pixels,
        })
    }

    /// Estimate a single pixel. Panics if `(x, y)` is outside `image`.
    pub fn estimate(&self, image: &Plane, x: usize, y: usize) -> Refinement {
        let mut patch = vec![0.0_f64; self.kernel.weights().len()];
        self.gather(image, x, y, &mut patch);
        self.refine(&patch, image.get(x, y) as f64)
    }

    /// Copy the edge-replicated footprint around `(x, y)` into `patch`.
    fn gather(&self, image: &Plane, x: usize, y: usize, patch: &mut [f64]) {
        let r = self.kernel.radius() as isize;
        let (cx, cy) = (x as isize, y as isize);
        let mut i = 0;
        for dy in -r..=r {
            for dx in -r..=r {
                patch[i] = image.get_replicated(cx + dx, cy + dy) as f64;
                i += 1;
            }
        }
    }

    /// Bounded fixed-point refinement of one patch around center value `c`.
    fn refine(&self, patch: &[f64], c: f64) -> Refinement {
        let weights = self.kernel.weights();
        let total = self.kernel.total();
        if total <= 0.0 {
            // Degenerate kernel: nothing to average, keep the pixel.
            return Refinement {
                value: c,
                rounds: 0,
                converged: true,
            };
        }

        let offset: f64 = weights.iter().zip(patch).map(|(w, v)| w * (v - c)).sum();
        let y_bar = c + offset / total;

        let spread: f64 = weights
            .iter()
            .zip(patch)
            .map(|(w, v)| {
                let d = v - y_bar;
                w * d * d
            })
            .sum();
        let variance = (spread / total).max(VARIANCE_FLOOR);
        let precision = 1.0 / (2.0 * variance);

        let mut estimate = y_bar;
        let mut rounds = 0;
        let mut converged = false;
        for _ in 0..self.max_rounds {
            let mut num = 0.0_f64;
            let mut den = 0.0_f64;
            for (w, v) in weights.iter().zip(patch) {
                let d = v - estimate;
                let wt = w * (-precision * d * d).exp();
                num += wt * (v - c);
                den += wt;
            }
            if den < WEIGHT_COLLAPSE {
                break;
            }
            rounds += 1;
            let next = c + num / den;
            let step = (next - estimate).abs();
            estimate = next;
            if step < CONVERGENCE_TOLERANCE {
                converged = true;
                break;
            }
        }

        Refinement {
            value: estimate,
            rounds,
            converged,
        }
    }
}

/// One pass of the Gaussian-falloff adaptive filter with the default
/// refinement bound.
pub fn filter(image: &Plane, alpha: f32, radius: usize) -> Result<Plane> {
    AdaptiveFilter::new(alpha, radius)?.apply(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_edge(width: usize, height: usize) -> Plane {
        Plane::from_fn(width, height, |x, _| if x < width / 2 { 20.0 } else { 220.0 }).unwrap()
    }

    #[test]
    fn test_flat_image_is_a_fixed_point() {
        let image = Plane::filled(9, 7, 128.0).unwrap();
        let out = filter(&image, 2.0, 3).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_flat_patch_converges_immediately() {
        let image = Plane::filled(5, 5, 77.0).unwrap();
        let filter = AdaptiveFilter::new(1.0, 2).unwrap();
        let refined = filter.estimate(&image, 2, 2);
        assert_eq!(refined.value, 77.0);
        assert_eq!(refined.rounds, 1);
        assert!(refined.converged);
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let image = Plane::from_fn(6, 4, |x, y| (x * 7 + y * 13) as f32).unwrap();
        let out = filter(&image, 1.0, 0).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_zero_weight_kernel_keeps_original_pixels() {
        let image = Plane::from_fn(5, 5, |x, y| (x + 10 * y) as f32).unwrap();
        let kernel = SpatialKernel::from_weights(1, vec![0.0; 9]).unwrap();
        let out = AdaptiveFilter::from_kernel(kernel).apply(&image).unwrap();
        assert_eq!(out, image);
        assert!(out.is_finite());
    }

    #[test]
    fn test_step_edge_is_preserved() {
        let image = step_edge(16, 8);
        let out = filter(&image, 0.5, 3).unwrap();
        for y in 0..8 {
            let dark = out.get(7, y);
            let bright = out.get(8, y);
            assert!(dark < 40.0, "dark side bled: {dark}");
            assert!(bright > 200.0, "bright side bled: {bright}");
        }
    }

    #[test]
    fn test_noise_is_suppressed_on_flat_region() {
        // Checkerboard of ±4 around 100.
        let image =
            Plane::from_fn(12, 12, |x, y| if (x + y) % 2 == 0 { 104.0 } else { 96.0 }).unwrap();
        let out = filter(&image, 1.5, 3).unwrap();
        let interior: Vec<f32> = (3..9)
            .flat_map(|y| (3..9).map(move |x| (x, y)))
            .map(|(x, y)| out.get(x, y))
            .collect();
        let lo = interior.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = interior.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(hi - lo < 1.0, "residual ripple {} too large", hi - lo);
    }

    #[test]
    fn test_collapsed_weights_keep_previous_estimate() {
        let image = Plane::from_rows(&[
            vec![0.0, 0.0, 0.0],
            vec![0.0, 9.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let kernel = SpatialKernel::from_weights(1, vec![1e-13; 9]).unwrap();
        let refined = AdaptiveFilter::from_kernel(kernel).estimate(&image, 1, 1);
        assert!((refined.value - 1.0).abs() < 1e-9, "got {}", refined.value);
        assert_eq!(refined.rounds, 0);
        assert!(!refined.converged);
    }

    #[test]
    fn test_zero_rounds_returns_weighted_mean() {
        let image = Plane::from_rows(&[
            vec![0.0, 0.0, 0.0],
            vec![0.0, 9.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let kernel = SpatialKernel::exponential_decay(0.0, 1).unwrap();
        let filter = AdaptiveFilter::from_kernel(kernel).with_max_rounds(0);
        let refined = filter.estimate(&image, 1, 1);
        assert!((refined.value - 1.0).abs() < 1e-12);
        assert_eq!(refined.rounds, 0);
        assert!(!refined.converged);
    }

    #[test]
    fn test_output_is_finite_on_extreme_contrast() {
        let image =
            Plane::from_fn(8, 8, |x, y| if (x * y) % 3 == 0 { 0.0 } else { 1.0e6 }).unwrap();
        let out = AdaptiveFilter::with_falloff(KernelFalloff::ExponentialDecay, 10.0, 5)
            .unwrap()
            .apply(&image)
            .unwrap();
        assert!(out.is_finite());
    }
}
