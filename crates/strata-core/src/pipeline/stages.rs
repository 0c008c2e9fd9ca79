//! Stages 2, 4 and 5: detail extraction, masking, recombination.

use crate::error::Result;
use crate::image::Plane;
use crate::params::DiscriminantPolicy;
use crate::stats::LocalStats;

/// `I_d = I − I_k`.
pub fn detail_layer(image: &Plane, structure: &Plane) -> Result<Plane> {
    image.zip_map(structure, |i, s| i - s)
}

/// Result of the masking stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminant {
    /// Per-pixel decision, row-major: `true` keeps the original sample.
    pub keep_original: Vec<bool>,
    /// `Im`: the original where kept, the structure layer elsewhere.
    pub masked: Plane,
}

impl Discriminant {
    /// Number of pixels that kept the original sample.
    pub fn kept_count(&self) -> usize {
        self.keep_original.iter().filter(|&&k| k).count()
    }
}

/// Classify every detail sample against `threshold` local standard
/// deviations and select between the original and the structure layer.
///
/// ```text
/// deviation = |I_d − M|
/// bound     = threshold · √V
/// Im        = policy(deviation, bound) ? I : I_k
/// ```
pub fn discriminate(
    image: &Plane,
    structure: &Plane,
    detail: &Plane,
    stats: &LocalStats,
    threshold: f32,
    policy: DiscriminantPolicy,
) -> Result<Discriminant> {
    image.ensure_same_shape(structure)?;
    image.ensure_same_shape(detail)?;
    image.ensure_same_shape(&stats.mean)?;
    image.ensure_same_shape(&stats.variance)?;

    let n = image.pixels.len();
    let mut keep_original = Vec::with_capacity(n);
    let mut pixels = Vec::with_capacity(n);
    for i in 0..n {
        let deviation = (detail.pixels[i] - stats.mean.pixels[i]).abs();
        let bound = threshold * stats.std_dev(i);
        let keep = policy.keeps_original(deviation, bound);
        keep_original.push(keep);
        pixels.push(if keep {
            image.pixels[i]
        } else {
            structure.pixels[i]
        });
    }

    Ok(Discriminant {
        keep_original,
        masked: Plane {
            width: image.width,
            height: image.height,
            pixels,
        },
    })
}

/// `I_o = I − s · Im`.
pub fn recombine(image: &Plane, masked: &Plane, final_weight: f32) -> Result<Plane> {
    image.zip_map(masked, |i, m| i - final_weight * m)
}
