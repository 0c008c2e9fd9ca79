//! Stage 6: robust clip followed by a linear stretch to the output range.
//!
//! ```text
//! [lo, hi] = clip_range(I_o)
//! c        = clamp(I_o, lo, hi)
//! result   = (c − min c) / (max c − min c) · 255
//! ```
//!
//! A zero-width (or empty) clipped range maps every pixel to 0.

use crate::error::Result;
use crate::image::Plane;
use crate::params::{DEFAULT_SIGMAS, RescalePolicy};
use crate::stats::SortedSamples;

/// Upper end of the output intensity range. The lower end is 0.
pub const OUTPUT_MAX: f32 = 255.0;

/// Clip bounds for `layer` under `policy`.
///
/// Percentile bounds are actual samples (see
/// [`SortedSamples::lower_percentile`]), which makes the rescale a fixed
/// point once applied.
pub fn clip_range(layer: &Plane, policy: &RescalePolicy) -> Result<(f32, f32)> {
    layer.validate()?;
    policy.validate()?;
    let bounds = match *policy {
        RescalePolicy::Percentile { low, high } => {
            let samples = SortedSamples::new(&layer.pixels);
            let (min, max) = layer.min_max();
            (
                samples.lower_percentile(low).unwrap_or(min),
                samples.upper_percentile(high).unwrap_or(max),
            )
        }
        RescalePolicy::MeanStdDev { sigmas } => {
            let k = sigmas.unwrap_or(DEFAULT_SIGMAS) as f64;
            let (mean, std) = layer.mean_std();
            ((mean - k * std) as f32, (mean + k * std) as f32)
        }
    };
    Ok(bounds)
}

/// Clip `layer` to its robust range and stretch it to `[0, OUTPUT_MAX]`.
pub fn tonal_rescale(layer: &Plane, policy: &RescalePolicy) -> Result<Plane> {
    let (lo, hi) = clip_range(layer, policy)?;
    if !(lo <= hi) {
        return Ok(layer.map(|_| 0.0));
    }

    let clipped = layer.map(|v| v.clamp(lo, hi));
    let (min, max) = clipped.min_max();
    let span = max as f64 - min as f64;
    if !(span > 0.0) {
        return Ok(clipped.map(|_| 0.0));
    }

    let scale = OUTPUT_MAX as f64 / span;
    Ok(clipped.map(|v| (((v as f64 - min as f64) * scale) as f32).clamp(0.0, OUTPUT_MAX)))
}
