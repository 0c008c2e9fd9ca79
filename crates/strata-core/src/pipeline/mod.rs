//! The six-stage enhancement pipeline.
//!
//! 1. Structure extraction (`mask`): `k` adaptive filter passes
//! 2. Detail extraction (`diff`): `I − I_k`
//! 3. Local mean/variance of the detail layer
//! 4. Masking (`Im`): keep `I` or `I_k` per pixel
//! 5. Recombination (`final`): `I − s·Im`
//! 6. Tonal rescale (`result`)
//!
//! Every stage allocates its own output; nothing is shared between runs.

pub mod rescale;
pub mod stages;
pub mod steps;
pub mod structure;

use std::time::Instant;

use crate::error::Result;
use crate::image::Plane;
use crate::params::EnhanceParams;
use crate::stats::local_statistics;

pub use rescale::{OUTPUT_MAX, clip_range, tonal_rescale};
pub use stages::{Discriminant, detail_layer, discriminate, recombine};
pub use steps::{StepId, StepOutputs};
pub use structure::{AdaptiveSmoother, PrecomputedStructure, StructureExtractor};

/// A validated parameter set, ready to run on any number of images.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhancer {
    params: EnhanceParams,
}

impl Enhancer {
    pub fn new(params: EnhanceParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &EnhanceParams {
        &self.params
    }

    /// Run all stages with the adaptive smoother as stage 1.
    pub fn run(&self, image: &Plane) -> Result<StepOutputs> {
        let smoother = AdaptiveSmoother::from_params(&self.params)?;
        self.run_with(image, &smoother)
    }

    /// Run all stages with a caller-chosen structure extractor.
    pub fn run_with(
        &self,
        image: &Plane,
        extractor: &dyn StructureExtractor,
    ) -> Result<StepOutputs> {
        image.validate()?;
        let p = &self.params;
        let started = Instant::now();

        let mask = extractor.extract(image)?;
        image.ensure_same_shape(&mask)?;
        tracing::debug!(
            width = image.width,
            height = image.height,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "structure layer extracted"
        );

        let diff = detail_layer(image, &mask)?;

        let stats = local_statistics(&diff, p.local_var_size)?;
        tracing::debug!(window = p.local_var_size, "local statistics computed");

        let discriminant = discriminate(image, &mask, &diff, &stats, p.threshold, p.discriminant)?;
        tracing::debug!(
            kept = discriminant.kept_count(),
            total = image.pixels.len(),
            policy = p.discriminant.label(),
            "masking applied"
        );

        let final_layer = recombine(image, &discriminant.masked, p.final_weight)?;

        let policy = p.rescale.resolve(p.threshold);
        let result = tonal_rescale(&final_layer, &policy)?;
        tracing::debug!(
            policy = policy.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline finished"
        );

        Ok(StepOutputs {
            mask,
            diff,
            masked: discriminant.masked,
            final_layer,
            result,
            keep_original: discriminant.keep_original,
        })
    }
}

/// Validate `params` and run the full pipeline on `image`.
pub fn pipeline(image: &Plane, params: &EnhanceParams) -> Result<StepOutputs> {
    Enhancer::new(params.clone())?.run(image)
}
