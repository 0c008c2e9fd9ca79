//! Strata Core: adaptive edge-preserving enhancement for single-channel
//! images.
//!
//! An image is split into a smooth structure layer (repeated adaptive
//! filtering) and a detail layer, detail is classified as noise or edge
//! from sliding-window statistics, and the layers are recombined and
//! tonally rescaled. Pure computation: no I/O, no global state.

pub mod error;
pub mod filter;
pub mod image;
pub mod params;
pub mod pipeline;
pub mod stats;

// Re-exports for convenience.
pub use error::{Result, StrataError};
pub use filter::{AdaptiveFilter, SpatialKernel, filter};
pub use image::Plane;
pub use params::{DiscriminantPolicy, EnhanceParams, KernelFalloff, RescalePolicy};
pub use pipeline::{
    AdaptiveSmoother, Enhancer, PrecomputedStructure, StepId, StepOutputs, StructureExtractor,
    pipeline,
};
