//! Stage 1: producing the structure layer.
//!
//! The pipeline only needs "a smoothed layer of the same shape". The
//! default is repeated adaptive filtering; an externally computed layer
//! (for example from a bilateral or guided filter) can be dropped in
//! through [`PrecomputedStructure`].

use crate::error::{Result, StrataError};
use crate::filter::AdaptiveFilter;
use crate::image::Plane;
use crate::params::EnhanceParams;

/// Anything that can turn an image into a same-shaped structure layer.
pub trait StructureExtractor {
    fn extract(&self, image: &Plane) -> Result<Plane>;
}

/// `passes` sequential applications of an [`AdaptiveFilter`]. Each pass
/// reads only the previous pass's output.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveSmoother {
    filter: AdaptiveFilter,
    passes: usize,
}

impl AdaptiveSmoother {
    pub fn new(filter: AdaptiveFilter, passes: usize) -> Result<Self> {
        if passes == 0 {
            return Err(StrataError::invalid("k", "at least one pass is required"));
        }
        Ok(Self { filter, passes })
    }

    /// Smoother described by the `alpha`, `kernel_size`, `k` and `falloff`
    /// fields of `params`.
    pub fn from_params(params: &EnhanceParams) -> Result<Self> {
        let filter = AdaptiveFilter::with_falloff(params.falloff, params.alpha, params.radius())?;
        Self::new(filter, params.k)
    }

    pub fn filter(&self) -> &AdaptiveFilter {
        &self.filter
    }

    pub fn passes(&self) -> usize {
        self.passes
    }
}

impl StructureExtractor for AdaptiveSmoother {
    fn extract(&self, image: &Plane) -> Result<Plane> {
        let mut layer = self.filter.apply(image)?;
        for pass in 1..self.passes {
            tracing::trace!(pass, "structure pass");
            layer = self.filter.apply(&layer)?;
        }
        Ok(layer)
    }
}

/// A structure layer computed elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedStructure(Plane);

impl PrecomputedStructure {
    pub fn new(layer: Plane) -> Result<Self> {
        layer.validate()?;
        Ok(Self(layer))
    }

    pub fn layer(&self) -> &Plane {
        &self.0
    }
}

impl StructureExtractor for PrecomputedStructure {
    fn extract(&self, image: &Plane) -> Result<Plane> {
        image.ensure_same_shape(&self.0)?;
        Ok(self.0.clone())
    }
}
