//! Adaptive local filtering: spatial kernels and the edge-preserving
//! estimator built on them.

pub mod adaptive;
pub mod kernel;

pub use adaptive::{AdaptiveFilter, Refinement, filter};
pub use kernel::SpatialKernel;
