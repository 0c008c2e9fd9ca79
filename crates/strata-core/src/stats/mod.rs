//! Sliding-window and order statistics used by the pipeline.

pub mod box_filter;
pub mod local;
pub mod percentile;

pub use box_filter::box_mean;
pub use local::{LocalStats, local_statistics};
pub use percentile::SortedSamples;
