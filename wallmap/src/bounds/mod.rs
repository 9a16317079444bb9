//! Extents, rectangle filters and bounds analysis.
//!
//! All coordinates here are planar (Web Mercator in practice). The
//! [`BoundsFilter`] classifies features by centroid with strict inequality,
//! so a centroid lying exactly on an edge is outside.

mod extent;
mod filter;
pub mod presets;
mod report;

pub use extent::Extent;
pub use filter::{BoundsFilter, Partition};
pub use report::{BoundsReport, RECOMMENDED_PADDING, SUGGESTED_PADDING};
