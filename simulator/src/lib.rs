//! Moving-target image simulation for space telescope instrument planning.
//!
//! Given a source moving across a detector during an exposure composed of
//! multiple sub-frame reads, this crate distributes the source's flux
//! across output pixels and across time: a point-spread-function stamp is
//! evaluated at the source's sub-pixel location, cropped against the
//! detector boundaries, and accumulated into each frame of the integration
//! scaled by that frame's share of the exposure.
//!
//! The pipeline is a pure computation over in-memory arrays. Sequential
//! frames of one integration depend on each other; independent sources are
//! embarrassingly parallel as long as the shared PSF model supports
//! concurrent read-only evaluation.
//!
//! # Example
//!
//! ```
//! use ndarray::Array2;
//! use simulator::{render_integration, FrameSamples};
//!
//! // One frame, one sub-position: a 3x3 stamp dropped at (4, 4)
//! let frame = FrameSamples {
//!     stamps: vec![Array2::from_elem((3, 3), 1.0)],
//!     x: vec![5.0],
//!     y: vec![5.0],
//!     stamp_min_x: vec![4.0],
//!     stamp_min_y: vec![4.0],
//!     times: vec![0.0],
//! };
//!
//! let cube = render_integration(&[frame], 10.0, 10, 10).unwrap();
//! assert_eq!(cube[[0, 5, 5]], 10.0);
//! ```

pub mod render;
pub mod trajectory;

pub use render::clip::{clip_axis, clip_axis_unbounded, AxisOverlap, AxisRanges};
pub use render::coords::{ApertureGeometry, CoordinateSystem, StampPlacement};
pub use render::moving_target::{add_streak, render_integration, FrameSamples};
pub use render::psf::{GaussianPsf, PsfModel, PsfStamp, PsfStampBuilder};
pub use render::resample::{resample, subsample};
pub use render::GeometryError;
