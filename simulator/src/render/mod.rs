//! Moving-target rendering pipeline.
//!
//! This module contains the geometric and radiometric machinery for placing
//! a moving source into a sequence of detector frames:
//!
//! - **Boundary clipping** ([`clip`]): per-axis overlap between a stamp
//!   image and the output frame, with edge-of-frame reconciliation
//! - **Coordinate mapping** ([`coords`]): source position plus stamp
//!   dimensions to output-frame overlap ranges and PSF evaluation grids
//! - **PSF stamp building** ([`psf`]): evaluating a gridded PSF model at a
//!   sub-pixel location, optionally composited with low-resolution wings
//! - **Frame compositing** ([`moving_target`]): accumulating time-scaled
//!   stamp flux into the frames of an integration
//! - **Resampling** ([`resample`]): flux-conserving oversampling helpers
//!
//! The pipeline is purely computational: all inputs and outputs are
//! in-memory `ndarray` arrays and there is no I/O in the hot path. Frames
//! within one integration are processed strictly in order because each
//! frame builds on the previous frame's accumulated signal.

use thiserror::Error;

pub mod clip;
pub mod coords;
pub mod moving_target;
pub mod psf;
pub mod resample;

/// Fatal geometry invariant violations.
///
/// Both variants indicate a caller bug (inconsistent stamp/output
/// geometry), never a data condition, so there is no recovery path: the
/// render of the current source is aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The clipped output and stamp ranges on one axis differ by more than
    /// one pixel after floor/ceil reconciliation.
    #[error("clipped output range {output:?} and stamp range {stamp:?} differ by more than one pixel")]
    RangeMismatch {
        output: (i64, i64),
        stamp: (i64, i64),
    },

    /// The clipped output region and the clipped stamp region disagree in
    /// shape, or the stamp range runs past the stamp image itself.
    #[error("clipped output region {output:?} does not match stamp region {stamp:?}")]
    ShapeMismatch {
        output: (usize, usize),
        stamp: (usize, usize),
    },
}
