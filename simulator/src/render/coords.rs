//! Mapping source positions to stamp placement geometry.
//!
//! Converts a source's position (in aperture or full-frame coordinates)
//! plus a stamp's pixel dimensions into everything the compositor and the
//! PSF library need: the absolute placement position, the per-axis overlap
//! ranges, and the integer pixel grids covering the overlap region.

use ndarray::Array2;

use crate::render::clip::{clip_axis, clip_axis_unbounded, AxisOverlap, AxisRanges};
use crate::render::GeometryError;

/// Coordinate system a source position is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// Full-detector coordinates (e.g. 2048x2048); positions are offset by
    /// the subarray origin.
    FullFrame,
    /// Aperture output coordinates, including any synthetic expansion of
    /// the output region (grism dispersion).
    Aperture,
}

/// Geometry of the simulated aperture relative to the full detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApertureGeometry {
    /// (x, y) of the subarray's lower-left corner within the full frame.
    pub subarray_origin: (i64, i64),
    /// Side length of the (square) full detector in pixels.
    pub full_frame_size: usize,
    /// (width, height) of the aperture output region.
    pub output_dims: (usize, usize),
    /// (x, y) offset applied to aperture coordinates when the output region
    /// is expanded beyond the detector.
    pub expansion_offset: (i64, i64),
}

impl ApertureGeometry {
    /// Full-frame aperture with no subarray offset and no expansion.
    pub fn full_frame(size: usize) -> Self {
        Self {
            subarray_origin: (0, 0),
            full_frame_size: size,
            output_dims: (size, size),
            expansion_offset: (0, 0),
        }
    }

    /// Subarray aperture at `origin` within a `full_frame_size` detector.
    pub fn subarray(origin: (i64, i64), full_frame_size: usize, output_dims: (usize, usize)) -> Self {
        Self {
            subarray_origin: origin,
            full_frame_size,
            output_dims,
            expansion_offset: (0, 0),
        }
    }

    /// Compute where a stamp lands relative to the output frame.
    ///
    /// `stamp_center_x`/`stamp_center_y` give the source's location within
    /// the stamp image (usually its geometric center). The returned
    /// placement carries the absolute position, per-axis overlap ranges and
    /// the pixel grids for PSF evaluation.
    ///
    /// With `ignore_detector` the ranges are never clamped (and never
    /// miss); the caller is compositing against an expanded synthetic
    /// region rather than the physical detector.
    ///
    /// When there is no overlap the grids are degenerate 2x2 placeholders;
    /// callers must check the overlap ranges before using them.
    ///
    /// # Errors
    /// * `GeometryError::RangeMismatch` - inconsistent caller geometry
    #[allow(clippy::too_many_arguments)]
    pub fn place_stamp(
        &self,
        aperture_x: f64,
        aperture_y: f64,
        stamp_width: usize,
        stamp_height: usize,
        stamp_center_x: f64,
        stamp_center_y: f64,
        coord_sys: CoordinateSystem,
        ignore_detector: bool,
    ) -> Result<StampPlacement, GeometryError> {
        let (x_pos, y_pos, out_width, out_height) = match coord_sys {
            CoordinateSystem::FullFrame => (
                aperture_x + self.subarray_origin.0 as f64,
                aperture_y + self.subarray_origin.1 as f64,
                self.full_frame_size,
                self.full_frame_size,
            ),
            CoordinateSystem::Aperture => (
                aperture_x + self.expansion_offset.0 as f64,
                aperture_y + self.expansion_offset.1 as f64,
                self.output_dims.0,
                self.output_dims.1,
            ),
        };

        let x_start = x_pos - stamp_center_x;
        let y_start = y_pos - stamp_center_y;

        let (x_overlap, y_overlap) = if ignore_detector {
            (
                AxisOverlap::Clipped(clip_axis_unbounded(x_start, stamp_width)),
                AxisOverlap::Clipped(clip_axis_unbounded(y_start, stamp_height)),
            )
        } else {
            (
                clip_axis(x_start, stamp_width, out_width)?,
                clip_axis(y_start, stamp_height, out_height)?,
            )
        };

        let (x_points, y_points) = match (x_overlap.ranges(), y_overlap.ranges()) {
            (Some(xr), Some(yr)) => pixel_grids(&xr, &yr),
            // Degenerate placeholder grids for the no-overlap case
            _ => (Array2::zeros((2, 2)), Array2::zeros((2, 2))),
        };

        Ok(StampPlacement {
            x_pos,
            y_pos,
            x_points,
            y_points,
            x_overlap,
            y_overlap,
        })
    }
}

/// Result of mapping one stamp placement.
#[derive(Debug, Clone)]
pub struct StampPlacement {
    /// Absolute x position of the source in the selected coordinate system.
    pub x_pos: f64,
    /// Absolute y position of the source in the selected coordinate system.
    pub y_pos: f64,
    /// Pixel x coordinates covering the overlap region, row-major.
    pub x_points: Array2<f64>,
    /// Pixel y coordinates covering the overlap region, row-major.
    pub y_points: Array2<f64>,
    pub x_overlap: AxisOverlap,
    pub y_overlap: AxisOverlap,
}

impl StampPlacement {
    /// True when the stamp contributes nothing to the output frame.
    pub fn misses_output(&self) -> bool {
        self.x_overlap.is_miss() || self.y_overlap.is_miss()
    }

    /// Both axis ranges, when the stamp overlaps the output.
    pub fn overlap_ranges(&self) -> Option<(AxisRanges, AxisRanges)> {
        Some((self.x_overlap.ranges()?, self.y_overlap.ranges()?))
    }
}

/// Integer pixel coordinate grids spanning the overlap region, in the same
/// row-major layout as the frame itself (y varies along rows).
fn pixel_grids(xr: &AxisRanges, yr: &AxisRanges) -> (Array2<f64>, Array2<f64>) {
    let shape = (yr.out_len() as usize, xr.out_len() as usize);
    let x_points = Array2::from_shape_fn(shape, |(_, i)| (xr.out_min + i as i64) as f64);
    let y_points = Array2::from_shape_fn(shape, |(j, _)| (yr.out_min + j as i64) as f64);
    (x_points, y_points)
}
