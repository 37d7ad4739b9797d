//! Per-axis overlap clipping between a stamp image and an output frame.
//!
//! A stamp placed at an arbitrary (possibly fractional, possibly negative)
//! position overlaps the output frame in one of three ways per axis: fully
//! inside, partially off one or both edges, or entirely off-frame. The
//! clipper reduces all of those to a pair of index ranges, one on the
//! output and one on the stamp, that are guaranteed to have equal length.

use crate::render::GeometryError;

/// Clipped index ranges along one axis.
///
/// `out_min..out_max` indexes the output frame, `stamp_min..stamp_max`
/// indexes the stamp. Both half-open ranges always have the same length.
/// Indices are `i64` because the unclamped path (see
/// [`clip_axis_unbounded`]) may legitimately produce negative output
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRanges {
    pub out_min: i64,
    pub out_max: i64,
    pub stamp_min: i64,
    pub stamp_max: i64,
}

impl AxisRanges {
    /// Length of the output-side range.
    pub fn out_len(&self) -> i64 {
        self.out_max - self.out_min
    }

    /// Length of the stamp-side range.
    pub fn stamp_len(&self) -> i64 {
        self.stamp_max - self.stamp_min
    }
}

/// Result of clipping one axis: either a valid pair of ranges, or no
/// overlap at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOverlap {
    Clipped(AxisRanges),
    Miss,
}

impl AxisOverlap {
    /// The clipped ranges, if the stamp overlaps the output on this axis.
    pub fn ranges(&self) -> Option<AxisRanges> {
        match self {
            AxisOverlap::Clipped(ranges) => Some(*ranges),
            AxisOverlap::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, AxisOverlap::Miss)
    }
}

/// Clip a stamp of length `stamp_len` placed at `output_start` against an
/// output axis of length `output_len`.
///
/// `output_start` is the (possibly fractional) output coordinate where
/// stamp index 0 lands. A stamp hanging off either edge is trimmed on that
/// side; a stamp entirely off either edge yields [`AxisOverlap::Miss`].
///
/// Because the clamped endpoints are floored independently, the two range
/// lengths can disagree by one pixel for fractional starts. That one-unit
/// disagreement is reconciled by growing the shorter range: from the start
/// when its start index is above zero, otherwise at the end. A larger
/// disagreement means the caller's geometry is inconsistent and is a fatal
/// [`GeometryError::RangeMismatch`].
///
/// # Errors
/// * `GeometryError::RangeMismatch` - range lengths differ by more than one
pub fn clip_axis(
    output_start: f64,
    stamp_len: usize,
    output_len: usize,
) -> Result<AxisOverlap, GeometryError> {
    let len_stamp = stamp_len as f64;
    let len_out = output_len as f64;

    let mut out_min = output_start;
    let mut out_max = output_start + len_stamp;
    let mut stamp_min = 0.0;
    let mut stamp_max = len_stamp;

    // Left edge of the stamp is off the edge of the output
    if out_min < 0.0 {
        if out_min >= -len_stamp {
            stamp_min = -out_min;
            out_min = 0.0;
        } else {
            return Ok(AxisOverlap::Miss);
        }
    }

    // Right edge of the stamp is off the edge of the output
    if out_max > len_out {
        if out_max <= len_out + len_stamp {
            stamp_max = len_stamp - (out_max - len_out);
            out_max = len_out;
        } else {
            return Ok(AxisOverlap::Miss);
        }
    }

    let mut ranges = AxisRanges {
        out_min: out_min.floor() as i64,
        out_max: out_max.floor() as i64,
        stamp_min: stamp_min.floor() as i64,
        stamp_max: stamp_max.floor() as i64,
    };

    let d_out = ranges.out_len();
    let d_stamp = ranges.stamp_len();
    if d_out == d_stamp {
        // Already consistent
    } else if d_out == d_stamp + 1 {
        if ranges.stamp_min > 0 {
            ranges.stamp_min -= 1;
        } else {
            ranges.stamp_max += 1;
        }
    } else if d_stamp == d_out + 1 {
        if ranges.out_min > 0 {
            ranges.out_min -= 1;
        } else {
            ranges.out_max += 1;
        }
    } else {
        return Err(GeometryError::RangeMismatch {
            output: (ranges.out_min, ranges.out_max),
            stamp: (ranges.stamp_min, ranges.stamp_max),
        });
    }

    // A zero-length overlap (stamp exactly abutting an edge) contributes
    // nothing and is reported as a miss.
    if ranges.out_len() == 0 {
        return Ok(AxisOverlap::Miss);
    }

    Ok(AxisOverlap::Clipped(ranges))
}

/// Place a stamp without clamping against the output bounds.
///
/// Used when the overlap is computed against an expanded synthetic region
/// (grism dispersion) rather than the physical detector: the full stamp
/// range is always returned, and the output range may extend past the
/// detector or go negative.
pub fn clip_axis_unbounded(output_start: f64, stamp_len: usize) -> AxisRanges {
    let out_min = output_start.floor() as i64;
    AxisRanges {
        out_min,
        out_max: out_min + stamp_len as i64,
        stamp_min: 0,
        stamp_max: stamp_len as i64,
    }
}
