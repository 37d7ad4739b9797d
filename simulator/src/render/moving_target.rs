//! Compositing a moving source into the frames of an integration.
//!
//! Each detector readout (frame) accumulates on top of the previous one,
//! simulating a non-destructive read. Within a frame the source's motion
//! is approximated by a list of sub-position samples; the frame's exposure
//! time is split evenly across them so the streaked source conserves
//! energy regardless of how finely it is sampled.

use log::error;
use ndarray::{s, Array2, Array3, Axis};

use crate::render::clip::clip_axis;
use crate::render::GeometryError;

/// One frame's worth of stamp placements.
///
/// Entry `i` of every vector describes sub-position sample `i`: the stamp
/// image to add, the nominal source position, the output-frame coordinate
/// of the stamp's lower-left corner, and the timestamp of the sample.
#[derive(Debug, Clone, Default)]
pub struct FrameSamples {
    pub stamps: Vec<Array2<f64>>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub stamp_min_x: Vec<f64>,
    pub stamp_min_y: Vec<f64>,
    pub times: Vec<f64>,
}

impl FrameSamples {
    /// Number of sub-position samples in this frame.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

/// Composite a full integration of a moving source.
///
/// Returns the 3D flux cube (frame count x height x width), in the units
/// of the input stamps scaled by exposure time. Frame `i` holds the signal
/// accumulated up to and including readout `i`; frames where the source is
/// entirely off the field of view repeat the previous frame unchanged.
///
/// Frames are processed strictly in order: each depends on the previous
/// frame's accumulated state.
///
/// # Errors
/// * `GeometryError` - clipped stamp/output regions disagree (caller bug)
pub fn render_integration(
    frames: &[FrameSamples],
    total_frame_time: f64,
    out_width: usize,
    out_height: usize,
) -> Result<Array3<f64>, GeometryError> {
    let mut cube = Array3::zeros((frames.len(), out_height, out_width));
    let mut buffer: Array2<f64> = Array2::zeros((out_height, out_width));

    let (stamp_h, stamp_w) = frames
        .first()
        .and_then(|frame| frame.stamps.first())
        .map(|stamp| stamp.dim())
        .unwrap_or((0, 0));

    for (index, frame) in frames.iter().enumerate() {
        if !frame_misses_output(frame, stamp_w, stamp_h, out_width, out_height) {
            add_streak(&mut buffer, frame, total_frame_time)?;
        }
        cube.index_axis_mut(Axis(0), index).assign(&buffer);
    }

    Ok(cube)
}

/// True when every sub-position of the frame is beyond the output in a
/// single direction (fully above/right, or fully below/left), tested
/// against the stamp size. Such frames carry the previous buffer forward.
fn frame_misses_output(
    frame: &FrameSamples,
    stamp_w: usize,
    stamp_h: usize,
    out_width: usize,
    out_height: usize,
) -> bool {
    if frame.is_empty() {
        return true;
    }

    let above_or_right = frame.x.iter().all(|&x| x - stamp_w as f64 > out_width as f64)
        || frame.y.iter().all(|&y| y - stamp_h as f64 > out_height as f64);
    let below_or_left = frame.x.iter().all(|&x| x + (stamp_w as f64) < 0.0)
        || frame.y.iter().all(|&y| y + (stamp_h as f64) < 0.0);

    above_or_right || below_or_left
}

/// Smear the source across `frame` by adding every sub-position sample,
/// each scaled to its share of the frame's exposure time.
///
/// Samples whose stamp misses the frame entirely are skipped silently;
/// that is the normal situation while a source enters or leaves the field.
pub fn add_streak(
    frame: &mut Array2<f64>,
    samples: &FrameSamples,
    total_frame_time: f64,
) -> Result<(), GeometryError> {
    let (frame_h, frame_w) = frame.dim();
    let scale = total_frame_time / samples.len() as f64;

    for i in 0..samples.len() {
        let stamp = &samples.stamps[i];
        let (src_h, src_w) = stamp.dim();

        let x_overlap = clip_axis(samples.stamp_min_x[i], src_w, frame_w)?;
        let y_overlap = clip_axis(samples.stamp_min_y[i], src_h, frame_h)?;
        let (Some(xr), Some(yr)) = (x_overlap.ranges(), y_overlap.ranges()) else {
            continue;
        };

        // Bounded clipping guarantees non-negative indices
        let (ox0, ox1) = (xr.out_min as usize, xr.out_max as usize);
        let (oy0, oy1) = (yr.out_min as usize, yr.out_max as usize);
        let (sx0, sx1) = (xr.stamp_min as usize, xr.stamp_max as usize);
        let (sy0, sy1) = (yr.stamp_min as usize, yr.stamp_max as usize);

        let out_shape = (oy1 - oy0, ox1 - ox0);
        let stamp_shape = (sy1 - sy0, sx1 - sx0);
        if out_shape != stamp_shape || sx1 > src_w || sy1 > src_h {
            error!(
                "mis-matched stamp/output regions: output rows {oy0}..{oy1} cols {ox0}..{ox1} \
                 vs stamp rows {sy0}..{sy1} cols {sx0}..{sx1} for a {src_h}x{src_w} stamp \
                 with corner ({}, {}) at position ({}, {})",
                samples.stamp_min_x[i], samples.stamp_min_y[i], samples.x[i], samples.y[i]
            );
            return Err(GeometryError::ShapeMismatch {
                output: out_shape,
                stamp: stamp_shape,
            });
        }

        frame
            .slice_mut(s![oy0..oy1, ox0..ox1])
            .scaled_add(scale, &stamp.slice(s![sy0..sy1, sx0..sx1]));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_frame(
        stamp: Array2<f64>,
        positions: &[(f64, f64)],
        corners: &[(f64, f64)],
    ) -> FrameSamples {
        FrameSamples {
            stamps: vec![stamp; positions.len()],
            x: positions.iter().map(|p| p.0).collect(),
            y: positions.iter().map(|p| p.1).collect(),
            stamp_min_x: corners.iter().map(|c| c.0).collect(),
            stamp_min_y: corners.iter().map(|c| c.1).collect(),
            times: (0..positions.len()).map(|i| i as f64).collect(),
        }
    }

    #[test]
    fn test_single_sample_block() {
        // 3x3 all-ones stamp at corner (4, 4) with a 10 s frame and one
        // sample gives a 3x3 block of 10.0 at rows/cols 4..=6
        let stamp = Array2::from_elem((3, 3), 1.0);
        let frame = uniform_frame(stamp, &[(5.0, 5.0)], &[(4.0, 4.0)]);

        let cube = render_integration(&[frame], 10.0, 10, 10).unwrap();
        assert_eq!(cube.dim(), (1, 10, 10));

        for y in 0..10 {
            for x in 0..10 {
                let expected = if (4..=6).contains(&y) && (4..=6).contains(&x) {
                    10.0
                } else {
                    0.0
                };
                assert_relative_eq!(cube[[0, y, x]], expected);
            }
        }
    }

    #[test]
    fn test_energy_conservation_independent_of_sampling() {
        // A stamp fully inside the frame must deposit sum * frame_time
        // whatever the sub-sample count
        let stamp = Array2::from_elem((5, 5), 0.04); // sum = 1.0
        let frame_time = 8.0;

        for n in [1usize, 3, 10, 57] {
            let positions: Vec<(f64, f64)> = (0..n).map(|_| (10.0, 10.0)).collect();
            let corners: Vec<(f64, f64)> = (0..n).map(|_| (8.0, 8.0)).collect();
            let frame = uniform_frame(stamp.clone(), &positions, &corners);

            let cube = render_integration(&[frame], frame_time, 20, 20).unwrap();
            assert_relative_eq!(
                cube.index_axis(Axis(0), 0).sum(),
                frame_time,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_frames_accumulate() {
        let stamp = Array2::from_elem((3, 3), 1.0);
        let make = || uniform_frame(stamp.clone(), &[(5.0, 5.0)], &[(4.0, 4.0)]);

        let cube = render_integration(&[make(), make(), make()], 2.0, 10, 10).unwrap();
        assert_relative_eq!(cube[[0, 5, 5]], 2.0);
        assert_relative_eq!(cube[[1, 5, 5]], 4.0);
        assert_relative_eq!(cube[[2, 5, 5]], 6.0);
    }

    #[test]
    fn test_source_beyond_frame_carries_buffer_forward() {
        let stamp = Array2::from_elem((3, 3), 1.0);
        let inside = uniform_frame(stamp.clone(), &[(5.0, 5.0)], &[(4.0, 4.0)]);
        // Entirely past the right edge: x - stamp_w > out_width
        let outside = uniform_frame(stamp.clone(), &[(50.0, 5.0)], &[(49.0, 4.0)]);

        let cube = render_integration(&[inside, outside], 2.0, 10, 10).unwrap();
        let first = cube.index_axis(Axis(0), 0).to_owned();
        let second = cube.index_axis(Axis(0), 1).to_owned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_source_before_frame_adds_nothing() {
        let stamp = Array2::from_elem((3, 3), 1.0);
        // Entirely below/left: x + stamp_w < 0
        let outside = uniform_frame(stamp.clone(), &[(-20.0, 5.0)], &[(-21.0, 4.0)]);
        let inside = uniform_frame(stamp, &[(5.0, 5.0)], &[(4.0, 4.0)]);

        let cube = render_integration(&[outside, inside], 2.0, 10, 10).unwrap();
        assert_relative_eq!(cube.index_axis(Axis(0), 0).sum(), 0.0);
        assert_relative_eq!(cube.index_axis(Axis(0), 1).sum(), 18.0);
    }

    #[test]
    fn test_source_below_frame_adds_nothing() {
        let stamp = Array2::from_elem((3, 3), 1.0);
        // Entirely below the frame: y + stamp_h < 0
        let outside = uniform_frame(stamp.clone(), &[(5.0, -20.0)], &[(4.0, -21.0)]);
        let inside = uniform_frame(stamp, &[(5.0, 5.0)], &[(4.0, 4.0)]);

        let cube = render_integration(&[outside, inside], 2.0, 10, 10).unwrap();
        assert_relative_eq!(cube.index_axis(Axis(0), 0).sum(), 0.0);
        assert_relative_eq!(cube.index_axis(Axis(0), 1).sum(), 18.0);
    }

    #[test]
    fn test_partially_clipped_sample_adds_partial_flux() {
        let stamp = Array2::from_elem((5, 5), 0.04);
        // Corner at (-2, 4): two columns hang off the left edge
        let frame = uniform_frame(stamp, &[(0.0, 6.0)], &[(-2.0, 4.0)]);

        let cube = render_integration(&[frame], 10.0, 10, 10).unwrap();
        // 3 of 5 columns survive: 15 pixels * 0.04 * 10 s
        assert_relative_eq!(cube.index_axis(Axis(0), 0).sum(), 6.0, epsilon = 1e-9);
        assert_relative_eq!(cube[[0, 4, 0]], 0.4);
        assert_relative_eq!(cube[[0, 4, 2]], 0.4);
        assert_relative_eq!(cube[[0, 4, 3]], 0.0);
    }

    #[test]
    fn test_sample_fully_off_frame_is_skipped_silently() {
        let stamp = Array2::from_elem((3, 3), 1.0);
        // One sample on-frame, one far off: the frame as a whole is not
        // skipped (mixed positions) but the off-frame sample adds nothing
        let frame = uniform_frame(
            stamp,
            &[(5.0, 5.0), (40.0, 5.0)],
            &[(4.0, 4.0), (39.0, 4.0)],
        );

        let cube = render_integration(&[frame], 2.0, 10, 10).unwrap();
        // Only the first sample lands, carrying half the frame time
        assert_relative_eq!(cube.index_axis(Axis(0), 0).sum(), 9.0);
    }
}
