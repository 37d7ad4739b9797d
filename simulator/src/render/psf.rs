//! PSF stamp construction at sub-pixel source locations.
//!
//! A PSF library (gridded model, analytic model, ...) is evaluated at the
//! source's sub-pixel position over the pixel grid where the stamp
//! overlaps the detector. Optionally the evaluated high-resolution core is
//! composited into a wider, lower-resolution "wings" image before the
//! combined stamp is cropped to the detector overlap.
//!
//! Whether wings are used is decided once, when the builder is
//! constructed, so the per-frame hot path carries no capability checks.

use log::debug;
use ndarray::{s, Array2, ArrayView2};

use crate::render::coords::{ApertureGeometry, CoordinateSystem};
use crate::render::GeometryError;

/// A queryable PSF model indexed by detector position.
///
/// Implementations are read-only and stateless per call; sharing one model
/// across concurrently rendered sources is sound as long as the underlying
/// data is immutable. `evaluate` must tolerate the degenerate 2x2
/// placeholder grids produced for off-detector placements (the result is
/// discarded).
pub trait PsfModel {
    /// Evaluate the PSF over the given pixel grids for a source centered at
    /// (`x_center`, `y_center`), normalized so the untruncated total equals
    /// `flux`.
    fn evaluate(
        &self,
        x_points: &Array2<f64>,
        y_points: &Array2<f64>,
        flux: f64,
        x_center: f64,
        y_center: f64,
    ) -> Array2<f64>;
}

/// Circular Gaussian PSF.
///
/// Analytic stand-in for a measured library; used by the demo binary and
/// throughout the tests.
#[derive(Debug, Clone, Copy)]
pub struct GaussianPsf {
    /// Standard deviation of the profile in pixels.
    pub sigma_pix: f64,
}

impl GaussianPsf {
    pub fn new(sigma_pix: f64) -> Self {
        Self { sigma_pix }
    }
}

impl PsfModel for GaussianPsf {
    fn evaluate(
        &self,
        x_points: &Array2<f64>,
        y_points: &Array2<f64>,
        flux: f64,
        x_center: f64,
        y_center: f64,
    ) -> Array2<f64> {
        let c = 2.0 * self.sigma_pix * self.sigma_pix;
        let pre_term = flux / (c * std::f64::consts::PI);

        let mut out = Array2::zeros(x_points.dim());
        ndarray::Zip::from(&mut out)
            .and(x_points)
            .and(y_points)
            .for_each(|o, &x, &y| {
                let dx = x - x_center;
                let dy = y - y_center;
                *o = pre_term * (-(dx * dx + dy * dy) / c).exp();
            });
        out
    }
}

/// A PSF stamp cropped to the detector overlap, plus the offsets the frame
/// compositor needs to place it.
#[derive(Debug, Clone)]
pub struct PsfStamp {
    /// Normalized flux image (sum close to 1.0, less any edge cropping).
    pub data: Array2<f64>,
    /// (x, y) output-frame coordinate where `data[[0, 0]]` lands.
    pub aperture_min: (i64, i64),
    /// (x, y) offset of `data[[0, 0]]` within the uncropped stamp.
    pub crop_min: (i64, i64),
}

/// Stamp construction strategy, resolved at builder construction.
#[derive(Debug, Clone)]
enum StampMode {
    /// Evaluate the PSF core directly at the overlap grid.
    CoreOnly,
    /// Composite the evaluated core into a window cut from this full-size
    /// wings image.
    CoreWithWings { wings: Array2<f64> },
}

/// Builds PSF stamps for one render configuration.
pub struct PsfStampBuilder<'a, M: PsfModel> {
    library: &'a M,
    geometry: ApertureGeometry,
    /// (width, height) of the library's evaluated core.
    core_dims: (usize, usize),
    /// (width, height) of the requested stamp (wing window size).
    stamp_dims: (usize, usize),
    mode: StampMode,
}

impl<'a, M: PsfModel> PsfStampBuilder<'a, M> {
    /// Create a builder for stamps of `stamp_dims` pixels.
    ///
    /// `wings` is the full-size low-resolution halo image, if the
    /// configuration carries one. When the requested stamp is no larger
    /// than the core, or the wings image is smaller than the requested
    /// stamp, the wing geometry degenerates and the builder falls back to
    /// core-only stamps.
    pub fn new(
        library: &'a M,
        geometry: ApertureGeometry,
        core_dims: (usize, usize),
        stamp_dims: (usize, usize),
        wings: Option<Array2<f64>>,
    ) -> Self {
        let core_to_wing_x = (stamp_dims.0 / 2) as i64 - (core_dims.0 / 2) as i64;
        let mode = match wings {
            Some(wings)
                if core_to_wing_x > 0
                    && wings.dim().0 >= stamp_dims.1
                    && wings.dim().1 >= stamp_dims.0 =>
            {
                StampMode::CoreWithWings { wings }
            }
            Some(wings) => {
                debug!(
                    "wing geometry degenerates for stamp {}x{} with core {}x{} and wings {}x{}; \
                     using core-only stamps",
                    stamp_dims.0,
                    stamp_dims.1,
                    core_dims.0,
                    core_dims.1,
                    wings.dim().1,
                    wings.dim().0
                );
                StampMode::CoreOnly
            }
            None => StampMode::CoreOnly,
        };

        Self {
            library,
            geometry,
            core_dims,
            stamp_dims,
            mode,
        }
    }

    /// Build the stamp for a source at sub-pixel location
    /// (`x_location`, `y_location`) in aperture coordinates.
    ///
    /// Returns `Ok(None)` when the source falls entirely off the detector;
    /// that is the expected case for sources that start or end outside the
    /// field of view, not an error.
    ///
    /// # Errors
    /// * `GeometryError` - inconsistent caller geometry (fatal)
    pub fn build(
        &self,
        x_location: f64,
        y_location: f64,
        ignore_detector: bool,
    ) -> Result<Option<PsfStamp>, GeometryError> {
        match &self.mode {
            StampMode::CoreOnly => self.build_core_only(x_location, y_location, ignore_detector),
            StampMode::CoreWithWings { wings } => {
                self.build_with_wings(wings, x_location, y_location, ignore_detector)
            }
        }
    }

    fn build_core_only(
        &self,
        x_location: f64,
        y_location: f64,
        ignore_detector: bool,
    ) -> Result<Option<PsfStamp>, GeometryError> {
        let (core_w, core_h) = self.core_dims;
        let placement = self.geometry.place_stamp(
            x_location,
            y_location,
            core_w,
            core_h,
            (core_w / 2) as f64,
            (core_h / 2) as f64,
            CoordinateSystem::FullFrame,
            ignore_detector,
        )?;

        let Some((xr, yr)) = placement.overlap_ranges() else {
            return Ok(None);
        };

        // Evaluating over the overlap grid yields an already-cropped stamp
        let data = self.library.evaluate(
            &placement.x_points,
            &placement.y_points,
            1.0,
            placement.x_pos,
            placement.y_pos,
        );

        Ok(Some(PsfStamp {
            data,
            aperture_min: (xr.out_min, yr.out_min),
            crop_min: (xr.stamp_min, yr.stamp_min),
        }))
    }

    fn build_with_wings(
        &self,
        wings: &Array2<f64>,
        x_location: f64,
        y_location: f64,
        ignore_detector: bool,
    ) -> Result<Option<PsfStamp>, GeometryError> {
        let (core_w, core_h) = self.core_dims;
        let (stamp_w, stamp_h) = self.stamp_dims;

        let core_half_x = (core_w / 2) as i64;
        let core_half_y = (core_h / 2) as i64;
        let wing_half_x = (stamp_w / 2) as i64;
        let wing_half_y = (stamp_h / 2) as i64;

        let mut core_to_wing_x = wing_half_x - core_half_x;
        let mut core_to_wing_y = wing_half_y - core_half_y;

        // The core is placed at nearest-pixel granularity while the wings
        // stay at integer granularity: a sub-pixel phase past 0.5 shifts
        // the wing position and the core-to-wing offset by one pixel.
        // A phase of exactly 0.5 does not shift.
        let mut x_shift = 0.0;
        let mut y_shift = 0.0;
        if x_location.fract() > 0.5 {
            x_shift = 1.0;
            core_to_wing_x -= 1;
        }
        if y_location.fract() > 0.5 {
            y_shift = 1.0;
            core_to_wing_y -= 1;
        }

        // Window the requested stamp size out of the full wings image
        let (full_wing_h, full_wing_w) = wings.dim();
        let offset_x = (full_wing_w - stamp_w) / 2;
        let offset_y = (full_wing_h - stamp_h) / 2;
        let mut full_psf = wings
            .slice(s![
                offset_y..offset_y + stamp_h,
                offset_x..offset_x + stamp_w
            ])
            .to_owned();

        let wing_placement = self.geometry.place_stamp(
            x_location + x_shift,
            y_location + y_shift,
            stamp_w,
            stamp_h,
            wing_half_x as f64,
            wing_half_y as f64,
            CoordinateSystem::FullFrame,
            ignore_detector,
        )?;
        let Some((wxr, wyr)) = wing_placement.overlap_ranges() else {
            return Ok(None);
        };

        // Evaluate the library only when the core lands at least partially
        // inside the on-detector part of the wing window
        if wxr.stamp_min < wing_half_x + core_half_x
            && wxr.stamp_max > wing_half_x - core_half_x
            && wyr.stamp_min < wing_half_y + core_half_y
            && wyr.stamp_max > wing_half_y - core_half_y
        {
            let core_placement = self.geometry.place_stamp(
                x_location,
                y_location,
                core_w,
                core_h,
                core_half_x as f64,
                core_half_y as f64,
                CoordinateSystem::FullFrame,
                ignore_detector,
            )?;
            let Some((cxr, cyr)) = core_placement.overlap_ranges() else {
                return Ok(None);
            };

            let core = self.library.evaluate(
                &core_placement.x_points,
                &core_placement.y_points,
                1.0,
                core_placement.x_pos,
                core_placement.y_pos,
            );

            // The core replaces wing pixels rather than adding to them; the
            // wings image carries no flux in its central region
            insert_core(
                &mut full_psf,
                core.view(),
                cxr.stamp_min + core_to_wing_x,
                cyr.stamp_min + core_to_wing_y,
            );
        }

        // Whether or not the core landed, crop the combined stamp to the
        // detector overlap
        let data = full_psf
            .slice(s![
                wyr.stamp_min as usize..wyr.stamp_max as usize,
                wxr.stamp_min as usize..wxr.stamp_max as usize
            ])
            .to_owned();

        Ok(Some(PsfStamp {
            data,
            aperture_min: (wxr.out_min, wyr.out_min),
            crop_min: (wxr.stamp_min, wyr.stamp_min),
        }))
    }
}

/// Assign `core` into `window` with its top-left at (`start_x`, `start_y`),
/// restricted to the intersection of the two arrays.
fn insert_core(window: &mut Array2<f64>, core: ArrayView2<f64>, start_x: i64, start_y: i64) {
    let (win_h, win_w) = window.dim();
    let (core_h, core_w) = core.dim();

    let x0 = start_x.max(0);
    let y0 = start_y.max(0);
    let x1 = (start_x + core_w as i64).min(win_w as i64);
    let y1 = (start_y + core_h as i64).min(win_h as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let cx0 = (x0 - start_x) as usize;
    let cy0 = (y0 - start_y) as usize;
    let width = (x1 - x0) as usize;
    let height = (y1 - y0) as usize;

    window
        .slice_mut(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize])
        .assign(&core.slice(s![cy0..cy0 + height, cx0..cx0 + width]));
}
