//! Moving-target rendering demonstration
//!
//! Renders a Gaussian-PSF source drifting across a square aperture over a
//! number of detector readouts and reports the accumulated signal per
//! frame. Useful for eyeballing streak geometry and verifying that flux
//! scales with exposure time, not with sub-sample count.
//!
//! The source flux defaults to 1.0 counts/sec; pass a spectra catalog and
//! source id to use the crude band-integrated flux of a catalog entry
//! instead.

use clap::Parser;
use log::info;
use ndarray::Axis;
use std::path::PathBuf;

use shared::spectra::SpectraCatalog;
use simulator::trajectory::{equidistant_xy, xy_per_frame};
use simulator::{
    render_integration, ApertureGeometry, FrameSamples, GaussianPsf, PsfStampBuilder,
};

#[derive(Parser, Debug)]
#[command(
    name = "Moving-Target Demo",
    about = "Renders a drifting point source into a multi-frame integration",
    long_about = None
)]
struct Args {
    /// Side length of the square output aperture in pixels
    #[arg(long, default_value_t = 256)]
    aperture: usize,

    /// Number of detector readouts in the integration
    #[arg(long, default_value_t = 5)]
    frames: usize,

    /// Exposure time of a single frame in seconds
    #[arg(long, default_value_t = 10.73)]
    frame_time: f64,

    /// Source speed in pixels per second
    #[arg(long, default_value_t = 0.5)]
    velocity: f64,

    /// Direction of travel in degrees (0 = +x axis)
    #[arg(long, default_value_t = 30.0)]
    angle_deg: f64,

    /// Starting x position in aperture coordinates
    #[arg(long, default_value_t = -20.0)]
    x_start: f64,

    /// Starting y position in aperture coordinates
    #[arg(long, default_value_t = 100.0)]
    y_start: f64,

    /// PSF width (Gaussian sigma) in pixels
    #[arg(long, default_value_t = 1.8)]
    sigma: f64,

    /// Spacing between sub-position samples in pixels
    #[arg(long, default_value_t = 0.3)]
    sample_spacing: f64,

    /// Optional spectra catalog supplying the source flux
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Source id to look up in the catalog
    #[arg(long, default_value_t = 1)]
    source_id: u32,
}

fn source_flux(args: &Args) -> Result<f64, Box<dyn std::error::Error>> {
    let Some(path) = &args.catalog else {
        return Ok(1.0);
    };

    let catalog = SpectraCatalog::open(path)?;
    let spectrum = catalog
        .get(args.source_id)
        .ok_or_else(|| format!("source id {} not found in {}", args.source_id, path.display()))?;

    // Crude band integral: good enough to scale a demo render
    let flux: f64 = spectrum.fluxes.iter().sum::<f64>() / spectrum.fluxes.len() as f64;
    info!(
        "using source {} from {}: mean flux {:.4} {}",
        args.source_id,
        path.display(),
        flux,
        spectrum.flux_units
    );
    Ok(flux)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let flux = source_flux(&args)?;
    let psf = GaussianPsf::new(args.sigma);
    let geometry = ApertureGeometry::full_frame(args.aperture);

    let stamp_dim = ((args.sigma * 8.0).ceil() as usize) | 1; // odd-sized stamp
    let builder = PsfStampBuilder::new(&psf, geometry, (stamp_dim, stamp_dim), (stamp_dim, stamp_dim), None);

    let angle = args.angle_deg.to_radians();
    let frame_starts: Vec<f64> = (0..=args.frames).map(|i| i as f64 * args.frame_time).collect();
    let (frame_xs, frame_ys) = xy_per_frame(args.velocity, &frame_starts, angle, args.x_start, args.y_start);

    // Build the sub-position samples for each frame by walking the source
    // path between consecutive readouts
    let mut frames = Vec::with_capacity(args.frames);
    for i in 0..args.frames {
        let (xs, ys) = equidistant_xy(
            frame_xs[i],
            frame_ys[i],
            frame_xs[i + 1],
            frame_ys[i + 1],
            args.sample_spacing,
        );

        let mut samples = FrameSamples::default();
        for (&x, &y) in xs.iter().zip(&ys) {
            // Off-detector samples still count toward the time split, so
            // the streak stays evenly weighted while the source enters or
            // leaves the field; an off-frame corner makes them no-ops.
            let (stamp_data, min_x, min_y) = match builder.build(x, y, false)? {
                Some(stamp) => (
                    &stamp.data * flux,
                    stamp.aperture_min.0 as f64,
                    stamp.aperture_min.1 as f64,
                ),
                None => (ndarray::Array2::zeros((1, 1)), -10.0, -10.0),
            };
            samples.stamps.push(stamp_data);
            samples.x.push(x);
            samples.y.push(y);
            samples.stamp_min_x.push(min_x);
            samples.stamp_min_y.push(min_y);
            samples.times.push(frame_starts[i]);
        }
        frames.push(samples);
    }

    let cube = render_integration(&frames, args.frame_time, args.aperture, args.aperture)?;

    println!(
        "Rendered {} frames of a {}x{} aperture ({} px/s at {} deg)",
        args.frames, args.aperture, args.aperture, args.velocity, args.angle_deg
    );
    for (i, frame) in cube.axis_iter(Axis(0)).enumerate() {
        println!(
            "  frame {:>2}: accumulated signal {:>12.4}  (max pixel {:.4})",
            i,
            frame.sum(),
            frame.fold(f64::MIN, |a, &b| a.max(b))
        );
    }

    Ok(())
}
