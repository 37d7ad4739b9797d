//! Per-frame position generation for moving sources.
//!
//! A moving source is described by an initial position and either velocity
//! components or a speed plus direction angle; these helpers expand that
//! description into the per-frame (and per-sub-sample) position lists the
//! compositor consumes. All functions are pure.

/// Pixel positions of a source at the given times, moving at `velocity`
/// pixels per unit time along `angle` radians (0 = +x axis, pi/2 = +y).
pub fn xy_per_frame(
    velocity: f64,
    times: &[f64],
    angle: f64,
    x0: f64,
    y0: f64,
) -> (Vec<f64>, Vec<f64>) {
    let rate_x = velocity * angle.cos();
    let rate_y = velocity * angle.sin();

    let xs = times.iter().map(|&t| x0 + rate_x * t).collect();
    let ys = times.iter().map(|&t| y0 + rate_y * t).collect();
    (xs, ys)
}

/// Sky positions of a source at the given times, moving linearly from
/// (`ra0`, `dec0`) at (`ra_vel`, `dec_vel`) degrees per unit time.
pub fn ra_dec_per_frame(
    ra0: f64,
    dec0: f64,
    ra_vel: f64,
    dec_vel: f64,
    times: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    let ras = times.iter().map(|&t| ra0 + ra_vel * t).collect();
    let decs = times.iter().map(|&t| dec0 + dec_vel * t).collect();
    (ras, decs)
}

/// Positions spaced `dist` pixels apart along the segment from
/// (`x_start`, `y_start`) to (`x_end`, `y_end`), starting at the segment
/// start and stopping at (or just short of) the end.
pub fn equidistant_xy(
    x_start: f64,
    y_start: f64,
    x_end: f64,
    y_end: f64,
    dist: f64,
) -> (Vec<f64>, Vec<f64>) {
    let delta_x = x_end - x_start;
    let delta_y = y_end - y_start;
    let length = (delta_x * delta_x + delta_y * delta_y).sqrt();

    if length == 0.0 || dist <= 0.0 {
        return (vec![x_start], vec![y_start]);
    }

    // Half-step slop on the endpoint keeps the final position included
    // despite floating point accumulation
    let steps = (length / dist + 0.5).floor() as usize + 1;
    let dx = delta_x / length * dist;
    let dy = delta_y / length * dist;

    let xs = (0..steps).map(|i| x_start + dx * i as f64).collect();
    let ys = (0..steps).map(|i| y_start + dy * i as f64).collect();
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_xy_per_frame_along_x() {
        let times = [0.0, 1.0, 2.0];
        let (xs, ys) = xy_per_frame(2.0, &times, 0.0, 10.0, 5.0);
        assert_eq!(xs, vec![10.0, 12.0, 14.0]);
        for &y in &ys {
            assert_relative_eq!(y, 5.0);
        }
    }

    #[test]
    fn test_xy_per_frame_diagonal() {
        let times = [0.0, 1.0];
        let angle = std::f64::consts::FRAC_PI_4;
        let (xs, ys) = xy_per_frame(std::f64::consts::SQRT_2, &times, angle, 0.0, 0.0);
        assert_relative_eq!(xs[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(ys[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ra_dec_per_frame() {
        let times = [0.0, 10.0];
        let (ras, decs) = ra_dec_per_frame(180.0, -30.0, 0.1, -0.05, &times);
        assert_relative_eq!(ras[1], 181.0);
        assert_relative_eq!(decs[1], -30.5);
    }

    #[test]
    fn test_equidistant_spacing() {
        let (xs, ys) = equidistant_xy(0.0, 0.0, 10.0, 0.0, 2.0);
        assert_eq!(xs.len(), 6);
        assert_eq!(xs.len(), ys.len());
        assert_relative_eq!(xs[0], 0.0);
        assert_relative_eq!(xs[5], 10.0);
        for pair in xs.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_equidistant_vertical_motion() {
        // Motion parallel to the y axis still produces matched lists
        let (xs, ys) = equidistant_xy(3.0, 0.0, 3.0, 6.0, 1.5);
        assert_eq!(xs.len(), ys.len());
        assert_eq!(ys.len(), 5);
        for &x in &xs {
            assert_relative_eq!(x, 3.0);
        }
        assert_relative_eq!(ys[4], 6.0);
    }

    #[test]
    fn test_equidistant_degenerate_segment() {
        let (xs, ys) = equidistant_xy(2.0, 2.0, 2.0, 2.0, 1.0);
        assert_eq!(xs, vec![2.0]);
        assert_eq!(ys, vec![2.0]);
    }
}
