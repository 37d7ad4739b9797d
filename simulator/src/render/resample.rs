//! Flux-conserving resampling between native and oversampled pixel grids.

use ndarray::{s, Array2};

/// Break each pixel of `image` into a `factor_x` x `factor_y` block,
/// spreading its flux evenly across the block.
pub fn subsample(image: &Array2<f64>, factor_x: usize, factor_y: usize) -> Array2<f64> {
    let (y_dim, x_dim) = image.dim();
    let mut sub = Array2::zeros((y_dim * factor_y, x_dim * factor_x));

    let share = 1.0 / (factor_x * factor_y) as f64;
    for j in 0..y_dim {
        for i in 0..x_dim {
            sub.slice_mut(s![
                factor_y * j..factor_y * (j + 1),
                factor_x * i..factor_x * (i + 1)
            ])
            .fill(image[[j, i]] * share);
        }
    }
    sub
}

/// Bin an oversampled image back to native resolution by summing each
/// `sample_x` x `sample_y` block. Inverse of [`subsample`].
pub fn resample(frame: &Array2<f64>, sample_x: usize, sample_y: usize) -> Array2<f64> {
    let (frame_y, frame_x) = frame.dim();
    let mut binned = Array2::zeros((frame_y / sample_y, frame_x / sample_x));

    for j in 0..binned.dim().0 {
        for i in 0..binned.dim().1 {
            binned[[j, i]] = frame
                .slice(s![
                    sample_y * j..sample_y * (j + 1),
                    sample_x * i..sample_x * (i + 1)
                ])
                .sum();
        }
    }
    binned
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_subsample_conserves_flux() {
        let image = Array2::from_shape_fn((4, 6), |(j, i)| (j * 6 + i) as f64);
        let sub = subsample(&image, 3, 2);

        assert_eq!(sub.dim(), (8, 18));
        assert_relative_eq!(sub.sum(), image.sum(), epsilon = 1e-12);
        // Each block is uniform at 1/6th of the source pixel
        assert_relative_eq!(sub[[2, 3]], image[[1, 1]] / 6.0);
    }

    #[test]
    fn test_resample_round_trip() {
        let image = Array2::from_shape_fn((5, 5), |(j, i)| (j + i) as f64 * 0.5);
        let back = resample(&subsample(&image, 3, 3), 3, 3);

        assert_eq!(back.dim(), image.dim());
        for (a, b) in back.iter().zip(image.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_resample_bins_blocks() {
        let frame = Array2::from_elem((6, 6), 1.0);
        let binned = resample(&frame, 2, 3);
        assert_eq!(binned.dim(), (2, 3));
        for &v in binned.iter() {
            assert_relative_eq!(v, 6.0);
        }
    }
}
