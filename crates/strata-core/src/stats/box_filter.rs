//! Separable uniform (box) filter with edge replication.
//!
//! For a window of size `s` the footprint spans offsets
//! `[-(s / 2), s - 1 - s / 2]` on each axis, so odd sizes are centered and
//! even sizes lean one sample towards the origin.
//!
//! # Complexity
//! O(W × H) regardless of window size: each axis is a running sum.

use crate::error::{Result, StrataError};
use crate::image::Plane;

/// Local mean of `image` over a `size × size` window.
pub fn box_mean(image: &Plane, size: usize) -> Result<Plane> {
    image.validate()?;
    if size == 0 {
        return Err(StrataError::invalid("local_var_size", "window must be at least 1"));
    }

    let (w, h) = (image.width, image.height);
    let mut rows = vec![0.0_f64; w * h];
    let mut line = vec![0.0_f64; w.max(h)];
    let mut sums = vec![0.0_f64; w.max(h)];

    for y in 0..h {
        for (dst, &v) in line.iter_mut().zip(image.row(y)) {
            *dst = v as f64;
        }
        running_sum(&line[..w], size, &mut sums[..w]);
        rows[y * w..(y + 1) * w].copy_from_slice(&sums[..w]);
    }

    let mut out = vec![0.0_f32; w * h];
    let area = size as f64 * size as f64;
    for x in 0..w {
        for (y, dst) in line[..h].iter_mut().enumerate() {
            *dst = rows[y * w + x];
        }
        running_sum(&line[..h], size, &mut sums[..h]);
        for (y, &s) in sums[..h].iter().enumerate() {
            out[y * w + x] = (s / area) as f32;
        }
    }

    Ok(Plane {
        width: w,
        height: h,
        pixels: out,
    })
}

/// Window sums of `signal` with edge replication.
///
/// The first window is summed in closed form, so the cost does not depend
/// on `size` even when the window is far wider than the signal.
fn running_sum(signal: &[f64], size: usize, out: &mut [f64]) {
    let n = signal.len();
    let before = size / 2;
    let after = size - 1 - before;
    let (first, last) = (signal[0], signal[n - 1]);

    let inside = after.min(n - 1);
    let overhang = after - inside;
    let mut acc = before as f64 * first
        + signal[..=inside].iter().sum::<f64>()
        + overhang as f64 * last;
    out[0] = acc;

    let at = |i: usize| signal[i.min(n - 1)];
    for i in 1..n {
        let leaving = if i - 1 < before { first } else { at(i - 1 - before) };
        acc += at(i.saturating_add(after)) - leaving;
        out[i] = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_box_mean(image: &Plane, size: usize) -> Plane {
        let before = (size / 2) as isize;
        let after = (size - 1 - size / 2) as isize;
        Plane::from_fn(image.width, image.height, |x, y| {
            let mut sum = 0.0_f64;
            for dy in -before..=after {
                for dx in -before..=after {
                    sum += image.get_replicated(x as isize + dx, y as isize + dy) as f64;
                }
            }
            (sum / (size * size) as f64) as f32
        })
        .unwrap()
    }

    fn ramp(width: usize, height: usize) -> Plane {
        Plane::from_fn(width, height, |x, y| ((x * 31 + y * 17) % 23) as f32 * 3.5).unwrap()
    }

    #[test]
    fn test_matches_naive_window_for_odd_and_even_sizes() {
        let image = ramp(13, 9);
        for size in [1, 2, 3, 4, 7, 8, 15, 20] {
            let fast = box_mean(&image, size).unwrap();
            let slow = naive_box_mean(&image, size);
            for (i, (a, b)) in fast.pixels.iter().zip(&slow.pixels).enumerate() {
                assert!(
                    (a - b).abs() < 1e-3,
                    "size {size}, pixel {i}: running {a} vs naive {b}"
                );
            }
        }
    }

    #[test]
    fn test_size_one_is_identity() {
        let image = ramp(6, 5);
        assert_eq!(box_mean(&image, 1).unwrap(), image);
    }

    #[test]
    fn test_flat_image_stays_flat() {
        let image = Plane::filled(7, 4, 12.5).unwrap();
        let out = box_mean(&image, 5).unwrap();
        assert!(out.pixels.iter().all(|&v| (v - 12.5).abs() < 1e-5));
    }

    #[test]
    fn test_window_larger_than_image() {
        let image = Plane::from_rows(&[vec![0.0, 10.0]]).unwrap();
        let fast = box_mean(&image, 9).unwrap();
        let slow = naive_box_mean(&image, 9);
        assert!((fast.get(0, 0) - slow.get(0, 0)).abs() < 1e-4);
        assert!((fast.get(1, 0) - slow.get(1, 0)).abs() < 1e-4);
    }

    #[test]
    fn test_wide_window_matches_naive_window() {
        let image = ramp(5, 3);
        let fast = box_mean(&image, 301).unwrap();
        let slow = naive_box_mean(&image, 301);
        for (a, b) in fast.pixels.iter().zip(&slow.pixels) {
            assert!((a - b).abs() < 1e-3, "running {a} vs naive {b}");
        }
    }

    #[test]
    fn test_huge_window_is_dominated_by_edges() {
        let image = Plane::from_rows(&[vec![0.0, 10.0]]).unwrap();
        let out = box_mean(&image, 1 << 33).unwrap();
        for &v in &out.pixels {
            assert!((v - 5.0).abs() < 1e-4, "expected the edge average, got {v}");
        }
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let image = ramp(3, 3);
        assert!(matches!(
            box_mean(&image, 0),
            Err(StrataError::InvalidParameter { .. })
        ));
    }
}
