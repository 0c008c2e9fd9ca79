//! Single-channel image representation for the enhancement pipeline.

use crate::error::{Result, StrataError};

/// A single intensity plane, stored row-major as `f32`.
///
/// Stages never mutate their inputs; every stage allocates a new `Plane`.
/// The fields are public so callers can hand over buffers without copying;
/// [`Plane::validate`] is run by every stage entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Intensity samples, `width * height` entries, row-major.
    pub pixels: Vec<f32>,
}

impl Plane {
    /// Wrap an existing buffer, checking that it forms a non-empty grid.
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Result<Self> {
        let plane = Self {
            width,
            height,
            pixels,
        };
        plane.validate()?;
        Ok(plane)
    }

    /// A plane where every sample equals `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    /// Build a plane by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> f32,
    ) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    /// Build a plane from nested rows. Ragged rows are rejected.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(StrataError::shape(format!(
                "row {i} has {} samples, expected {width}",
                row.len()
            )));
        }
        Self::new(width, height, rows.concat())
    }

    /// Check that the plane has a non-zero area, a consistent buffer and
    /// only finite samples.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StrataError::shape(format!(
                "image has zero area ({}x{})",
                self.width, self.height
            )));
        }
        let expected = self.width.checked_mul(self.height).ok_or_else(|| {
            StrataError::shape(format!("{}x{} overflows", self.width, self.height))
        })?;
        if self.pixels.len() != expected {
            return Err(StrataError::shape(format!(
                "{}x{} image needs {expected} samples, got {}",
                self.width,
                self.height,
                self.pixels.len()
            )));
        }
        if let Some(i) = self.pixels.iter().position(|v| !v.is_finite()) {
            return Err(StrataError::NonFiniteSample {
                x: i % self.width,
                y: i / self.width,
                value: self.pixels[i],
            });
        }
        Ok(())
    }

    /// Fail unless `other` has the same dimensions as `self`.
    pub fn ensure_same_shape(&self, other: &Plane) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(StrataError::shape(format!(
                "expected {}x{} layer, got {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }

    /// Sample at `(x, y)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.pixels[y * self.width + x]
    }

    /// Sample at a possibly out-of-bounds coordinate, replicating edge pixels.
    #[inline]
    pub fn get_replicated(&self, x: isize, y: isize) -> f32 {
        let xi = replicate_index(x, self.width);
        let yi = replicate_index(y, self.height);
        self.pixels[yi * self.width + xi]
    }

    /// One row of samples.
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    /// Apply `f` to every sample, producing a new plane of the same shape.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Plane {
        Plane {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two same-shaped planes sample by sample.
    pub fn zip_map(&self, other: &Plane, f: impl Fn(f32, f32) -> f32) -> Result<Plane> {
        self.ensure_same_shape(other)?;
        Ok(Plane {
            width: self.width,
            height: self.height,
            pixels: self
                .pixels
                .iter()
                .zip(&other.pixels)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Smallest and largest sample. Returns `(0, 0)` for an empty buffer.
    pub fn min_max(&self) -> (f32, f32) {
        if self.pixels.is_empty() {
            return (0.0, 0.0);
        }
        self.pixels
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Population mean and standard deviation of the samples.
    pub fn mean_std(&self) -> (f64, f64) {
        let n = self.pixels.len() as f64;
        if n < 1.0 {
            return (0.0, 0.0);
        }
        let mean = self.pixels.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = self
            .pixels
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        (mean, var.max(0.0).sqrt())
    }

    /// Anisotropic total variation: sum of absolute horizontal and vertical
    /// neighbor differences.
    pub fn total_variation(&self) -> f64 {
        let mut tv = 0.0_f64;
        for y in 0..self.height {
            for x in 0..self.width {
                let v = self.get(x, y) as f64;
                if x + 1 < self.width {
                    tv += (self.get(x + 1, y) as f64 - v).abs();
                }
                if y + 1 < self.height {
                    tv += (self.get(x, y + 1) as f64 - v).abs();
                }
            }
        }
        tv
    }

    /// True when no sample is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.pixels.iter().all(|v| v.is_finite())
    }
}

/// Map a possibly out-of-range index onto `[0, len)` by clamping to the
/// nearest edge. `len` must be non-zero.
#[inline]
pub fn replicate_index(i: isize, len: usize) -> usize {
    if i < 0 {
        0
    } else {
        (i as usize).min(len - 1)
    }
}
