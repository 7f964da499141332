use image::{GrayImage, Luma};
use crate::{error::Result, traits::MaskFilter};

/// Grayscale dilation: every output pixel is the maximum of its
/// `(2 * radius + 1)` square neighbourhood, clamped at the image bounds.
#[derive(Debug, Clone, Default)]
pub struct MaxFilter {
    pub radius: u32,
}

impl MaskFilter for MaxFilter {
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage> {
        if self.radius == 0 {
            return Ok(mask.clone());
        }
        // A square max filter is separable: rows first, then columns.
        let horizontal = max_pass(mask, self.radius, Axis::Horizontal);
        Ok(max_pass(&horizontal, self.radius, Axis::Vertical))
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

fn max_pass(mask: &GrayImage, radius: u32, axis: Axis) -> GrayImage {
    let (width, height) = mask.dimensions();
    let r = radius as i64;

    GrayImage::from_fn(width, height, |x, y| {
        let (pos, len) = match axis {
            Axis::Horizontal => (x as i64, width as i64),
            Axis::Vertical => (y as i64, height as i64),
        };
        let start = (pos - r).max(0);
        let end = (pos + r).min(len - 1);

        let mut best = 0u8;
        for i in start..=end {
            let value = match axis {
                Axis::Horizontal => mask.get_pixel(i as u32, y)[0],
                Axis::Vertical => mask.get_pixel(x, i as u32)[0],
            };
            best = best.max(value);
            if best == u8::MAX {
                break;
            }
        }
        Luma([best])
    })
}

/// Gaussian blur for anti-aliasing mask edges
#[derive(Debug, Clone)]
pub struct GaussianBlurFilter {
    pub sigma: f32,
}

impl Default for GaussianBlurFilter {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl MaskFilter for GaussianBlurFilter {
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage> {
        // imageproc rejects non-positive sigmas
        let valid_sigma = self.sigma.is_finite() && self.sigma > 0.0;
        if !valid_sigma || mask.width() == 0 || mask.height() == 0 {
            return Ok(mask.clone());
        }
        Ok(imageproc::filter::gaussian_blur_f32(mask, self.sigma))
    }
}

/// Pixel-wise `a - b`, clamped at zero
pub fn subtract_saturating(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0].saturating_sub(b.get_pixel(x, y)[0])])
    })
}
