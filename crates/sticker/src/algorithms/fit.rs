use image::{imageops, imageops::FilterType, DynamicImage, RgbaImage};
use tracing::debug;

use crate::{
    algorithms::composite::{composite, Layer},
    error::Result,
    types::{ensure_area, AlphaMatte, CanvasSpec},
};

/// Trims, downscales and centers cutouts on a fixed canvas
#[derive(Debug, Clone)]
pub struct CanvasFitter {
    pub canvas: CanvasSpec,
    pub filter: FilterType,
}

impl CanvasFitter {
    pub fn new(canvas: CanvasSpec) -> Self {
        Self {
            canvas,
            filter: FilterType::Lanczos3,
        }
    }

    pub fn fit(&self, image: &DynamicImage) -> Result<RgbaImage> {
        self.canvas.validate()?;
        let matte = AlphaMatte::from_dynamic(image);
        let (width, height) = matte.dimensions();
        ensure_area(width, height)?;

        let canvas = &self.canvas;
        let Some(bbox) = matte.bounding_box() else {
            debug!(width, height, "nothing to trim, centering as-is");
            let (x, y) = centered_offset(canvas, width, height);
            return Ok(composite(canvas.width, canvas.height, &[Layer::at(matte.image(), x, y)]));
        };

        let trimmed =
            imageops::crop_imm(matte.image(), bbox.x, bbox.y, bbox.width, bbox.height).to_image();
        let (target_w, target_h) = scaled_size(canvas, bbox.width, bbox.height);
        let scaled = if (target_w, target_h) == trimmed.dimensions() {
            trimmed
        } else {
            imageops::resize(&trimmed, target_w, target_h, self.filter)
        };
        debug!(
            trimmed_w = bbox.width,
            trimmed_h = bbox.height,
            target_w,
            target_h,
            "fitting cutout"
        );

        let (x, y) = centered_offset(canvas, target_w, target_h);
        Ok(composite(canvas.width, canvas.height, &[Layer::at(&scaled, x, y)]))
    }
}

impl Default for CanvasFitter {
    fn default() -> Self {
        Self::new(CanvasSpec::default())
    }
}

/// Fit `image` into `canvas` with the default resampling filter
pub fn fit(image: &DynamicImage, canvas: &CanvasSpec) -> Result<RgbaImage> {
    CanvasFitter::new(*canvas).fit(image)
}

/// `min(usable_w / w, usable_h / h, 1.0)` applied to `(w, h)`, at least 1px
fn scaled_size(canvas: &CanvasSpec, width: u32, height: u32) -> (u32, u32) {
    let (usable_w, usable_h) = (canvas.usable_width(), canvas.usable_height());
    let scale = (f64::from(usable_w) / f64::from(width))
        .min(f64::from(usable_h) / f64::from(height))
        .min(1.0);

    // the epsilon absorbs float error when one axis scales to exactly `usable`
    let w = (f64::from(width) * scale + 1e-6).floor() as u32;
    let h = (f64::from(height) * scale + 1e-6).floor() as u32;
    (w.clamp(1, usable_w), h.clamp(1, usable_h))
}

fn centered_offset(canvas: &CanvasSpec, width: u32, height: u32) -> (i64, i64) {
    let x = (i64::from(canvas.width) - i64::from(width)).div_euclid(2);
    let y = (i64::from(canvas.height) - i64::from(height)).div_euclid(2);
    (x, y)
}
