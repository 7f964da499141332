use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use tracing::debug;

use crate::{
    algorithms::{
        composite::{composite, Layer},
        filters::{subtract_saturating, GaussianBlurFilter, MaxFilter},
    },
    error::{Result, StickerError},
    traits::MaskFilter,
    types::{AlphaMatte, StrokeSpec},
};

/// Builds sticker outlines from a subject's transparency channel
#[derive(Debug, Clone, Default)]
pub struct OutlineSynthesizer {
    pub stroke: StrokeSpec,
    pub smoothing: GaussianBlurFilter,
}

impl OutlineSynthesizer {
    pub fn new(stroke: StrokeSpec) -> Self {
        Self {
            stroke,
            smoothing: GaussianBlurFilter::default(),
        }
    }

    /// Ring channel `stroke.radius` pixels wide, strictly outside the silhouette
    pub fn synthesize(&self, alpha: &GrayImage) -> Result<GrayImage> {
        self.stroke.validate()?;
        let (width, height) = alpha.dimensions();
        if self.stroke.radius == 0 {
            return Ok(GrayImage::new(width, height));
        }

        let dilated = MaxFilter { radius: self.stroke.radius as u32 }.apply(alpha)?;
        let ring = subtract_saturating(&dilated, alpha);
        let smoothed = self.smoothing.apply(&ring)?;

        // Blur must not leak into the opaque interior
        Ok(GrayImage::from_fn(width, height, |x, y| {
            let room = u8::MAX - alpha.get_pixel(x, y)[0];
            Luma([smoothed.get_pixel(x, y)[0].min(room)])
        }))
    }

    /// Solid stroke color carrying the ring as its transparency
    pub fn layer(&self, ring: &GrayImage) -> RgbaImage {
        outline_layer(ring, self.stroke.color)
    }

    /// Cutout composited over its outline layer, same size as the cutout.
    ///
    /// Returns the outline layer alongside the finished sticker.
    pub fn apply(&self, cutout: &DynamicImage) -> Result<(RgbaImage, RgbaImage)> {
        let matte = AlphaMatte::from_dynamic(cutout);
        let (width, height) = matte.dimensions();
        let ring = self.synthesize(&matte.alpha())?;
        let outline = self.layer(&ring);
        debug!(width, height, radius = self.stroke.radius, "compositing outline");

        let sticker = composite(
            width,
            height,
            &[Layer::new(&outline), Layer::new(matte.image())],
        );
        Ok((outline, sticker))
    }
}

/// Dilate, subtract and smooth `alpha` into an outline ring.
///
/// A radius of 0, or a fully transparent input, yields an all-zero channel.
pub fn synthesize_outline(alpha: &GrayImage, stroke_radius: i32) -> Result<GrayImage> {
    if stroke_radius < 0 {
        return Err(StickerError::InvalidStrokeSpec(stroke_radius));
    }
    OutlineSynthesizer::new(StrokeSpec {
        radius: stroke_radius,
        color: StrokeSpec::WHITE,
    })
    .synthesize(alpha)
}

/// Pair a ring channel with a fill color
pub fn outline_layer(ring: &GrayImage, color: [u8; 4]) -> RgbaImage {
    let [r, g, b, a] = color;
    RgbaImage::from_fn(ring.width(), ring.height(), |x, y| {
        let coverage = u16::from(ring.get_pixel(x, y)[0]);
        let alpha = ((coverage * u16::from(a) + 127) / 255) as u8;
        Rgba([r, g, b, alpha])
    })
}

/// Stickerize a cutout with the given stroke
pub fn add_outline(cutout: &DynamicImage, stroke: StrokeSpec) -> Result<RgbaImage> {
    let (_, sticker) = OutlineSynthesizer::new(stroke).apply(cutout)?;
    Ok(sticker)
}
