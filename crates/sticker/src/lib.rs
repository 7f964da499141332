//! # Sticker Compositing Library
//!
//! Turns an arbitrary photo into sticker-style artifacts: a background-free
//! cutout, an outlined sticker, a circular themed badge, or a sticker with a
//! caption band underneath.
//!
//! ## Core Features
//!
//! - **Injected Models**: Segmentation and captioning sit behind the [`ModelProvider`] trait
//! - **Pure Mask Arithmetic**: Dilate, subtract and blur work on immutable channel buffers
//! - **Layer Compositing**: Straight-alpha "over" of offset layers onto a canvas
//! - **Typed Results**: Every run returns an [`OutputManifest`] of role-tagged images
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sticker::{Role, StickerPipeline};
//!
//! let pipeline = StickerPipeline::builder()
//!     .with_stroke_radius(12)
//!     .build()?;
//!
//! let photo = image::open("cat.jpg")?;
//! let manifest = pipeline.generate(&photo, None, "sticker", None)?;
//! if let Some(sticker) = manifest.get(Role::Sticker) {
//!     sticker.save("cat_sticker.png")?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Models
//!
//! ```rust,no_run
//! use sticker::{
//!     providers::{CornerKeySegmenter, FixedCaptioner, LazyProvider, StaticProvider},
//!     ModelProvider, StickerPipeline,
//! };
//!
//! let provider = LazyProvider::new(|| {
//!     let segmenter = CornerKeySegmenter { tolerance: 30.0, feather: 8.0 };
//!     let provider = StaticProvider::new(segmenter, FixedCaptioner("a cat".into()));
//!     Ok(Box::new(provider) as Box<dyn ModelProvider>)
//! });
//! let pipeline = StickerPipeline::builder()
//!     .with_provider(provider)
//!     .build()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod providers;
pub mod settings;

// Re-exports for convenience
pub use error::{Result, StickerError};
pub use types::{AlphaMatte, Artifact, CanvasSpec, Mode, OutputManifest, Role, Stage, StrokeSpec};
pub use traits::*;
pub use algorithms::{
    add_outline, composite, fit, outline_layer, render_badge, render_label, synthesize_outline,
    BadgeRenderer, CanvasFitter, LabelFont, LabelRenderer, Layer, OutlineSynthesizer, Theme,
    ThemeName,
};
pub use pipeline::{StickerPipeline, builder::PipelineBuilder};
pub use settings::{LabelSettings, PipelineSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use crate::providers::CornerKeySegmenter;

    const SUBJECT: (u32, u32, u32, u32) = (100, 75, 300, 225);

    fn create_test_image() -> RgbImage {
        let (x0, y0, x1, y1) = SUBJECT;
        RgbImage::from_fn(400, 300, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Rgb([20, 120, 60])
            } else {
                Rgb([250, 250, 250])
            }
        })
    }

    fn inside(x: u32, y: u32) -> bool {
        let (x0, y0, x1, y1) = SUBJECT;
        x >= x0 && x < x1 && y >= y0 && y < y1
    }

    /// Chebyshev distance from a pixel outside the subject to its edge
    fn distance_outside(x: u32, y: u32) -> u32 {
        let (x0, y0, x1, y1) = SUBJECT;
        let dx = if x < x0 { x0 - x } else if x >= x1 { x - x1 + 1 } else { 0 };
        let dy = if y < y0 { y0 - y } else if y >= y1 { y - y1 + 1 } else { 0 };
        dx.max(dy)
    }

    #[test]
    fn test_rectangle_scenario_with_radius_10() {
        let photo = create_test_image();
        let cutout = CornerKeySegmenter::default().remove_background(&photo).unwrap();
        for (x, y, px) in cutout.enumerate_pixels() {
            assert_eq!(px[3], if inside(x, y) { 255 } else { 0 });
        }

        let matte = AlphaMatte::new(cutout.clone());
        let ring = synthesize_outline(&matte.alpha(), 10).unwrap();
        let outline = outline_layer(&ring, StrokeSpec::WHITE);
        let sticker = composite(400, 300, &[Layer::new(&outline), Layer::new(&cutout)]);

        for (x, y, px) in sticker.enumerate_pixels() {
            if inside(x, y) {
                assert_eq!(ring.get_pixel(x, y)[0], 0, "ring inside subject at ({x}, {y})");
                assert_eq!(px, cutout.get_pixel(x, y));
            } else if distance_outside(x, y) <= 10 {
                assert!(ring.get_pixel(x, y)[0] > 0, "missing ring at ({x}, {y})");
                assert_eq!(px, outline.get_pixel(x, y));
            }
        }
        // well away from the subject nothing is painted
        assert_eq!(sticker.get_pixel(5, 5)[3], 0);
        assert_eq!(sticker.get_pixel(60, 150)[3], 0);
    }

    #[test]
    fn test_badge_with_unknown_theme_falls_back() {
        let pipeline = StickerPipeline::builder().with_badge_size(64).build().unwrap();
        let photo = DynamicImage::ImageRgb8(create_test_image());
        let fallback = pipeline.generate(&photo, None, "badge", Some("unknown-theme")).unwrap();
        let classic = pipeline.generate(&photo, None, "badge", Some("classic")).unwrap();
        assert_eq!(fallback.roles(), vec![Role::Badge]);
        assert_eq!(fallback.get(Role::Badge), classic.get(Role::Badge));
    }

    #[test]
    fn test_unrecognized_mode() {
        let pipeline = StickerPipeline::builder().build().unwrap();
        let photo = DynamicImage::ImageRgb8(create_test_image());
        assert!(matches!(
            pipeline.generate(&photo, None, "zzz", None),
            Err(StickerError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_sticker_fits_default_canvas() {
        let pipeline = StickerPipeline::builder().build().unwrap();
        let photo = DynamicImage::ImageRgb8(create_test_image());
        let manifest = pipeline.generate(&photo, None, "sticker", None).unwrap();

        let cutout = AlphaMatte::new(manifest.get(Role::Cutout).unwrap().clone());
        let bbox = cutout.bounding_box().unwrap();
        let canvas = CanvasSpec::default();
        assert!(bbox.x >= canvas.margin && bbox.y >= canvas.margin);
        assert!(bbox.width <= canvas.usable_width() && bbox.height <= canvas.usable_height());
        assert_eq!(manifest.get(Role::Sticker).unwrap().dimensions(), (512, 512));
    }
}
