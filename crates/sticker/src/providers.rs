use std::sync::OnceLock;

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tracing::info;

use crate::{
    error::{Result, StickerError},
    traits::{Captioner, ModelProvider, Segmenter},
};

/// Provider built from an already-constructed segmenter and captioner
#[derive(Debug, Clone, Default)]
pub struct StaticProvider<S, C> {
    pub segmenter: S,
    pub captioner: C,
}

impl<S, C> StaticProvider<S, C>
where
    S: Segmenter,
    C: Captioner,
{
    pub fn new(segmenter: S, captioner: C) -> Self {
        Self { segmenter, captioner }
    }
}

impl<S, C> ModelProvider for StaticProvider<S, C>
where
    S: Segmenter,
    C: Captioner,
{
    fn segmenter(&self) -> Result<&dyn Segmenter> {
        Ok(&self.segmenter)
    }

    fn captioner(&self) -> Result<&dyn Captioner> {
        Ok(&self.captioner)
    }
}

type ProviderInit = Box<dyn Fn() -> Result<Box<dyn ModelProvider>> + Send + Sync>;

/// Provider created on first use and shared read-only afterwards.
///
/// The initializer runs at most once per instance, even when several threads
/// race for the first call. A failed initialization is remembered and reported
/// on every later call.
pub struct LazyProvider {
    init: ProviderInit,
    cell: OnceLock<std::result::Result<Box<dyn ModelProvider>, String>>,
}

impl LazyProvider {
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ModelProvider>> + Send + Sync + 'static,
    {
        Self {
            init: Box::new(init),
            cell: OnceLock::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    fn get(&self) -> std::result::Result<&dyn ModelProvider, &str> {
        let loaded = self.cell.get_or_init(|| {
            info!("initializing model provider");
            (self.init)().map_err(|e| e.to_string())
        });
        match loaded {
            Ok(provider) => Ok(&**provider),
            Err(message) => Err(message.as_str()),
        }
    }
}

impl std::fmt::Debug for LazyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyProvider")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl ModelProvider for LazyProvider {
    fn segmenter(&self) -> Result<&dyn Segmenter> {
        self.get()
            .map_err(|e| {
                StickerError::SegmentationFailure(format!("model provider unavailable: {e}"))
            })?
            .segmenter()
    }

    fn captioner(&self) -> Result<&dyn Captioner> {
        self.get()
            .map_err(|e| {
                StickerError::CaptioningFailure(format!("model provider unavailable: {e}"))
            })?
            .captioner()
    }
}

/// Keys out the background by its distance to the mean corner color.
///
/// Pixels within `tolerance` become transparent, pixels beyond
/// `tolerance + feather` stay opaque, with a linear ramp in between.
#[derive(Debug, Clone)]
pub struct CornerKeySegmenter {
    pub tolerance: f32,
    pub feather: f32,
}

impl Default for CornerKeySegmenter {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            feather: 16.0,
        }
    }
}

impl CornerKeySegmenter {
    fn key_color(image: &RgbImage) -> [f32; 3] {
        let (w, h) = image.dimensions();
        let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
        let mut sum = [0.0f32; 3];
        for (x, y) in corners {
            let Rgb(px) = *image.get_pixel(x, y);
            for c in 0..3 {
                sum[c] += f32::from(px[c]);
            }
        }
        sum.map(|s| s / corners.len() as f32)
    }
}

impl Segmenter for CornerKeySegmenter {
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(StickerError::SegmentationFailure(format!(
                "cannot segment a {w}x{h} image"
            )));
        }
        if !(self.tolerance.is_finite() && self.feather.is_finite()) {
            return Err(StickerError::SegmentationFailure(
                "tolerance and feather must be finite".to_string(),
            ));
        }

        let key = Self::key_color(image);
        let feather = self.feather.max(f32::EPSILON);
        Ok(RgbaImage::from_fn(w, h, |x, y| {
            let Rgb([r, g, b]) = *image.get_pixel(x, y);
            let distance = [r, g, b]
                .iter()
                .zip(key.iter())
                .map(|(&v, &k)| (f32::from(v) - k).powi(2))
                .sum::<f32>()
                .sqrt();
            let coverage = ((distance - self.tolerance) / feather).clamp(0.0, 1.0);
            Rgba([r, g, b, (coverage * 255.0).round() as u8])
        }))
    }
}

/// Captioner that always answers with the same text
#[derive(Debug, Clone, Default)]
pub struct FixedCaptioner(pub String);

impl Captioner for FixedCaptioner {
    fn caption(&self, _image: &RgbImage) -> Result<String> {
        Ok(self.0.clone())
    }
}
