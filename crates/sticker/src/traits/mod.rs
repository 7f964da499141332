use image::{GrayImage, RgbImage, RgbaImage};
use crate::error::Result;

/// Trait for subject/background segmentation collaborators
pub trait Segmenter: Send + Sync {
    /// Return an RGBA image of the same size whose alpha isolates the subject
    fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage>;
}

/// Trait for caption generation collaborators
pub trait Captioner: Send + Sync {
    /// Describe the image in natural language (may be empty)
    fn caption(&self, image: &RgbImage) -> Result<String>;
}

/// Bundle of the model-backed collaborators the pipeline depends on.
///
/// Implementations are shared across threads and must be read-only once
/// constructed.
pub trait ModelProvider: Send + Sync {
    fn segmenter(&self) -> Result<&dyn Segmenter>;

    fn captioner(&self) -> Result<&dyn Captioner>;
}

/// Trait for single-channel mask filters (dilate, blur, ...)
pub trait MaskFilter: Send + Sync {
    /// Produce a new mask; the input is never modified
    fn apply(&self, mask: &GrayImage) -> Result<GrayImage>;
}
