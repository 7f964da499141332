use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, RgbaImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{Result, StickerError};

/// Output modes understood by the pipeline
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    VariantNames,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Mode {
    /// Background-free subject only
    Cutout,
    /// Fitted cutout with a synthetic outline ring
    Sticker,
    /// Circular themed badge
    Badge,
    /// Sticker with a caption band underneath
    Labeled,
}

impl Mode {
    /// Parse a user-supplied mode name
    pub fn parse(name: &str) -> Result<Self> {
        name.trim()
            .parse()
            .map_err(|_| StickerError::InvalidMode(name.to_string()))
    }

    /// Names of every supported mode
    pub fn names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }
}

/// Role of an artifact inside an [`OutputManifest`]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Cutout,
    Outline,
    Label,
    Badge,
    Sticker,
}

/// Pipeline stage, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Segmentation,
    Captioning,
    Fit,
    Outline,
    Badge,
    Label,
}

/// Decode an image file, format guessed from its extension and contents
pub fn open_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Convert any decoded image to RGBA; opaque inputs get alpha 255 everywhere.
pub fn to_rgba(image: &DynamicImage) -> RgbaImage {
    match image {
        DynamicImage::ImageRgba8(rgba) => rgba.clone(),
        other => other.to_rgba8(),
    }
}

/// Reject images with zero area
pub fn ensure_area(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(StickerError::DegenerateImage { width, height });
    }
    Ok(())
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// An RGBA image viewed through its transparency channel
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMatte {
    image: RgbaImage,
}

impl AlphaMatte {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::new(to_rgba(image))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Extract the transparency channel
    pub fn alpha(&self) -> GrayImage {
        GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            Luma([self.image.get_pixel(x, y)[3]])
        })
    }

    /// Copy of this matte with its transparency channel replaced
    pub fn with_alpha(&self, alpha: &GrayImage) -> Result<Self> {
        if alpha.dimensions() != self.image.dimensions() {
            return Err(StickerError::DimensionMismatch {
                expected: self.image.dimensions(),
                actual: alpha.dimensions(),
            });
        }
        let mut image = self.image.clone();
        for (pixel, a) in image.pixels_mut().zip(alpha.pixels()) {
            pixel[3] = a[0];
        }
        Ok(Self { image })
    }

    /// Tight bounds of every pixel that is not fully transparent
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut found = false;

        for (x, y, pixel) in self.image.enumerate_pixels() {
            if pixel[3] == 0 {
                continue;
            }
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        found.then(|| BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }
}

/// Outline stroke: radius in pixels and RGBA fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StrokeSpec {
    /// Ring width in pixels; 0 disables the outline
    #[schemars(range(min = 0, max = 256))]
    pub radius: i32,
    /// RGBA color of the ring
    pub color: [u8; 4],
}

impl StrokeSpec {
    pub const DEFAULT_RADIUS: i32 = 18;
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];

    pub fn new(radius: i32, color: [u8; 4]) -> Result<Self> {
        let spec = Self { radius, color };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.radius < 0 {
            return Err(StickerError::InvalidStrokeSpec(self.radius));
        }
        Ok(())
    }
}

impl Default for StrokeSpec {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            color: Self::WHITE,
        }
    }
}

/// Fixed-size target canvas with an inner margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    /// Empty border kept on every side
    pub margin: u32,
}

impl CanvasSpec {
    pub fn new(width: u32, height: u32, margin: u32) -> Result<Self> {
        let spec = Self { width, height, margin };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StickerError::InvalidCanvasSpec(format!(
                "canvas {}x{} has no area",
                self.width, self.height
            )));
        }
        // margin < min(w, h) / 2, kept in integers
        if self.margin.saturating_mul(2) >= self.width.min(self.height) {
            return Err(StickerError::InvalidCanvasSpec(format!(
                "margin {} leaves no room inside {}x{}",
                self.margin, self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn usable_width(&self) -> u32 {
        self.width - 2 * self.margin
    }

    pub fn usable_height(&self) -> u32 {
        self.height - 2 * self.margin
    }
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            margin: 40,
        }
    }
}

/// One produced image and what it is
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub role: Role,
    pub image: RgbaImage,
}

/// Ordered artifacts produced by a single pipeline invocation
#[derive(Debug, Clone, PartialEq)]
pub struct OutputManifest {
    pub mode: Mode,
    pub artifacts: Vec<Artifact>,
}

impl OutputManifest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            artifacts: Vec::new(),
        }
    }

    pub fn push(&mut self, role: Role, image: RgbaImage) {
        self.artifacts.push(Artifact { role, image });
    }

    /// First artifact with the given role
    pub fn get(&self, role: Role) -> Option<&RgbaImage> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.role == role)
            .map(|artifact| &artifact.image)
    }

    pub fn roles(&self) -> Vec<Role> {
        self.artifacts.iter().map(|artifact| artifact.role).collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Artifact> {
        self.artifacts.iter()
    }
}

impl IntoIterator for OutputManifest {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}
