use std::f32::consts::FRAC_1_SQRT_2;

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, warn};

use crate::{
    algorithms::{
        composite::{composite_onto, Layer},
        fit::CanvasFitter,
    },
    error::{Result, StickerError},
    types::CanvasSpec,
};

/// Named badge color presets
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum ThemeName {
    #[default]
    Classic,
    Sunset,
    Ocean,
    Forest,
    Candy,
    Midnight,
}

/// Base fill and glow colors of a badge background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    pub base: [u8; 3],
    pub glow: [u8; 3],
}

impl Theme {
    pub fn preset(name: ThemeName) -> Self {
        let (base, glow) = match name {
            ThemeName::Classic => ([52, 73, 94], [236, 240, 241]),
            ThemeName::Sunset => ([230, 92, 58], [255, 206, 84]),
            ThemeName::Ocean => ([21, 101, 192], [128, 222, 234]),
            ThemeName::Forest => ([46, 125, 50], [197, 225, 165]),
            ThemeName::Candy => ([236, 64, 122], [248, 187, 208]),
            ThemeName::Midnight => ([26, 26, 46], [123, 97, 255]),
        };
        Self { name, base, glow }
    }

    /// Look a theme up by name; unknown names fall back to the default preset
    pub fn resolve(name: &str) -> Self {
        match name.trim().parse::<ThemeName>() {
            Ok(theme) => Self::preset(theme),
            Err(_) => {
                let fallback = ThemeName::default();
                warn!(theme = name, %fallback, "unknown theme, using default");
                Self::preset(ThemeName::default())
            }
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::preset(ThemeName::default())
    }
}

const GLOW_ALPHA: u8 = 150;
const BORDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Circular, themed badge composition
#[derive(Debug, Clone)]
pub struct BadgeRenderer {
    pub size: u32,
    pub theme: Theme,
}

impl BadgeRenderer {
    pub fn new(size: u32, theme: Theme) -> Self {
        Self { size, theme }
    }

    /// Gap between the canvas edge and the clip circle
    pub fn inset(&self) -> u32 {
        (self.size / 16).max(1)
    }

    pub fn clip_radius(&self) -> f32 {
        self.size as f32 / 2.0 - self.inset() as f32
    }

    pub fn border_width(&self) -> u32 {
        (self.size / 64).max(2)
    }

    /// Square canvas whose usable area is the square inscribed in the clip circle
    pub fn subject_canvas(&self) -> CanvasSpec {
        let size = self.size;
        let half_side = (self.clip_radius().max(0.0) * FRAC_1_SQRT_2).floor() as u32;
        let margin = (size / 2).saturating_sub(half_side).min(size.saturating_sub(1) / 2);
        CanvasSpec { width: size, height: size, margin }
    }

    pub fn render(&self, subject: &DynamicImage) -> Result<RgbaImage> {
        let size = self.size;
        if size == 0 {
            return Err(StickerError::DegenerateImage { width: 0, height: 0 });
        }
        debug!(size, theme = %self.theme.name, "rendering badge");

        let background = self.background();

        // trimmed and centered, so an off-center subject still lands inside the clip
        let subject = CanvasFitter::new(self.subject_canvas()).fit(subject)?;
        let composed = composite_onto(&background, &[Layer::new(&subject)]);

        let mask = circle_mask(size, self.clip_radius());
        let clipped = apply_mask(&composed, &mask);

        let border = self.border_layer();
        Ok(composite_onto(&clipped, &[Layer::new(&border)]))
    }

    /// Base fill with a blurred elliptical glow on top
    fn background(&self) -> RgbaImage {
        let size = self.size;
        let [br, bg, bb] = self.theme.base;
        let [gr, gg, gb] = self.theme.glow;
        let base = RgbaImage::from_pixel(size, size, Rgba([br, bg, bb, 255]));

        // glow color everywhere so blurring only spreads coverage, not black
        let mut glow = RgbaImage::from_pixel(size, size, Rgba([gr, gg, gb, 0]));
        let center = (size / 2) as i32;
        let radius = (size / 2).saturating_sub(size / 8).max(1) as i32;
        let glow_color = Rgba([gr, gg, gb, GLOW_ALPHA]);
        draw_filled_ellipse_mut(&mut glow, (center, center), radius, radius, glow_color);

        let sigma = (size as f32 / 16.0).max(1.0);
        let glow = imageproc::filter::gaussian_blur_f32(&glow, sigma);
        composite_onto(&base, &[Layer::new(&glow)])
    }

    /// White ring just inside the clip circle
    fn border_layer(&self) -> RgbaImage {
        let outer = self.clip_radius();
        let inner = (outer - self.border_width() as f32).max(0.0);
        let c = self.size as f32 / 2.0;
        RgbaImage::from_fn(self.size, self.size, |x, y| {
            let d2 = distance_sq(x, y, c);
            if d2 <= outer * outer && d2 >= inner * inner {
                BORDER_COLOR
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

/// Render a `size x size` badge, falling back to the default theme for unknown names
pub fn render_badge(subject: &DynamicImage, size: u32, theme: &str) -> Result<RgbaImage> {
    BadgeRenderer::new(size, Theme::resolve(theme)).render(subject)
}

/// Squared distance from a pixel center to `(c, c)`
fn distance_sq(x: u32, y: u32, c: f32) -> f32 {
    let dx = x as f32 + 0.5 - c;
    let dy = y as f32 + 0.5 - c;
    dx * dx + dy * dy
}

/// 255 inside the circle of `radius` centered on the canvas, 0 outside
pub fn circle_mask(size: u32, radius: f32) -> GrayImage {
    let c = size as f32 / 2.0;
    let r2 = radius.max(0.0).powi(2);
    GrayImage::from_fn(size, size, |x, y| {
        Luma([if distance_sq(x, y, c) <= r2 { 255 } else { 0 }])
    })
}

/// Keep pixels where the mask is set, fully transparent elsewhere
fn apply_mask(image: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let m = u16::from(mask.get_pixel(x, y)[0]);
        let mut px = *image.get_pixel(x, y);
        px[3] = ((u16::from(px[3]) * m + 127) / 255) as u8;
        if px[3] == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            px
        }
    })
}
