use std::{
    fs,
    path::{Path, PathBuf},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::{badge::ThemeName, font::LabelFont},
    error::{Result, StickerError},
    types::{CanvasSpec, StrokeSpec},
};

/// Tunable parameters of a [`crate::StickerPipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineSettings {
    /// Outline radius and color for sticker/labeled modes
    pub stroke: StrokeSpec,
    /// Canvas the cutout is fitted onto before outlining
    pub canvas: CanvasSpec,
    /// Edge length of badge output in pixels
    #[schemars(range(min = 1, max = 4096))]
    pub badge_size: u32,
    /// Theme used when a badge request names none
    pub default_theme: ThemeName,
    /// Also emit the bare outline ring as an `outline` artifact
    pub emit_outline_layer: bool,
    pub label: LabelSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            stroke: StrokeSpec::default(),
            canvas: CanvasSpec::default(),
            badge_size: 512,
            default_theme: ThemeName::default(),
            emit_outline_layer: false,
            label: LabelSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Load settings from a JSON file, then validate them
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string; missing fields keep their defaults
    pub fn from_json(content: &str) -> Result<Self> {
        let settings: PipelineSettings = serde_json::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.stroke.validate()?;
        self.canvas.validate()?;
        if self.badge_size == 0 {
            return Err(StickerError::DegenerateImage { width: 0, height: 0 });
        }
        Ok(())
    }
}

/// Caption font selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LabelSettings {
    /// TrueType/OpenType font file; the built-in bitmap font is used when unset
    pub font_path: Option<PathBuf>,
    /// Pixel height for `font_path`
    pub font_px: f32,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            font_path: None,
            font_px: 22.0,
        }
    }
}

impl LabelSettings {
    pub fn load_font(&self) -> Result<LabelFont> {
        match &self.font_path {
            Some(path) => LabelFont::from_file(path, self.font_px),
            None => Ok(LabelFont::default()),
        }
    }
}
