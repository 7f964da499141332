use std::sync::Arc;

use crate::{
    algorithms::{badge::ThemeName, font::LabelFont},
    error::Result,
    pipeline::StickerPipeline,
    providers::{CornerKeySegmenter, FixedCaptioner, StaticProvider},
    settings::PipelineSettings,
    traits::ModelProvider,
    types::CanvasSpec,
};

/// Builder for creating sticker pipelines with a fluent API
#[derive(Default)]
pub struct PipelineBuilder {
    provider: Option<Arc<dyn ModelProvider>>,
    settings: PipelineSettings,
    label_font: Option<LabelFont>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segmentation/captioning collaborators (replaces any existing ones)
    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: ModelProvider + 'static,
    {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Share a provider that other pipelines also use
    pub fn with_shared_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace every setting at once
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_stroke(mut self, radius: i32, color: [u8; 4]) -> Self {
        self.settings.stroke.radius = radius;
        self.settings.stroke.color = color;
        self
    }

    pub fn with_stroke_radius(mut self, radius: i32) -> Self {
        self.settings.stroke.radius = radius;
        self
    }

    pub fn with_outline_color(mut self, color: [u8; 4]) -> Self {
        self.settings.stroke.color = color;
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasSpec) -> Self {
        self.settings.canvas = canvas;
        self
    }

    pub fn with_badge_size(mut self, size: u32) -> Self {
        self.settings.badge_size = size;
        self
    }

    pub fn with_default_theme(mut self, theme: ThemeName) -> Self {
        self.settings.default_theme = theme;
        self
    }

    /// Use an already-loaded caption font instead of `settings.label`
    pub fn with_label_font(mut self, font: LabelFont) -> Self {
        self.label_font = Some(font);
        self
    }

    /// Also emit the bare outline ring in sticker and labeled manifests
    pub fn emit_outline_layer(mut self, enabled: bool) -> Self {
        self.settings.emit_outline_layer = enabled;
        self
    }

    /// Validate the settings and build the pipeline.
    ///
    /// Without a provider, the corner-key segmenter and an empty caption are used.
    pub fn build(self) -> Result<StickerPipeline> {
        self.settings.validate()?;
        let label_font = match self.label_font {
            Some(font) => font,
            None => self.settings.label.load_font()?,
        };
        let provider = self.provider.unwrap_or_else(|| {
            Arc::new(StaticProvider::new(CornerKeySegmenter::default(), FixedCaptioner::default()))
        });
        Ok(StickerPipeline::new(provider, self.settings, label_font))
    }
}
