pub mod builder;

use std::sync::Arc;

use image::{DynamicImage, RgbImage, RgbaImage};
use tracing::{debug, info, instrument};

use crate::{
    algorithms::{
        badge::{BadgeRenderer, Theme},
        fit::CanvasFitter,
        font::LabelFont,
        label::LabelRenderer,
        outline::OutlineSynthesizer,
    },
    error::{Result, StickerError},
    settings::PipelineSettings,
    traits::ModelProvider,
    types::{ensure_area, Mode, OutputManifest, Role, Stage},
};

/// Turns a photo into sticker-style artifacts for one of the [`Mode`]s.
///
/// The pipeline only holds read-only state and can be shared between threads
/// behind an `Arc`.
pub struct StickerPipeline {
    provider: Arc<dyn ModelProvider>,
    settings: PipelineSettings,
    label_font: LabelFont,
}

impl StickerPipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        provider: Arc<dyn ModelProvider>,
        settings: PipelineSettings,
        label_font: LabelFont,
    ) -> Self {
        Self {
            provider,
            settings,
            label_font,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the pipeline for a mode given by name
    pub fn generate(
        &self,
        image: &DynamicImage,
        caption: Option<&str>,
        mode: &str,
        theme: Option<&str>,
    ) -> Result<OutputManifest> {
        let mode = Mode::parse(mode)?;
        self.generate_mode(image, caption, mode, theme)
    }

    #[instrument(
        skip(self, image, caption),
        fields(width = image.width(), height = image.height())
    )]
    pub fn generate_mode(
        &self,
        image: &DynamicImage,
        caption: Option<&str>,
        mode: Mode,
        theme: Option<&str>,
    ) -> Result<OutputManifest> {
        ensure_area(image.width(), image.height())?;
        info!(%mode, "generating");

        let rgb = image.to_rgb8();
        let mut manifest = OutputManifest::new(mode);
        match mode {
            Mode::Cutout => {
                let cutout = self.segment(&rgb).map_err(|e| e.at(mode, Stage::Segmentation))?;
                manifest.push(Role::Cutout, cutout);
            }
            Mode::Sticker => {
                let cutout = self.segment(&rgb).map_err(|e| e.at(mode, Stage::Segmentation))?;
                self.push_sticker(&mut manifest, cutout)?;
            }
            Mode::Badge => {
                let cutout = self.segment(&rgb).map_err(|e| e.at(mode, Stage::Segmentation))?;
                let theme = match theme {
                    Some(name) => Theme::resolve(name),
                    None => Theme::preset(self.settings.default_theme),
                };
                debug!(theme = %theme.name, size = self.settings.badge_size, "badge stage");
                let badge = BadgeRenderer::new(self.settings.badge_size, theme)
                    .render(&DynamicImage::ImageRgba8(cutout))
                    .map_err(|e| e.at(mode, Stage::Badge))?;
                manifest.push(Role::Badge, badge);
            }
            Mode::Labeled => {
                let cutout = self.segment(&rgb).map_err(|e| e.at(mode, Stage::Segmentation))?;
                let caption = match caption {
                    Some(text) => text.to_string(),
                    None => self.caption(&rgb).map_err(|e| e.at(mode, Stage::Captioning))?,
                };
                let sticker = self.push_sticker(&mut manifest, cutout)?;

                debug!(caption = %caption, "label stage");
                let label = LabelRenderer::new(self.label_font.clone())
                    .render(&DynamicImage::ImageRgba8(sticker), Some(&caption))
                    .map_err(|e| e.at(mode, Stage::Label))?;
                manifest.push(Role::Label, label);
            }
        }

        info!(%mode, artifacts = manifest.len(), "generated");
        Ok(manifest)
    }

    /// Fit and outline a cutout, pushing the intermediate artifacts.
    ///
    /// Returns the finished sticker, which is also pushed.
    fn push_sticker(&self, manifest: &mut OutputManifest, cutout: RgbaImage) -> Result<RgbaImage> {
        let mode = manifest.mode;
        let canvas = self.settings.canvas;
        debug!(canvas_w = canvas.width, canvas_h = canvas.height, "fit stage");
        let fitted = CanvasFitter::new(canvas)
            .fit(&DynamicImage::ImageRgba8(cutout))
            .map_err(|e| e.at(mode, Stage::Fit))?;

        debug!(radius = self.settings.stroke.radius, "outline stage");
        let fitted = DynamicImage::ImageRgba8(fitted);
        let (outline, sticker) = OutlineSynthesizer::new(self.settings.stroke)
            .apply(&fitted)
            .map_err(|e| e.at(mode, Stage::Outline))?;

        manifest.push(Role::Cutout, fitted.into_rgba8());
        if self.settings.emit_outline_layer {
            manifest.push(Role::Outline, outline);
        }
        manifest.push(Role::Sticker, sticker.clone());
        Ok(sticker)
    }

    fn segment(&self, image: &RgbImage) -> Result<RgbaImage> {
        let cutout = self.provider.segmenter()?.remove_background(image)?;
        if cutout.dimensions() != image.dimensions() {
            let (ew, eh) = image.dimensions();
            let (aw, ah) = cutout.dimensions();
            return Err(StickerError::SegmentationFailure(format!(
                "segmenter returned {aw}x{ah} for a {ew}x{eh} input"
            )));
        }
        debug!(
            transparent = cutout.pixels().filter(|p| p[3] == 0).count(),
            "segmentation stage"
        );
        Ok(cutout)
    }

    fn caption(&self, image: &RgbImage) -> Result<String> {
        let caption = self.provider.captioner()?.caption(image)?;
        debug!(caption = %caption, "captioning stage");
        Ok(caption)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let settings = &self.settings;
        format!(
            concat!(
                "StickerPipeline: stroke {}px {:?}, canvas {}x{} (margin {}), ",
                "badge {}px ({}), label font {:?}, outline layer {}",
            ),
            settings.stroke.radius,
            settings.stroke.color,
            settings.canvas.width,
            settings.canvas.height,
            settings.canvas.margin,
            settings.badge_size,
            settings.default_theme,
            self.label_font,
            if settings.emit_outline_layer { "on" } else { "off" },
        )
    }
}

impl std::fmt::Debug for StickerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StickerPipeline")
            .field("settings", &self.settings)
            .field("label_font", &self.label_font)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        providers::{CornerKeySegmenter, FixedCaptioner, StaticProvider},
        traits::{Captioner, Segmenter},
        types::CanvasSpec,
    };
    use image::Rgb;

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(160, 120, |x, y| {
            if (40..120).contains(&x) && (30..90).contains(&y) {
                Rgb([30, 90, 200])
            } else {
                Rgb([240, 240, 240])
            }
        }))
    }

    fn pipeline() -> StickerPipeline {
        StickerPipeline::builder()
            .with_canvas(CanvasSpec::new(128, 128, 16).unwrap())
            .with_stroke_radius(6)
            .with_badge_size(64)
            .build()
            .unwrap()
    }

    struct FailingSegmenter;

    impl Segmenter for FailingSegmenter {
        fn remove_background(&self, _image: &RgbImage) -> Result<RgbaImage> {
            Err(StickerError::SegmentationFailure("model exploded".to_string()))
        }
    }

    struct ShrinkingSegmenter;

    impl Segmenter for ShrinkingSegmenter {
        fn remove_background(&self, _image: &RgbImage) -> Result<RgbaImage> {
            Ok(RgbaImage::new(4, 4))
        }
    }

    /// Keeps only a 60x60 square in the top-left corner
    struct CornerSubjectSegmenter;

    impl Segmenter for CornerSubjectSegmenter {
        fn remove_background(&self, image: &RgbImage) -> Result<RgbaImage> {
            Ok(RgbaImage::from_fn(image.width(), image.height(), |x, y| {
                if x < 60 && y < 60 {
                    image::Rgba([220, 20, 20, 255])
                } else {
                    image::Rgba([0, 0, 0, 0])
                }
            }))
        }
    }

    struct FailingCaptioner;

    impl Captioner for FailingCaptioner {
        fn caption(&self, _image: &RgbImage) -> Result<String> {
            Err(StickerError::CaptioningFailure("no words".to_string()))
        }
    }

    #[test]
    fn test_manifest_roles_per_mode() {
        let pipeline = pipeline();
        let image = photo();

        let cutout = pipeline.generate(&image, None, "cutout", None).unwrap();
        assert_eq!(cutout.roles(), vec![Role::Cutout]);
        assert_eq!(cutout.get(Role::Cutout).unwrap().dimensions(), (160, 120));

        let sticker = pipeline.generate(&image, None, "sticker", None).unwrap();
        assert_eq!(sticker.roles(), vec![Role::Cutout, Role::Sticker]);
        assert_eq!(sticker.get(Role::Sticker).unwrap().dimensions(), (128, 128));

        let badge = pipeline.generate(&image, None, "badge", Some("sunset")).unwrap();
        assert_eq!(badge.roles(), vec![Role::Badge]);
        assert_eq!(badge.get(Role::Badge).unwrap().dimensions(), (64, 64));

        let labeled = pipeline.generate(&image, Some("blue box"), "labeled", None).unwrap();
        assert_eq!(labeled.roles(), vec![Role::Cutout, Role::Sticker, Role::Label]);
        assert_eq!(labeled.get(Role::Label).unwrap().dimensions(), (128 + 80, 128 + 180));
    }

    #[test]
    fn test_outline_layer_is_optional() {
        let pipeline = StickerPipeline::builder()
            .with_canvas(CanvasSpec::new(96, 96, 12).unwrap())
            .emit_outline_layer(true)
            .build()
            .unwrap();
        let manifest = pipeline.generate_mode(&photo(), None, Mode::Sticker, None).unwrap();
        assert_eq!(manifest.roles(), vec![Role::Cutout, Role::Outline, Role::Sticker]);
        let outline = manifest.get(Role::Outline).unwrap();
        assert!(outline.pixels().any(|p| p[3] > 0));
        assert!(outline.pixels().all(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
    }

    #[test]
    fn test_sticker_subject_sits_on_outline() {
        let manifest = pipeline().generate(&photo(), None, "sticker", None).unwrap();
        let cutout = manifest.get(Role::Cutout).unwrap();
        let sticker = manifest.get(Role::Sticker).unwrap();
        for (x, y, px) in cutout.enumerate_pixels() {
            if px[3] == 255 {
                assert_eq!(sticker.get_pixel(x, y), px);
            }
        }
        // something outside the subject was painted white by the ring
        let ring = sticker
            .enumerate_pixels()
            .filter(|(x, y, _)| cutout.get_pixel(*x, *y)[3] == 0)
            .any(|(_, _, p)| p.0[..3] == [255, 255, 255] && p[3] > 200);
        assert!(ring);
    }

    #[test]
    fn test_invalid_mode_produces_no_manifest() {
        let result = pipeline().generate(&photo(), None, "zzz", None);
        assert!(matches!(result, Err(StickerError::InvalidMode(m)) if m == "zzz"));
    }

    #[test]
    fn test_zero_area_input_is_rejected_before_segmentation() {
        let pipeline = StickerPipeline::builder()
            .with_provider(StaticProvider::new(FailingSegmenter, FixedCaptioner::default()))
            .build()
            .unwrap();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(matches!(
            pipeline.generate(&empty, None, "sticker", None),
            Err(StickerError::DegenerateImage { width: 0, height: 10 })
        ));
    }

    #[test]
    fn test_segmentation_failure_is_tagged_with_stage() {
        let pipeline = StickerPipeline::builder()
            .with_provider(StaticProvider::new(FailingSegmenter, FixedCaptioner::default()))
            .build()
            .unwrap();
        let err = pipeline.generate(&photo(), None, "badge", None).unwrap_err();
        assert!(matches!(
            &err,
            StickerError::Stage { mode: Mode::Badge, stage: Stage::Segmentation, .. }
        ));
        assert!(matches!(
            err.root(),
            StickerError::SegmentationFailure(m) if m == "model exploded"
        ));
    }

    #[test]
    fn test_segmenter_size_mismatch_is_a_failure() {
        let pipeline = StickerPipeline::builder()
            .with_provider(StaticProvider::new(ShrinkingSegmenter, FixedCaptioner::default()))
            .build()
            .unwrap();
        let err = pipeline.generate(&photo(), None, "cutout", None).unwrap_err();
        assert!(matches!(err.root(), StickerError::SegmentationFailure(_)));
    }

    #[test]
    fn test_labeled_asks_captioner_only_without_caption() {
        let pipeline = StickerPipeline::builder()
            .with_provider(StaticProvider::new(CornerKeySegmenter::default(), FailingCaptioner))
            .with_canvas(CanvasSpec::new(96, 96, 12).unwrap())
            .build()
            .unwrap();

        assert!(pipeline.generate(&photo(), Some("given"), "labeled", None).is_ok());

        let err = pipeline.generate(&photo(), None, "labeled", None).unwrap_err();
        assert!(matches!(
            &err,
            StickerError::Stage { mode: Mode::Labeled, stage: Stage::Captioning, .. }
        ));
    }

    #[test]
    fn test_labeled_uses_generated_caption() {
        let captioned = StickerPipeline::builder()
            .with_provider(StaticProvider::new(
                CornerKeySegmenter::default(),
                FixedCaptioner("a blue box".to_string()),
            ))
            .with_canvas(CanvasSpec::new(96, 96, 12).unwrap())
            .build()
            .unwrap();
        let generated = captioned.generate(&photo(), None, "labeled", None).unwrap();
        let explicit = captioned.generate(&photo(), Some("a blue box"), "labeled", None).unwrap();
        assert_eq!(generated.get(Role::Label), explicit.get(Role::Label));
    }

    #[test]
    fn test_badge_theme_defaults_to_settings() {
        let pipeline = StickerPipeline::builder()
            .with_badge_size(48)
            .with_default_theme(crate::algorithms::badge::ThemeName::Midnight)
            .build()
            .unwrap();
        let implicit = pipeline.generate(&photo(), None, "badge", None).unwrap();
        let explicit = pipeline.generate(&photo(), None, "badge", Some("midnight")).unwrap();
        assert_eq!(implicit, explicit);

        let unknown = pipeline.generate(&photo(), None, "badge", Some("unknown-theme")).unwrap();
        let classic = pipeline.generate(&photo(), None, "badge", Some("classic")).unwrap();
        assert_eq!(unknown, classic);
    }

    #[test]
    fn test_badge_recenters_off_center_cutout() {
        let pipeline = StickerPipeline::builder()
            .with_provider(StaticProvider::new(CornerSubjectSegmenter, FixedCaptioner::default()))
            .with_badge_size(128)
            .build()
            .unwrap();
        let photo = DynamicImage::ImageRgb8(RgbImage::new(400, 300));
        let manifest = pipeline.generate(&photo, None, "badge", None).unwrap();
        let badge = manifest.get(Role::Badge).unwrap();

        let red: Vec<(u32, u32)> = badge
            .enumerate_pixels()
            .filter(|(_, _, px)| px.0 == [220, 20, 20, 255])
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(red.len(), 60 * 60);
        let cx = red.iter().map(|&(x, _)| x).sum::<u32>() / red.len() as u32;
        let cy = red.iter().map(|&(_, y)| y).sum::<u32>() / red.len() as u32;
        assert!(cx.abs_diff(64) <= 1 && cy.abs_diff(64) <= 1, "centroid ({cx}, {cy})");
    }

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        let pipeline = Arc::new(pipeline());
        let handles: Vec<_> = ["cutout", "sticker", "badge"]
            .into_iter()
            .map(|mode| {
                let pipeline = Arc::clone(&pipeline);
                std::thread::spawn(move || {
                    pipeline.generate(&photo(), None, mode, None).map(|m| m.len())
                })
            })
            .collect();
        let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        assert_eq!(counts, vec![1, 2, 1]);
    }
}
