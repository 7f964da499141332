use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::{
    drawing::{draw_filled_circle_mut, draw_filled_rect_mut},
    rect::Rect,
};
use tracing::debug;

use crate::{
    algorithms::{
        composite::{composite, composite_onto, Layer},
        font::LabelFont,
    },
    error::Result,
    types::{ensure_area, to_rgba},
};

/// Geometry and colors of the caption band
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    /// Transparent padding around the sticker
    pub padding: u32,
    /// Extra height reserved below the sticker for the caption
    pub band_height: u32,
    /// Gap between the sticker's bottom edge and the panel
    pub panel_gap: u32,
    pub panel_height: u32,
    pub corner_radius: u32,
    pub panel_color: Rgba<u8>,
    /// Text origin relative to the panel's top-left corner
    pub text_inset: (u32, u32),
    pub text_color: Rgba<u8>,
    /// Longest caption drawn before truncation
    pub max_chars: usize,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self {
            padding: 40,
            band_height: 100,
            panel_gap: 15,
            panel_height: 70,
            corner_radius: 16,
            panel_color: Rgba([255, 255, 255, 220]),
            text_inset: (14, 20),
            text_color: Rgba([10, 10, 10, 255]),
            max_chars: 70,
        }
    }
}

/// Appends a captioned panel under a sticker
#[derive(Debug, Clone, Default)]
pub struct LabelRenderer {
    pub layout: LabelLayout,
    pub font: LabelFont,
}

impl LabelRenderer {
    pub fn new(font: LabelFont) -> Self {
        Self {
            layout: LabelLayout::default(),
            font,
        }
    }

    pub fn render(&self, sticker: &DynamicImage, caption: Option<&str>) -> Result<RgbaImage> {
        let sticker = to_rgba(sticker);
        let (w, h) = sticker.dimensions();
        ensure_area(w, h)?;

        let layout = &self.layout;
        let pad = layout.padding;
        let canvas_w = w + pad * 2;
        let canvas_h = h + pad * 2 + layout.band_height;
        let placed = Layer::at(&sticker, i64::from(pad), i64::from(pad));
        let mut canvas = composite(canvas_w, canvas_h, &[placed]);

        let (inset_x, inset_y) = layout.text_inset;
        let max_width = w.saturating_sub(2 * inset_x);
        let text = fit_caption(&self.font, &truncate_caption(caption, layout.max_chars), max_width);
        debug!(canvas_w, canvas_h, chars = text.chars().count(), max_width, "rendering label");

        let panel_top = h + pad + layout.panel_gap;
        let mut panel = RgbaImage::new(canvas_w, canvas_h);
        draw_rounded_rect(
            &mut panel,
            (pad, panel_top),
            (w, layout.panel_height),
            layout.corner_radius,
            layout.panel_color,
        );
        canvas = composite_onto(&canvas, &[Layer::new(&panel)]);

        self.font.draw(
            &mut canvas,
            (pad + inset_x) as i32,
            (panel_top + inset_y) as i32,
            layout.text_color,
            &text,
        );
        Ok(canvas)
    }
}

/// Render a label with the default layout and built-in font
pub fn render_label(sticker: &DynamicImage, caption: Option<&str>) -> Result<RgbaImage> {
    LabelRenderer::default().render(sticker, caption)
}

/// Trim the caption and cut it to `max_chars`, ending in `…` when shortened.
///
/// Counts Unicode scalar values, so multi-byte text is never split mid-char.
pub fn truncate_caption(caption: Option<&str>, max_chars: usize) -> String {
    let text = caption.unwrap_or_default().trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push('…');
    truncated
}

/// Shorten `text` until `font` draws it within `max_width` pixels.
///
/// Characters are dropped from the end and replaced by `…`; when not even the
/// ellipsis fits, nothing is drawn.
pub fn fit_caption(font: &LabelFont, text: &str, max_width: u32) -> String {
    if font.text_width(text) <= max_width {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    for keep in (0..chars.len()).rev() {
        let head: String = chars[..keep].iter().collect();
        let candidate = format!("{}…", head.trim_end());
        if font.text_width(&candidate) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Filled rectangle with quarter-circle corners; pixels are overwritten, not blended
fn draw_rounded_rect(
    canvas: &mut RgbaImage,
    origin: (u32, u32),
    size: (u32, u32),
    radius: u32,
    color: Rgba<u8>,
) {
    let (x, y) = (origin.0 as i32, origin.1 as i32);
    let (w, h) = size;
    if w == 0 || h == 0 {
        return;
    }
    let r = radius.min((w - 1) / 2).min((h - 1) / 2);
    let ri = r as i32;

    draw_filled_rect_mut(canvas, Rect::at(x + ri, y).of_size(w - 2 * r, h), color);
    draw_filled_rect_mut(canvas, Rect::at(x, y + ri).of_size(w, h - 2 * r), color);
    if r == 0 {
        return;
    }

    let (right, bottom) = (x + w as i32 - 1 - ri, y + h as i32 - 1 - ri);
    for center in [(x + ri, y + ri), (right, y + ri), (x + ri, bottom), (right, bottom)] {
        draw_filled_circle_mut(canvas, center, ri, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sticker(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 40, 40, 255])))
    }

    #[test]
    fn test_truncate_short_caption_is_kept() {
        assert_eq!(truncate_caption(Some("  a cat on a mat "), 70), "a cat on a mat");
    }

    #[test]
    fn test_truncate_absent_caption_is_empty() {
        assert_eq!(truncate_caption(None, 70), "");
        assert_eq!(truncate_caption(Some("   "), 70), "");
    }

    #[test]
    fn test_truncate_long_caption_appends_ellipsis() {
        let long = "x".repeat(100);
        let out = truncate_caption(Some(&long), 70);
        assert_eq!(out.chars().count(), 68);
        assert!(out.ends_with('…'));
        assert!(out.starts_with(&"x".repeat(67)));

        let exact = "y".repeat(70);
        assert_eq!(truncate_caption(Some(&exact), 70), exact);
    }

    #[test]
    fn test_truncate_respects_multibyte_chars() {
        let text = "é".repeat(80);
        let out = truncate_caption(Some(&text), 70);
        assert_eq!(out.chars().filter(|c| *c == 'é').count(), 67);
    }

    #[test]
    fn test_label_canvas_geometry() {
        let out = render_label(&sticker(120, 80), Some("a red square")).unwrap();
        assert_eq!(out.dimensions(), (200, 260));

        // sticker at the padded offset, padding transparent
        assert_eq!(out.get_pixel(40, 40), &Rgba([200, 40, 40, 255]));
        assert_eq!(out.get_pixel(10, 10)[3], 0);

        // panel: semi-opaque white below the sticker
        let panel_top = 80 + 40 + 15;
        let px = out.get_pixel(40 + 60, panel_top + 5);
        assert_eq!(px, &Rgba([255, 255, 255, 220]));
        // rounded corner leaves the very corner transparent
        assert_eq!(out.get_pixel(40, panel_top)[3], 0);
        // below the panel stays transparent
        assert_eq!(out.get_pixel(100, panel_top + 75)[3], 0);
    }

    #[test]
    fn test_label_draws_caption_text() {
        let blank = render_label(&sticker(150, 60), None).unwrap();
        let captioned = render_label(&sticker(150, 60), Some("Hello")).unwrap();
        assert_ne!(blank, captioned);

        let dark = captioned.pixels().filter(|p| p[0] < 100 && p[3] > 200).count();
        assert!(dark > 0);
    }

    #[test]
    fn test_fit_caption_measures_drawn_width() {
        let font = LabelFont::default();
        assert_eq!(fit_caption(&font, "short", 484), "short");

        let long = "a caption that is much too long for the panel it is drawn into, really";
        let fitted = fit_caption(&font, long, 484);
        assert!(fitted.ends_with('…'));
        assert!(font.text_width(&fitted) <= 484);
        // at most one glyph plus a trimmed space short of the limit
        assert!(font.text_width(&fitted) > 484 - 24);

        assert_eq!(fit_caption(&font, "tiny", 0), "");
    }

    #[test]
    fn test_long_caption_ink_stays_inside_panel() {
        let caption = "A".repeat(69);
        let layout = LabelLayout::default();
        let (w, h) = (512, 512);
        let out = render_label(&sticker(w, h), Some(&caption)).unwrap();

        let band_top = h + layout.padding;
        let inner = layout.padding + layout.text_inset.0..layout.padding + w - layout.text_inset.0;
        let mut rightmost = 0;
        for (x, y, px) in out.enumerate_pixels() {
            if y >= band_top && px[0] < 100 && px[3] > 200 {
                assert!(inner.contains(&x), "ink outside the panel at ({x}, {y})");
                rightmost = rightmost.max(x);
            }
        }
        // the ellipsis dots end close to the right inset
        assert!(rightmost + 24 >= inner.end, "text stops at {rightmost}");
    }

    #[test]
    fn test_degenerate_sticker_is_rejected() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(render_label(&empty, Some("x")).is_err());
    }

    #[test]
    fn test_tiny_sticker_does_not_panic() {
        let out = render_label(&sticker(1, 1), Some("tiny")).unwrap();
        assert_eq!(out.dimensions(), (81, 181));
    }
}
