use std::{fmt, path::Path};

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};

use crate::{
    algorithms::composite::over,
    error::{Result, StickerError},
};

/// Font used for caption text
#[derive(Clone)]
pub enum LabelFont {
    /// 5x7 ASCII bitmap font, each dot drawn as `scale x scale` pixels
    Builtin { scale: u32 },
    /// Outline font loaded from disk, rendered by imageproc
    TrueType { font: FontArc, px: f32 },
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
            Self::TrueType { px, .. } => f.debug_struct("TrueType").field("px", px).finish(),
        }
    }
}

impl Default for LabelFont {
    fn default() -> Self {
        Self::Builtin { scale: 2 }
    }
}

impl LabelFont {
    /// Load a TrueType/OpenType font file
    pub fn from_file<P: AsRef<Path>>(path: P, px: f32) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| StickerError::FontLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes, px)
    }

    pub fn from_bytes(bytes: Vec<u8>, px: f32) -> Result<Self> {
        if !(px.is_finite() && px > 0.0) {
            return Err(StickerError::FontLoad(format!("invalid pixel height {px}")));
        }
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| StickerError::FontLoad(e.to_string()))?;
        Ok(Self::TrueType { font, px })
    }

    /// Horizontal extent of the ink `draw` would lay down for `text`
    pub fn text_width(&self, text: &str) -> u32 {
        match self {
            Self::Builtin { scale } => {
                let scale = (*scale).max(1);
                let chars = text.replace('…', "...").chars().count() as u32;
                // the last glyph has no trailing gap column
                (chars * GLYPH_ADVANCE * scale).saturating_sub(scale)
            }
            Self::TrueType { font, px } => {
                imageproc::drawing::text_size(PxScale::from(*px), font, text).0
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`, left-aligned
    pub fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        match self {
            Self::Builtin { scale } => draw_bitmap_text(canvas, x, y, (*scale).max(1), color, text),
            Self::TrueType { font, px } => {
                let scale = PxScale::from(*px);
                imageproc::drawing::draw_text_mut(canvas, color, x, y, scale, font, text)
            }
        }
    }
}

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

fn draw_bitmap_text(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    scale: u32,
    color: Rgba<u8>,
    text: &str,
) {
    let text = text.replace('…', "...");
    let mut pen_x = i64::from(x);
    for ch in text.chars() {
        let columns = glyph(ch);
        for (col, bits) in columns.iter().enumerate() {
            for row in 0..GLYPH_HEIGHT {
                if bits & (1 << row) == 0 {
                    continue;
                }
                let dot_x = pen_x + (col as i64) * i64::from(scale);
                let dot_y = i64::from(y) + i64::from(row * scale);
                fill_dot(canvas, dot_x, dot_y, scale, color);
            }
        }
        pen_x += i64::from(GLYPH_ADVANCE * scale);
    }
}

fn fill_dot(canvas: &mut RgbaImage, x: i64, y: i64, size: u32, color: Rgba<u8>) {
    for dy in 0..i64::from(size) {
        for dx in 0..i64::from(size) {
            let (px, py) = (x + dx, y + dy);
            let inside = (0..i64::from(canvas.width())).contains(&px)
                && (0..i64::from(canvas.height())).contains(&py);
            if !inside {
                continue;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            *dst = over(*dst, color);
        }
    }
}

/// Column bitmaps, bit 0 is the top row
fn glyph(ch: char) -> [u8; 5] {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        GLYPHS[(code - 0x20) as usize]
    } else {
        GLYPHS[('?' as u32 - 0x20) as usize]
    }
}

#[rustfmt::skip]
const GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5f, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7f, 0x14, 0x7f, 0x14], // #
    [0x24, 0x2a, 0x7f, 0x2a, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1c, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1c, 0x00], // )
    [0x14, 0x08, 0x3e, 0x08, 0x14], // *
    [0x08, 0x08, 0x3e, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3e, 0x51, 0x49, 0x45, 0x3e], // 0
    [0x00, 0x42, 0x7f, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4b, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7f, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3c, 0x4a, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1e], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3e], // @
    [0x7e, 0x11, 0x11, 0x11, 0x7e], // A
    [0x7f, 0x49, 0x49, 0x49, 0x36], // B
    [0x3e, 0x41, 0x41, 0x41, 0x22], // C
    [0x7f, 0x41, 0x41, 0x22, 0x1c], // D
    [0x7f, 0x49, 0x49, 0x49, 0x41], // E
    [0x7f, 0x09, 0x09, 0x09, 0x01], // F
    [0x3e, 0x41, 0x49, 0x49, 0x7a], // G
    [0x7f, 0x08, 0x08, 0x08, 0x7f], // H
    [0x00, 0x41, 0x7f, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3f, 0x01], // J
    [0x7f, 0x08, 0x14, 0x22, 0x41], // K
    [0x7f, 0x40, 0x40, 0x40, 0x40], // L
    [0x7f, 0x02, 0x0c, 0x02, 0x7f], // M
    [0x7f, 0x04, 0x08, 0x10, 0x7f], // N
    [0x3e, 0x41, 0x41, 0x41, 0x3e], // O
    [0x7f, 0x09, 0x09, 0x09, 0x06], // P
    [0x3e, 0x41, 0x51, 0x21, 0x5e], // Q
    [0x7f, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7f, 0x01, 0x01], // T
    [0x3f, 0x40, 0x40, 0x40, 0x3f], // U
    [0x1f, 0x20, 0x40, 0x20, 0x1f], // V
    [0x3f, 0x40, 0x38, 0x40, 0x3f], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7f, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7f, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7f, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7f], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7e, 0x09, 0x01, 0x02], // f
    [0x0c, 0x52, 0x52, 0x52, 0x3e], // g
    [0x7f, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7d, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3d, 0x00], // j
    [0x7f, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7f, 0x40, 0x00], // l
    [0x7c, 0x04, 0x18, 0x04, 0x78], // m
    [0x7c, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7c, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7c], // q
    [0x7c, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3f, 0x44, 0x40, 0x20], // t
    [0x3c, 0x40, 0x40, 0x20, 0x7c], // u
    [0x1c, 0x20, 0x40, 0x20, 0x1c], // v
    [0x3c, 0x40, 0x30, 0x40, 0x3c], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0c, 0x50, 0x50, 0x50, 0x3c], // y
    [0x44, 0x64, 0x54, 0x4c, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7f, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];

#[cfg(test)]
mod tests {
    use super::*;

    fn ink(canvas: &RgbaImage) -> usize {
        canvas.pixels().filter(|p| p[3] > 0).count()
    }

    #[test]
    fn test_builtin_draws_visible_pixels() {
        let mut canvas = RgbaImage::new(60, 20);
        LabelFont::default().draw(&mut canvas, 2, 2, Rgba([10, 10, 10, 255]), "Hi!");
        assert!(ink(&canvas) > 0);
        // nothing above the pen position
        assert!((0..canvas.width()).all(|x| canvas.get_pixel(x, 0)[3] == 0));
    }

    #[test]
    fn test_space_draws_nothing() {
        let mut canvas = RgbaImage::new(20, 20);
        LabelFont::default().draw(&mut canvas, 0, 0, Rgba([0, 0, 0, 255]), "   ");
        assert_eq!(ink(&canvas), 0);
    }

    #[test]
    fn test_ellipsis_draws_three_dots() {
        let font = LabelFont::Builtin { scale: 1 };
        let mut ellipsis = RgbaImage::new(30, 10);
        font.draw(&mut ellipsis, 0, 0, Rgba([0, 0, 0, 255]), "…");
        let mut dots = RgbaImage::new(30, 10);
        font.draw(&mut dots, 0, 0, Rgba([0, 0, 0, 255]), "...");
        assert_eq!(ellipsis, dots);
    }

    #[test]
    fn test_text_is_clipped_to_canvas() {
        let mut canvas = RgbaImage::new(8, 8);
        LabelFont::default().draw(&mut canvas, -4, 4, Rgba([0, 0, 0, 255]), "WWWW");
        assert!(ink(&canvas) > 0);
    }

    #[test]
    fn test_invalid_font_bytes_are_rejected() {
        assert!(matches!(
            LabelFont::from_bytes(vec![1, 2, 3], 20.0),
            Err(StickerError::FontLoad(_))
        ));
        assert!(matches!(
            LabelFont::from_file("/definitely/not/here.ttf", 20.0),
            Err(StickerError::FontLoad(_))
        ));
    }

    /// Columns holding at least one inked pixel, as (first, last)
    fn ink_columns(canvas: &RgbaImage) -> Option<(u32, u32)> {
        let columns: Vec<u32> = (0..canvas.width())
            .filter(|&x| (0..canvas.height()).any(|y| canvas.get_pixel(x, y)[3] > 0))
            .collect();
        Some((*columns.first()?, *columns.last()?))
    }

    #[test]
    fn test_builtin_text_width_matches_drawn_ink() {
        let font = LabelFont::Builtin { scale: 2 };
        assert_eq!(font.text_width(""), 0);
        assert_eq!(font.text_width("M"), 10);
        assert_eq!(font.text_width("MM"), 22);
        assert_eq!(font.text_width("ab…"), font.text_width("ab..."));

        // M and W fill their first and last columns
        let text = "MWMW";
        let mut canvas = RgbaImage::new(100, 20);
        font.draw(&mut canvas, 0, 0, Rgba([0, 0, 0, 255]), text);
        assert_eq!(ink_columns(&canvas), Some((0, font.text_width(text) - 1)));
    }
}
