use image::{Rgba, RgbaImage};

/// One entry of a compositing stack
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub image: &'a RgbaImage,
    /// Top-left placement on the canvas, `(0, 0)` when absent
    pub offset: Option<(i64, i64)>,
}

impl<'a> Layer<'a> {
    pub fn new(image: &'a RgbaImage) -> Self {
        Self { image, offset: None }
    }

    pub fn at(image: &'a RgbaImage, x: i64, y: i64) -> Self {
        Self {
            image,
            offset: Some((x, y)),
        }
    }
}

/// Straight-alpha "over": `src` painted on top of `dst`.
///
/// Equivalent to `src * src_a + dst * (1 - src_a)` on premultiplied values,
/// with alpha accumulated as `src_a + dst_a * (1 - src_a)`.
pub fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == u8::MAX || dst[3] == 0 {
        return src;
    }

    let sa = f32::from(sa) / 255.0;
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (f32::from(src[i]) * sa + f32::from(dst[i]) * da * (1.0 - sa)) / out_a;
        out[i] = to_u8(c);
    }
    out[3] = to_u8(out_a * 255.0);
    Rgba(out)
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Composite `layers` back-to-front onto a transparent `width x height` canvas
pub fn composite(width: u32, height: u32, layers: &[Layer<'_>]) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    for layer in layers {
        blend_layer(&mut canvas, layer);
    }
    canvas
}

/// Composite `layers` back-to-front onto a copy of `base`
pub fn composite_onto(base: &RgbaImage, layers: &[Layer<'_>]) -> RgbaImage {
    let mut canvas = base.clone();
    for layer in layers {
        blend_layer(&mut canvas, layer);
    }
    canvas
}

fn blend_layer(canvas: &mut RgbaImage, layer: &Layer<'_>) {
    let (ox, oy) = layer.offset.unwrap_or((0, 0));
    let (cw, ch) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let (lw, lh) = (i64::from(layer.image.width()), i64::from(layer.image.height()));

    // Visible part of the layer in layer coordinates
    let x0 = (-ox).max(0);
    let y0 = (-oy).max(0);
    let x1 = (cw - ox).min(lw);
    let y1 = (ch - oy).min(lh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for ly in y0..y1 {
        for lx in x0..x1 {
            let src = *layer.image.get_pixel(lx as u32, ly as u32);
            if src[3] == 0 {
                continue;
            }
            let (cx, cy) = ((lx + ox) as u32, (ly + oy) as u32);
            let dst = canvas.get_pixel_mut(cx, cy);
            *dst = over(*dst, src);
        }
    }
}
