//! Single-line text rasterization.
//!
//! Glyph outlines come from the font via `ttf-parser`, are laid out along the
//! baseline by horizontal advance, filled as one anti-aliased path with
//! `tiny-skia`, and blended over the canvas.

use image::{Pixel, Rgba, RgbaImage};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::assets::FontFace;

/// Writes scaled glyph outlines into a path, flipping font Y-up to image Y-down.
struct GlyphPathSink<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    origin_x: f32,
    baseline_y: f32,
}

impl GlyphPathSink<'_> {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.origin_x + x * self.scale,
            self.baseline_y - y * self.scale,
        )
    }
}

impl OutlineBuilder for GlyphPathSink<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn glyph_for(face: &Face<'_>, c: char) -> GlyphId {
    face.glyph_index(c).unwrap_or(GlyphId(0))
}

fn scale_for(face: &Face<'_>, font: &FontFace) -> f32 {
    font.px_per_em() / f32::from(face.units_per_em().max(1))
}

/// Draws `text` with its baseline origin at `anchor`. Glyphs falling outside
/// the canvas are clipped. Returns the advance in pixels.
pub fn draw_text(
    canvas: &mut RgbaImage,
    font: &FontFace,
    text: &str,
    anchor: (f32, f32),
    color: Rgba<u8>,
) -> f32 {
    let Some(face) = font.face() else {
        return 0.0;
    };
    let scale = scale_for(&face, font);

    let mut builder = PathBuilder::new();
    let mut pen_x = anchor.0;
    for c in text.chars() {
        let glyph = glyph_for(&face, c);
        let mut sink = GlyphPathSink {
            builder: &mut builder,
            scale,
            origin_x: pen_x,
            baseline_y: anchor.1,
        };
        face.outline_glyph(glyph, &mut sink);
        pen_x += f32::from(face.glyph_hor_advance(glyph).unwrap_or(0)) * scale;
    }
    let advance = pen_x - anchor.0;

    // Whitespace-only or empty text produces no path.
    let Some(path) = builder.finish() else {
        return advance;
    };
    let (width, height) = canvas.dimensions();
    let Some(mut layer) = Pixmap::new(width, height) else {
        return advance;
    };

    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    layer.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

    blend_layer(canvas, &layer);
    advance
}

fn blend_layer(canvas: &mut RgbaImage, layer: &Pixmap) {
    let width = layer.width() as usize;
    for (index, pixel) in layer.pixels().iter().enumerate() {
        if pixel.alpha() == 0 {
            continue;
        }
        let color = pixel.demultiply();
        let x = (index % width) as u32;
        let y = (index / width) as u32;
        let source = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        if source[3] == u8::MAX {
            canvas.put_pixel(x, y, source);
        } else {
            canvas.get_pixel_mut(x, y).blend(&source);
        }
    }
}
