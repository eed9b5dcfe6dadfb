//! Fixed-layout presence card rendering.
//!
//! # Layout (600x140)
//!
//! ```text
//! ┌──────────┬───────────────────────────────────────────┐
//! │  avatar  │ banner        username @ (160, 26)        │ y = 35
//! │  (6,6)   ├───────────────────────────────────────────┤
//! │     ●    │ background    app text @ (160, 70)        │
//! │  status  │                                           │
//! ├──────────┴───────────────────────────────────────────┤ y = 137.9
//! └──────────────────────── separator line ──────────────┘
//! ```
//!
//! The rectangle fills form the template, generated once and reused. Each
//! render copies it and draws, in order: username, app text, avatar, status
//! dot. The dot goes last so it always sits on top of the avatar disc.

use std::io::{Cursor, Write};
use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{Pixel, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::assets::{CardAssets, Palette};
use crate::avatar::{load_avatar, AvatarFetcher};
use crate::error::{PresenceError, Result};
use crate::mask::{CircleMask, OpacityField, OPAQUE};
use crate::status::StatusKind;
use crate::text::draw_text;
use crate::types::PresenceSnapshot;

pub const CARD_WIDTH: u32 = 600;
pub const CARD_HEIGHT: u32 = 140;

pub const USERNAME_ANCHOR: (f32, f32) = (160.0, 26.0);
pub const APP_ANCHOR: (f32, f32) = (160.0, 70.0);

pub const STATUS_ORIGIN: (i32, i32) = (96, 96);
pub const STATUS_RADIUS: i32 = 12;
/// Canvas pixel at the middle of the status dot.
pub const STATUS_CENTER: (u32, u32) = (108, 108);

pub const AVATAR_ORIGIN: (i32, i32) = (6, 6);

const BANNER_FRACTION: f64 = 0.25;
const LINE_FRACTION: f64 = 0.985;

/// Draws the static card background: body, banner, profile square, separator.
pub fn generate_template(palette: &Palette) -> RgbaImage {
    let mut template = RgbaImage::new(CARD_WIDTH, CARD_HEIGHT);
    let width = f64::from(CARD_WIDTH);
    let height = f64::from(CARD_HEIGHT);

    fill_rect(
        &mut template,
        height,
        BANNER_FRACTION * height,
        width,
        LINE_FRACTION * height,
        palette.background,
    );
    fill_rect(
        &mut template,
        height,
        0.0,
        width,
        BANNER_FRACTION * height,
        palette.banner,
    );
    fill_rect(&mut template, 0.0, 0.0, height, height, palette.profile);
    fill_rect(
        &mut template,
        0.0,
        LINE_FRACTION * height,
        width,
        height,
        palette.line,
    );

    template
}

/// Overwrites every pixel visited by stepping one unit from `(x0, y0)` up to
/// and including `(x1, y1)`. Coordinates truncate; off-canvas pixels are
/// skipped.
fn fill_rect(canvas: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let mut x = x0;
    while x <= x1 {
        let mut y = y0;
        while y <= y1 {
            let (px, py) = (x as i64, y as i64);
            if px >= 0 && py >= 0 && (px as u64) < u64::from(width) && (py as u64) < u64::from(height)
            {
                canvas.put_pixel(px as u32, py as u32, color);
            }
            y += 1.0;
        }
        x += 1.0;
    }
}

/// Blends `source` over the `size` rectangle at `origin`, keeping only the
/// pixels the mask marks opaque. Source and mask are addressed in rectangle
/// coordinates.
fn draw_masked<F>(
    canvas: &mut RgbaImage,
    origin: (i32, i32),
    size: (u32, u32),
    mask: &dyn OpacityField,
    source: F,
) where
    F: Fn(u32, u32) -> Rgba<u8>,
{
    let (canvas_width, canvas_height) = canvas.dimensions();
    for my in 0..size.1 {
        for mx in 0..size.0 {
            let dx = i64::from(origin.0) + i64::from(mx);
            let dy = i64::from(origin.1) + i64::from(my);
            if dx < 0 || dy < 0 || dx >= i64::from(canvas_width) || dy >= i64::from(canvas_height)
            {
                continue;
            }

            let coverage = mask.opacity_at(mx as i32, my as i32);
            if coverage == 0 {
                continue;
            }

            let mut pixel = source(mx, my);
            if coverage != OPAQUE {
                pixel[3] = ((u16::from(pixel[3]) * u16::from(coverage)) / 255) as u8;
            }
            // Opaque "over" is a plain copy; skip the float path so colors
            // land exactly.
            if pixel[3] == OPAQUE {
                canvas.put_pixel(dx as u32, dy as u32, pixel);
            } else {
                canvas.get_pixel_mut(dx as u32, dy as u32).blend(&pixel);
            }
        }
    }
}

fn draw_status(canvas: &mut RgbaImage, status: StatusKind) {
    let diameter = (STATUS_RADIUS * 2) as u32;
    let mask = CircleMask::new((STATUS_RADIUS, STATUS_RADIUS), STATUS_RADIUS);
    let color = status.color();
    draw_masked(canvas, STATUS_ORIGIN, (diameter, diameter), &mask, |_, _| {
        color
    });
}

fn draw_avatar(canvas: &mut RgbaImage, avatar: &RgbaImage) {
    let (width, height) = avatar.dimensions();
    let mask = CircleMask::inscribed(width, height);
    draw_masked(canvas, AVATAR_ORIGIN, (width, height), &mask, |x, y| {
        *avatar.get_pixel(x, y)
    });
}

/// A rendered card, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    image: RgbaImage,
}

impl Card {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Pixel at `(x, y)`, or `None` outside the card.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Writes the card as PNG.
    pub fn encode_png<W: Write>(&self, writer: W) -> Result<()> {
        self.image
            .write_with_encoder(PngEncoder::new(writer))
            .map_err(|source| PresenceError::Encode { source })
    }

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.encode_png(&mut bytes)?;
        Ok(bytes.into_inner())
    }
}

impl From<RgbaImage> for Card {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// Renders snapshots against shared assets.
#[derive(Clone)]
pub struct Compositor {
    assets: Arc<CardAssets>,
    avatars: Arc<dyn AvatarFetcher>,
}

impl Compositor {
    pub fn new(assets: Arc<CardAssets>, avatars: Arc<dyn AvatarFetcher>) -> Self {
        Self { assets, avatars }
    }

    pub fn assets(&self) -> &CardAssets {
        &self.assets
    }

    /// Renders one card. Avatar failures are logged and leave the avatar
    /// layer out; nothing else can fail.
    pub fn render(&self, snapshot: &PresenceSnapshot) -> Card {
        let mut canvas = self.assets.template().clone();
        let text_color = self.assets.palette().text;

        if let Some(font) = self.assets.font() {
            draw_text(
                &mut canvas,
                font,
                &snapshot.username,
                USERNAME_ANCHOR,
                text_color,
            );
            draw_text(&mut canvas, font, &snapshot.app, APP_ANCHOR, text_color);
        }

        if snapshot.avatar.is_empty() {
            debug!(username = %snapshot.username, "No avatar reference; skipping avatar layer");
        } else {
            match load_avatar(self.avatars.as_ref(), &snapshot.avatar) {
                Ok(avatar) => draw_avatar(&mut canvas, &avatar),
                Err(err) => {
                    warn!(
                        username = %snapshot.username,
                        error = %err,
                        "Avatar unavailable; rendering without it"
                    );
                }
            }
        }

        draw_status(&mut canvas, snapshot.status);

        Card { image: canvas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::NoAvatarFetcher;

    fn palette() -> Palette {
        Palette::default()
    }

    #[test]
    fn template_regions_match_layout() {
        let p = palette();
        let template = generate_template(&p);

        assert_eq!(template.get_pixel(300, 10), &p.banner);
        assert_eq!(template.get_pixel(300, 35), &p.banner);
        assert_eq!(template.get_pixel(300, 36), &p.background);
        assert_eq!(template.get_pixel(300, 136), &p.background);
        assert_eq!(template.get_pixel(300, 137), &p.line);
        assert_eq!(template.get_pixel(599, 139), &p.line);
        assert_eq!(template.get_pixel(0, 0), &p.profile);
        assert_eq!(template.get_pixel(140, 80), &p.profile);
        assert_eq!(template.get_pixel(141, 80), &p.background);
        assert_eq!(template.get_pixel(70, 139), &p.line);
    }

    #[test]
    fn template_has_no_uncovered_pixels() {
        let template = generate_template(&palette());
        assert!(template.pixels().all(|pixel| pixel[3] == 0xFF));
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut canvas = RgbaImage::new(4, 4);
        fill_rect(&mut canvas, -2.0, -2.0, 10.0, 1.0, Rgba([1, 1, 1, 255]));
        assert_eq!(canvas.get_pixel(3, 1), &Rgba([1, 1, 1, 255]));
        assert_eq!(canvas.get_pixel(0, 2), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn status_dot_is_a_hard_disc() {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, Rgba([0, 0, 0, 255]));
        draw_status(&mut canvas, StatusKind::Online);

        let online = StatusKind::Online.color();
        assert_eq!(canvas.get_pixel(108, 108), &online);
        assert_eq!(canvas.get_pixel(97, 108), &online);
        // (96,108) is exactly on the boundary.
        assert_eq!(canvas.get_pixel(96, 108), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(96, 96), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(119, 108), &online);
    }

    #[test]
    fn avatar_is_clipped_to_inscribed_disc() {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, Rgba([0, 0, 0, 255]));
        let avatar = RgbaImage::from_pixel(128, 128, Rgba([200, 10, 10, 255]));
        draw_avatar(&mut canvas, &avatar);

        assert_eq!(canvas.get_pixel(70, 70), &Rgba([200, 10, 10, 255]));
        assert_eq!(canvas.get_pixel(6, 6), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(133, 133), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(7, 70), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn translucent_avatar_pixels_blend_over() {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, Rgba([0, 0, 0, 255]));
        let avatar = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 0]));
        draw_avatar(&mut canvas, &avatar);
        assert_eq!(canvas.get_pixel(14, 14), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn oversized_avatar_is_clipped_to_canvas() {
        let mut canvas = RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, Rgba([0, 0, 0, 255]));
        let avatar = RgbaImage::from_pixel(400, 400, Rgba([9, 9, 9, 255]));
        draw_avatar(&mut canvas, &avatar);
        assert_eq!(canvas.get_pixel(206, 139), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn render_without_avatar_keeps_template_in_profile_square() {
        let assets = Arc::new(CardAssets::without_text());
        let compositor = Compositor::new(Arc::clone(&assets), Arc::new(NoAvatarFetcher));
        let card = compositor.render(&PresenceSnapshot {
            app: String::new(),
            username: "Ari#0001".to_string(),
            avatar: "https://cdn.invalid/avatars/1/abc.png".to_string(),
            status: StatusKind::DoNotDisturb,
        });

        assert_eq!(card.pixel(70, 70), Some(assets.palette().profile));
        assert_eq!(
            card.pixel(STATUS_CENTER.0, STATUS_CENTER.1),
            Some(StatusKind::DoNotDisturb.color())
        );
        assert_eq!(card.pixel(CARD_WIDTH, 0), None);
        assert_eq!(card.pixel(0, CARD_HEIGHT), None);
    }

    #[test]
    fn encode_png_produces_png_signature() {
        let compositor = Compositor::new(
            Arc::new(CardAssets::without_text()),
            Arc::new(NoAvatarFetcher),
        );
        let bytes = compositor
            .render(&PresenceSnapshot::default())
            .to_png_bytes()
            .expect("encode");
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
