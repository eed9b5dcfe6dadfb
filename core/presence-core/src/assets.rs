//! Static render assets.
//!
//! Built once at startup and shared read-only by every render. Any failure
//! here means no card can ever be drawn, so hosts treat these errors as fatal.

use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tracing::info;

use crate::compositor::{generate_template, CARD_HEIGHT, CARD_WIDTH};
use crate::config::{AssetsConfig, RenderConfig};
use crate::error::{PresenceError, Result};

/// Fixed card colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgba<u8>,
    pub banner: Rgba<u8>,
    pub profile: Rgba<u8>,
    pub line: Rgba<u8>,
    pub text: Rgba<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgba([0x32, 0x35, 0x3B, 0xFF]),
            banner: Rgba([0x2A, 0x2D, 0x33, 0xFF]),
            profile: Rgba([0x1B, 0x1E, 0x21, 0xFF]),
            line: Rgba([0x72, 0x89, 0xD9, 0xFF]),
            text: Rgba([0xEE, 0xEE, 0xEE, 0xFF]),
        }
    }
}

/// Parsed font data plus the pixel size text is drawn at.
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    px_per_em: f32,
}

impl FontFace {
    /// Validates `data` as a TrueType/OpenType face. `size_pt` at `dpi` sets
    /// the em size in pixels.
    pub fn from_bytes(data: Vec<u8>, size_pt: f32, dpi: f32) -> Result<Self> {
        ttf_parser::Face::parse(&data, 0).map_err(|err| PresenceError::FontParse {
            details: err.to_string(),
        })?;
        if !(size_pt > 0.0 && dpi > 0.0) {
            return Err(PresenceError::FontParse {
                details: format!("invalid size {} at {} dpi", size_pt, dpi),
            });
        }

        Ok(Self {
            data: Arc::new(data),
            px_per_em: size_pt * dpi / 72.0,
        })
    }

    pub fn load(path: &Path, size_pt: f32, dpi: f32) -> Result<Self> {
        let data = fs_err::read(path).map_err(|err| PresenceError::io("Failed to read font", err))?;
        Self::from_bytes(data, size_pt, dpi)
    }

    pub fn px_per_em(&self) -> f32 {
        self.px_per_em
    }

    pub(crate) fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("bytes", &self.data.len())
            .field("px_per_em", &self.px_per_em)
            .finish()
    }
}

/// Immutable inputs shared by all renders.
#[derive(Debug, Clone)]
pub struct CardAssets {
    template: RgbaImage,
    font: Option<FontFace>,
    palette: Palette,
}

impl CardAssets {
    /// Assets with an in-memory generated template.
    pub fn generated(font: FontFace) -> Self {
        let palette = Palette::default();
        Self {
            template: generate_template(&palette),
            font: Some(font),
            palette,
        }
    }

    /// Assets around a pre-rendered template, which must be card-sized.
    pub fn from_template(template: RgbaImage, font: FontFace) -> Result<Self> {
        check_template_dimensions(&template)?;
        Ok(Self {
            template,
            font: Some(font),
            palette: Palette::default(),
        })
    }

    /// Generated template and no font. Cards carry no text layers.
    pub fn without_text() -> Self {
        let palette = Palette::default();
        Self {
            template: generate_template(&palette),
            font: None,
            palette,
        }
    }

    pub fn template(&self) -> &RgbaImage {
        &self.template
    }

    pub fn font(&self) -> Option<&FontFace> {
        self.font.as_ref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

fn check_template_dimensions(template: &RgbaImage) -> Result<()> {
    let (width, height) = template.dimensions();
    if (width, height) != (CARD_WIDTH, CARD_HEIGHT) {
        return Err(PresenceError::TemplateDimensions {
            width,
            height,
            expected_width: CARD_WIDTH,
            expected_height: CARD_HEIGHT,
        });
    }
    Ok(())
}

pub fn decode_template(bytes: &[u8]) -> Result<RgbaImage> {
    let template = image::load_from_memory(bytes)
        .map_err(|source| PresenceError::TemplateDecode { source })?
        .to_rgba8();
    check_template_dimensions(&template)?;
    Ok(template)
}

pub fn load_template(path: &Path) -> Result<RgbaImage> {
    let bytes =
        fs_err::read(path).map_err(|err| PresenceError::io("Failed to read template", err))?;
    decode_template(&bytes)
}

/// Loads the font and optional template named by configuration.
pub fn load_assets(assets: &AssetsConfig, render: &RenderConfig) -> Result<CardAssets> {
    let font = FontFace::load(&assets.font, render.font_size, render.font_dpi)?;
    let template = assets
        .template
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty());
    let loaded = match template {
        Some(path) => {
            info!(path = %path.display(), "Using template from disk");
            CardAssets::from_template(load_template(path)?, font)?
        }
        None => CardAssets::generated(font),
    };
    info!(
        font = %assets.font.display(),
        px_per_em = loaded.font().map(FontFace::px_per_em).unwrap_or_default(),
        "Card assets loaded"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn garbage_font_is_rejected() {
        let err = FontFace::from_bytes(b"definitely not a font".to_vec(), 13.0, 150.0).unwrap_err();
        assert!(matches!(err, PresenceError::FontParse { .. }));
    }

    #[test]
    fn missing_font_file_is_io_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let err = FontFace::load(&temp_dir.path().join("none.ttf"), 13.0, 150.0).unwrap_err();
        assert!(matches!(err, PresenceError::Io { .. }));
    }

    #[test]
    fn template_with_wrong_size_is_rejected() {
        let mut bytes = Vec::new();
        RgbaImage::new(10, 10)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode");
        let err = decode_template(&bytes).unwrap_err();
        assert!(matches!(
            err,
            PresenceError::TemplateDimensions {
                width: 10,
                height: 10,
                ..
            }
        ));
    }

    #[test]
    fn undecodable_template_is_rejected() {
        let err = decode_template(b"\x89PNG but not really").unwrap_err();
        assert!(matches!(err, PresenceError::TemplateDecode { .. }));
    }

    #[test]
    fn template_round_trips_through_png() {
        let generated = generate_template(&Palette::default());
        let mut bytes = Vec::new();
        generated
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode");
        assert_eq!(decode_template(&bytes).expect("decode"), generated);
    }

    #[test]
    fn without_text_has_no_font() {
        let assets = CardAssets::without_text();
        assert!(assets.font().is_none());
        assert_eq!(assets.template().dimensions(), (CARD_WIDTH, CARD_HEIGHT));
    }
}
