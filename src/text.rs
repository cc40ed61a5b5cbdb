//! Text rasterization onto RGBA images.
//!
//! Without a configured font file labels use the built-in 8x8 bitmap face,
//! scaled by whole pixels. A TrueType file gives anti-aliased glyphs.

use std::fs;
use std::path::Path;

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Pixel, Rgba, RgbaImage};

use crate::error::{ChoroplethError, Result};
use crate::types::{HAlign, VAlign};

const BITMAP_CELL: f32 = 8.0;

/// Pixel-space box covered by a drawn string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextBox {
    pub fn intersects(&self, other: &TextBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

pub enum FontFace {
    Bitmap,
    TrueType(Box<fontdue::Font>),
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontFace::Bitmap => write!(f, "FontFace::Bitmap"),
            FontFace::TrueType(_) => write!(f, "FontFace::TrueType"),
        }
    }
}

impl FontFace {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| ChoroplethError::Font {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
            |e| ChoroplethError::Font {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        )?;
        Ok(FontFace::TrueType(Box::new(font)))
    }

    /// Load `path` if given, otherwise the built-in face.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(FontFace::Bitmap),
        }
    }

    /// Width and height of `text` at `px` pixels.
    pub fn measure(&self, text: &str, px: f32) -> (f32, f32) {
        match self {
            FontFace::Bitmap => {
                let cell = bitmap_scale(px) as f32 * BITMAP_CELL;
                (text.chars().count() as f32 * cell, cell)
            }
            FontFace::TrueType(font) => {
                let width = text.chars().map(|c| font.metrics(c, px).advance_width).sum();
                let height = font
                    .horizontal_line_metrics(px)
                    .map(|m| m.ascent - m.descent)
                    .unwrap_or(px);
                (width, height)
            }
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn draw(&self, img: &mut RgbaImage, text: &str, x: f32, y: f32, px: f32, color: Rgba<u8>) {
        match self {
            FontFace::Bitmap => draw_bitmap(img, text, x, y, bitmap_scale(px), color),
            FontFace::TrueType(font) => draw_truetype(img, font, text, x, y, px, color),
        }
    }

    /// Draw `text` aligned around `anchor` and return the covered box.
    pub fn draw_aligned(
        &self,
        img: &mut RgbaImage,
        text: &str,
        anchor: (f32, f32),
        px: f32,
        color: Rgba<u8>,
        h_align: HAlign,
        v_align: VAlign,
    ) -> TextBox {
        let bbox = self.layout(text, anchor, px, h_align, v_align);
        self.draw(img, text, bbox.x, bbox.y, px, color);
        bbox
    }

    /// The box `draw_aligned` would cover, without drawing.
    pub fn layout(
        &self,
        text: &str,
        anchor: (f32, f32),
        px: f32,
        h_align: HAlign,
        v_align: VAlign,
    ) -> TextBox {
        let (width, height) = self.measure(text, px);
        let x = match h_align {
            HAlign::Left => anchor.0,
            HAlign::Center => anchor.0 - width / 2.0,
            HAlign::Right => anchor.0 - width,
        };
        let y = match v_align {
            VAlign::Top => anchor.1,
            VAlign::Center => anchor.1 - height / 2.0,
            VAlign::Bottom => anchor.1 - height,
        };
        TextBox {
            x,
            y,
            width,
            height,
        }
    }
}

fn bitmap_scale(px: f32) -> u32 {
    ((px / BITMAP_CELL).round() as u32).max(1)
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn blend(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: u8) {
    if x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let mut src = color;
    src[3] = ((u32::from(color[3]) * u32::from(coverage)) / 255) as u8;
    img.get_pixel_mut(x as u32, y as u32).blend(&src);
}

fn draw_bitmap(img: &mut RgbaImage, text: &str, x: f32, y: f32, scale: u32, color: Rgba<u8>) {
    let origin_x = x.round() as i64;
    let origin_y = y.round() as i64;
    let cell = i64::from(scale) * 8;
    let scale = i64::from(scale);

    for (i, c) in text.chars().enumerate() {
        let left = origin_x + i as i64 * cell;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend(
                            img,
                            left + col * scale + dx,
                            origin_y + row as i64 * scale + dy,
                            color,
                            255,
                        );
                    }
                }
            }
        }
    }
}

fn draw_truetype(
    img: &mut RgbaImage,
    font: &fontdue::Font,
    text: &str,
    x: f32,
    y: f32,
    px: f32,
    color: Rgba<u8>,
) {
    let ascent = font
        .horizontal_line_metrics(px)
        .map(|m| m.ascent)
        .unwrap_or(px);
    let baseline = y + ascent;
    let mut pen = x;

    for c in text.chars() {
        let (metrics, coverage) = font.rasterize(c, px);
        let left = (pen + metrics.xmin as f32).round() as i64;
        let top = (baseline - (metrics.height as i32 + metrics.ymin) as f32).round() as i64;

        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let alpha = coverage[row * metrics.width + col];
                if alpha > 0 {
                    blend(img, left + col as i64, top + row as i64, color, alpha);
                }
            }
        }
        pen += metrics.advance_width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_pixels(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p[0] < 128).count()
    }

    #[test]
    fn test_bitmap_measure_scales_with_size() {
        let face = FontFace::Bitmap;
        assert_eq!(face.measure("Bayern", 8.0), (48.0, 8.0));
        assert_eq!(face.measure("Bayern", 16.0), (96.0, 16.0));
        assert_eq!(face.measure("ab", 2.0), (16.0, 8.0));
    }

    #[test]
    fn test_draw_centered_marks_pixels_around_anchor() {
        let mut img = RgbaImage::from_pixel(100, 40, Rgba([255, 255, 255, 255]));
        let face = FontFace::Bitmap;
        let bbox = face.draw_aligned(
            &mut img,
            "HE",
            (50.0, 20.0),
            16.0,
            Rgba([0, 0, 0, 255]),
            HAlign::Center,
            VAlign::Center,
        );

        assert_eq!(bbox, TextBox { x: 34.0, y: 12.0, width: 32.0, height: 16.0 });
        assert!(dark_pixels(&img) > 0);
        for (x, y, p) in img.enumerate_pixels() {
            if p[0] < 128 {
                assert!((34..66).contains(&x) && (12..28).contains(&y));
            }
        }
    }

    #[test]
    fn test_non_ascii_glyphs_render() {
        let mut img = RgbaImage::from_pixel(40, 10, Rgba([255, 255, 255, 255]));
        FontFace::Bitmap.draw(&mut img, "ü", 0.0, 0.0, 8.0, Rgba([0, 0, 0, 255]));
        assert!(dark_pixels(&img) > 0);
    }

    #[test]
    fn test_alignment_offsets() {
        let face = FontFace::Bitmap;
        let left = face.layout("abc", (10.0, 10.0), 8.0, HAlign::Left, VAlign::Top);
        let right = face.layout("abc", (10.0, 10.0), 8.0, HAlign::Right, VAlign::Bottom);
        assert_eq!((left.x, left.y), (10.0, 10.0));
        assert_eq!((right.x, right.y), (-14.0, 2.0));
    }

    #[test]
    fn test_box_intersection() {
        let a = TextBox { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = TextBox { x: 9.0, y: 9.0, width: 5.0, height: 5.0 };
        let c = TextBox { x: 10.0, y: 0.0, width: 5.0, height: 5.0 };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_missing_font_file() {
        let err = FontFace::from_file(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, ChoroplethError::Font { .. }));
    }
}
