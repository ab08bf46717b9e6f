//! Visual tree → pixels, via the tree's SVG form.

use std::{io::Cursor, sync::Arc};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::Rgba8,
        error::{TopotrackError, TopotrackResult},
    },
    render::tree::VisualTree,
};

const MAX_DIM: u32 = 16_384;

/// Straight-alpha RGBA8 pixels, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some(Rgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }

    pub fn encode_png(&self) -> TopotrackResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| TopotrackError::export("frame buffer does not match its dimensions"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }
}

/// Rasterizes visual trees with resvg. Holds the font database, so build it once and reuse.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("faces", &self.fontdb.faces().count())
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    /// System fonts only.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Render `tree` into a `width`×`height` frame.
    ///
    /// User space is scaled uniformly and centered, the same way an SVG viewer treats the
    /// exported `viewBox`. Uncovered margins stay transparent.
    pub fn rasterize(
        &self,
        tree: &VisualTree,
        width: u32,
        height: u32,
    ) -> TopotrackResult<RgbaFrame> {
        if width == 0 || height == 0 || width > MAX_DIM || height > MAX_DIM {
            return Err(TopotrackError::export(format!(
                "raster size {width}x{height} out of range (1..={MAX_DIM})"
            )));
        }

        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let svg = tree.to_svg();
        let parsed = usvg::Tree::from_str(&svg, &opts).context("parse rendered svg")?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| TopotrackError::export("failed to allocate pixmap"))?;
        let user = parsed.size();
        let scale = (width as f32 / user.width()).min(height as f32 / user.height());
        let dx = (width as f32 - user.width() * scale) / 2.0;
        let dy = (height as f32 - user.height() * scale) / 2.0;
        let transform = resvg::tiny_skia::Transform::from_row(scale, 0.0, 0.0, scale, dx, dy);
        resvg::render(&parsed, transform, &mut pixmap.as_mut());

        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for px in pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(RgbaFrame {
            width,
            height,
            data,
        })
    }

    pub fn render_png(
        &self,
        tree: &VisualTree,
        width: u32,
        height: u32,
    ) -> TopotrackResult<Vec<u8>> {
        self.rasterize(tree, width, height)?.encode_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        foundation::core::{Rect, Size},
        render::tree::Node,
    };

    fn red_square() -> VisualTree {
        let mut tree = VisualTree::new(Size::new(10.0, 10.0), Some(Rgba8::WHITE));
        tree.push(Node::Rect {
            rect: Rect::new(0.0, 0.0, 5.0, 10.0),
            radius: 0.0,
            fill: Some(Rgba8::rgb(255, 0, 0)),
            stroke: None,
        });
        tree
    }

    #[test]
    fn rasterize_scales_user_space() {
        let r = Rasterizer::new();
        let frame = r.rasterize(&red_square(), 20, 20).unwrap();
        assert_eq!((frame.width, frame.height), (20, 20));
        assert_eq!(frame.data.len(), 20 * 20 * 4);
        assert_eq!(frame.pixel(2, 10), Some(Rgba8::rgb(255, 0, 0)));
        assert_eq!(frame.pixel(17, 10), Some(Rgba8::WHITE));
        assert_eq!(frame.pixel(20, 0), None);
    }

    #[test]
    fn png_round_trips_through_image() {
        let r = Rasterizer::new();
        let png = r.render_png(&red_square(), 8, 8).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn wider_target_letterboxes_instead_of_stretching() {
        let frame = Rasterizer::new().rasterize(&red_square(), 40, 20).unwrap();
        // 2x scale, content spans x in 10..30.
        assert_eq!(frame.pixel(5, 10), Some(Rgba8::BLACK.with_alpha(0)));
        assert_eq!(frame.pixel(12, 10), Some(Rgba8::rgb(255, 0, 0)));
        assert_eq!(frame.pixel(27, 10), Some(Rgba8::WHITE));
        assert_eq!(frame.pixel(35, 10), Some(Rgba8::BLACK.with_alpha(0)));
    }

    #[test]
    fn zero_size_is_an_export_error() {
        let err = Rasterizer::new().rasterize(&red_square(), 0, 4).unwrap_err();
        assert!(matches!(err, TopotrackError::Export(_)));
    }
}
