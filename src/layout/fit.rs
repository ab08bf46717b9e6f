use crate::{
    foundation::core::{Rect, Size},
    layout::format::Format,
};

/// Raster exports render at this multiple of the format's nominal size.
pub const EXPORT_SUPERSAMPLE: u32 = 2;

/// Largest rectangle with `format`'s aspect ratio that fits in `container`, centered.
///
/// Works in CSS-like logical pixels; device pixel ratio plays no part.
pub fn letterbox(format: &Format, container: Size) -> Rect {
    if !(container.width > 0.0 && container.height > 0.0) {
        return Rect::ZERO;
    }

    let aspect = format.aspect_ratio();
    let (w, h) = if container.width / container.height > aspect {
        (container.height * aspect, container.height)
    } else {
        (container.width, container.width / aspect)
    };

    let x0 = (container.width - w) / 2.0;
    let y0 = (container.height - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Pixel size of the raster canvas used for PNG export.
pub fn export_canvas(format: &Format) -> (u32, u32) {
    (
        format.width.saturating_mul(EXPORT_SUPERSAMPLE),
        format.height.saturating_mul(EXPORT_SUPERSAMPLE),
    )
}

/// Tracks the preview frame for the current format and container size.
#[derive(Clone, Debug)]
pub struct LayoutEngine {
    format: Format,
    container: Size,
    frame: Rect,
}

impl LayoutEngine {
    pub fn new(format: Format, container: Size) -> Self {
        let frame = letterbox(&format, container);
        Self {
            format,
            container,
            frame,
        }
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Current letterboxed preview rectangle, in container coordinates.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Returns `true` when the frame changed.
    pub fn resize(&mut self, container: Size) -> bool {
        if container == self.container {
            return false;
        }
        self.container = container;
        self.recompute()
    }

    /// Returns `true` when the frame changed.
    pub fn set_format(&mut self, format: Format) -> bool {
        if format == self.format {
            return false;
        }
        self.format = format;
        self.recompute()
    }

    fn recompute(&mut self) -> bool {
        let next = letterbox(&self.format, self.container);
        let changed = next != self.frame;
        self.frame = next;
        tracing::debug!(
            format = %self.format.name,
            width = next.width(),
            height = next.height(),
            "layout recomputed"
        );
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_in_landscape_is_pillarboxed() {
        let r = letterbox(&Format::square(), Size::new(1600.0, 900.0));
        assert_eq!(r, Rect::new(350.0, 0.0, 1250.0, 900.0));
    }

    #[test]
    fn landscape_in_portrait_is_letterboxed() {
        let r = letterbox(&Format::landscape(), Size::new(400.0, 800.0));
        assert_eq!(r.width(), 400.0);
        assert_eq!(r.height(), 225.0);
        assert_eq!(r.y0, (800.0 - 225.0) / 2.0);
    }

    #[test]
    fn empty_container_yields_empty_frame() {
        assert_eq!(letterbox(&Format::square(), Size::new(0.0, 100.0)), Rect::ZERO);
    }

    #[test]
    fn export_canvas_is_supersampled_nominal_size() {
        assert_eq!(export_canvas(&Format::portrait()), (2160, 3840));
    }

    #[test]
    fn engine_recomputes_on_resize_and_format_change() {
        let mut engine = LayoutEngine::new(Format::square(), Size::new(100.0, 50.0));
        assert_eq!(engine.frame().size(), Size::new(50.0, 50.0));

        assert!(!engine.resize(Size::new(100.0, 50.0)));
        assert!(engine.resize(Size::new(100.0, 200.0)));
        assert_eq!(engine.frame().size(), Size::new(100.0, 100.0));

        assert!(engine.set_format(Format::portrait()));
        let f = engine.frame();
        assert!((f.width() / f.height() - 1080.0 / 1920.0).abs() < 1e-9);
    }
}
