//! Retained visual tree and its SVG serialization.
//!
//! Templates build a [`VisualTree`] in the nominal pixel space of the selected format. The same
//! tree feeds the on-screen preview, SVG export and rasterization.

use std::fmt::Write as _;

use crate::foundation::core::{Affine, BezPath, Point, Rect, Rgba8, Size};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Rgba8,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Group {
        transform: Affine,
        opacity: f64,
        children: Vec<Node>,
    },
    Rect {
        rect: Rect,
        radius: f64,
        fill: Option<Rgba8>,
        stroke: Option<Stroke>,
    },
    Path {
        path: BezPath,
        fill: Option<Rgba8>,
        stroke: Option<Stroke>,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Rgba8>,
        stroke: Option<Stroke>,
    },
    Text {
        origin: Point,
        text: String,
        size: f64,
        weight: u16,
        anchor: TextAnchor,
        fill: Rgba8,
    },
}

impl Node {
    pub fn group(children: Vec<Node>) -> Self {
        Self::Group {
            transform: Affine::IDENTITY,
            opacity: 1.0,
            children,
        }
    }

    pub fn transformed(transform: Affine, children: Vec<Node>) -> Self {
        Self::Group {
            transform,
            opacity: 1.0,
            children,
        }
    }

    pub fn text(origin: Point, text: impl Into<String>, size: f64, fill: Rgba8) -> Self {
        Self::Text {
            origin,
            text: text.into(),
            size,
            weight: 400,
            anchor: TextAnchor::Start,
            fill,
        }
    }
}

/// What a tree represents.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeKind {
    Content,
    Loading,
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisualTree {
    pub size: Size,
    pub background: Option<Rgba8>,
    pub kind: TreeKind,
    pub nodes: Vec<Node>,
}

const PLACEHOLDER_BG: Rgba8 = Rgba8::rgb(0x1c, 0x1f, 0x26);
const PLACEHOLDER_FG: Rgba8 = Rgba8::rgb(0x9a, 0xa3, 0xb5);

impl VisualTree {
    pub fn new(size: Size, background: Option<Rgba8>) -> Self {
        Self {
            size,
            background,
            kind: TreeKind::Content,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn loading(size: Size) -> Self {
        Self::placeholder(size, TreeKind::Loading, "Loading activity…")
    }

    pub fn error(size: Size, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut tree = Self::placeholder(
            size,
            TreeKind::Error(message.clone()),
            "Could not load activity",
        );
        tree.push(Node::Text {
            origin: Point::new(size.width / 2.0, size.height / 2.0 + 48.0),
            text: message,
            size: 22.0,
            weight: 400,
            anchor: TextAnchor::Middle,
            fill: PLACEHOLDER_FG.with_alpha(180),
        });
        tree
    }

    fn placeholder(size: Size, kind: TreeKind, label: &str) -> Self {
        let mut tree = Self {
            size,
            background: Some(PLACEHOLDER_BG),
            kind,
            nodes: Vec::new(),
        };
        tree.push(Node::Text {
            origin: Point::new(size.width / 2.0, size.height / 2.0),
            text: label.to_string(),
            size: 36.0,
            weight: 600,
            anchor: TextAnchor::Middle,
            fill: PLACEHOLDER_FG,
        });
        tree
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind != TreeKind::Content
    }

    /// Standalone SVG document whose user space matches `self.size`.
    pub fn to_svg(&self) -> String {
        self.to_svg_sized(self.size)
    }

    /// Like [`to_svg`](Self::to_svg) but with the document's outer size set to `size`; the
    /// viewBox still covers `self.size`, so the content scales.
    pub fn to_svg_sized(&self, size: Size) -> String {
        let (w, h) = (self.size.width, self.size.height);
        let mut out = String::with_capacity(4096);
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            num(size.width),
            num(size.height),
            num(w),
            num(h)
        );
        if let Some(bg) = self.background {
            let _ = write!(
                out,
                r#"<rect x="0" y="0" width="{}" height="{}"{}/>"#,
                num(w),
                num(h),
                paint_attrs(Some(bg), None)
            );
        }
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out.push_str("</svg>");
        out
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Group {
            transform,
            opacity,
            children,
        } => {
            out.push_str("<g");
            if *transform != Affine::IDENTITY {
                let c = transform.as_coeffs();
                let _ = write!(
                    out,
                    r#" transform="matrix({} {} {} {} {} {})""#,
                    num(c[0]),
                    num(c[1]),
                    num(c[2]),
                    num(c[3]),
                    num(c[4]),
                    num(c[5])
                );
            }
            if *opacity < 1.0 {
                let _ = write!(out, r#" opacity="{}""#, num(opacity.max(0.0)));
            }
            out.push('>');
            for child in children {
                write_node(out, child);
            }
            out.push_str("</g>");
        }
        Node::Rect {
            rect,
            radius,
            fill,
            stroke,
        } => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}""#,
                num(rect.x0),
                num(rect.y0),
                num(rect.width()),
                num(rect.height())
            );
            if *radius > 0.0 {
                let _ = write!(out, r#" rx="{}""#, num(*radius));
            }
            let _ = write!(out, "{}/>", paint_attrs(*fill, *stroke));
        }
        Node::Path { path, fill, stroke } => {
            let _ = write!(
                out,
                r#"<path d="{}"{} stroke-linecap="round" stroke-linejoin="round"/>"#,
                path.to_svg(),
                paint_attrs(*fill, *stroke)
            );
        }
        Node::Circle {
            center,
            radius,
            fill,
            stroke,
        } => {
            let _ = write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}"{}/>"#,
                num(center.x),
                num(center.y),
                num(*radius),
                paint_attrs(*fill, *stroke)
            );
        }
        Node::Text {
            origin,
            text,
            size,
            weight,
            anchor,
            fill,
        } => {
            let anchor = match anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{}" font-weight="{}" text-anchor="{}"{}>{}</text>"#,
                num(origin.x),
                num(origin.y),
                num(*size),
                weight,
                anchor,
                paint_attrs(Some(*fill), None),
                escape_xml(text)
            );
        }
    }
}

fn paint_attrs(fill: Option<Rgba8>, stroke: Option<Stroke>) -> String {
    let mut s = String::new();
    match fill {
        Some(c) => {
            let _ = write!(s, r#" fill="{}""#, c.to_hex());
            if c.a < 255 {
                let _ = write!(s, r#" fill-opacity="{}""#, num(c.opacity()));
            }
        }
        None => s.push_str(r#" fill="none""#),
    }
    if let Some(st) = stroke {
        let _ = write!(
            s,
            r#" stroke="{}" stroke-width="{}""#,
            st.color.to_hex(),
            num(st.width)
        );
        if st.color.a < 255 {
            let _ = write!(s, r#" stroke-opacity="{}""#, num(st.color.opacity()));
        }
    }
    s
}

/// Compact decimal formatting; keeps documents small and diff-stable.
fn num(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let r = (v * 1000.0).round() / 1000.0;
    if r == 0.0 {
        return "0".to_string();
    }
    let s = format!("{r:.3}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
