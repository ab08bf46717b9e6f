use crate::{
    animation::sequencer::Phase,
    foundation::core::{BezPath, Point, Rect},
    render::tree::{Node, Stroke, TextAnchor, VisualTree},
    template::{
        builtin::{Palette, format_distance, theme_variables, title},
        contract::{RenderContext, Template},
        variables::{Preset, VarValue, VariableKind, VariableSpec},
    },
};

/// Minimum vertical range so flat routes still get a visible profile.
const MIN_ALTITUDE_SPAN_M: f64 = 10.0;

/// Elevation profile over distance.
pub struct ElevationTemplate {
    variables: Vec<VariableSpec>,
    presets: Vec<Preset>,
}

impl ElevationTemplate {
    pub fn new() -> Self {
        let mut variables = theme_variables();
        variables.push(VariableSpec::new(
            "show_labels",
            "Show altitude labels",
            VariableKind::Toggle,
        ));
        let presets = vec![
            Preset::new(
                "Night",
                [
                    ("theme", VarValue::text("Dark")),
                    ("accent", VarValue::text("Green")),
                    ("show_labels", VarValue::Toggle(true)),
                ],
            ),
            Preset::new(
                "Paper",
                [
                    ("theme", VarValue::text("Topo")),
                    ("accent", VarValue::text("Orange")),
                    ("show_labels", VarValue::Toggle(true)),
                ],
            ),
        ];
        Self { variables, presets }
    }
}

impl Default for ElevationTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for ElevationTemplate {
    fn name(&self) -> &str {
        "elevation"
    }

    fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    fn presets(&self) -> &[Preset] {
        &self.presets
    }

    fn render(&self, ctx: &RenderContext<'_>) -> VisualTree {
        let canvas = ctx.canvas();
        let palette = Palette::from_variables(ctx.variables);
        let unit = canvas.width.min(canvas.height);
        let margin = unit * 0.08;

        let mut tree = VisualTree::new(canvas, Some(palette.background));
        tree.push(Node::Text {
            origin: Point::new(margin, margin + unit * 0.05),
            text: title(ctx.variables, ctx.activity).to_string(),
            size: unit * 0.055,
            weight: 700,
            anchor: TextAnchor::Start,
            fill: palette.foreground,
        });

        let chart = Rect::new(
            margin,
            canvas.height * 0.35,
            canvas.width - margin,
            canvas.height - margin * 1.5,
        );
        let reveal = ctx
            .animation
            .filter(|a| a.phase != Phase::Idle)
            .map(|a| a.trail.unwrap_or(a.progress))
            .unwrap_or(1.0);

        let Some(profile) = Profile::build(ctx, chart, reveal) else {
            return tree;
        };

        tree.push(Node::Path {
            path: profile.area,
            fill: Some(palette.accent.with_alpha(80)),
            stroke: None,
        });
        tree.push(Node::Path {
            path: profile.line,
            fill: None,
            stroke: Some(Stroke {
                color: palette.accent,
                width: unit * 0.006,
            }),
        });

        let label_size = unit * 0.03;
        if ctx.variables.toggle("show_labels").unwrap_or(false) {
            tree.push(Node::Text {
                origin: Point::new(chart.x0, chart.y0 - label_size),
                text: format!("{:.0} m", profile.max_alt),
                size: label_size,
                weight: 500,
                anchor: TextAnchor::Start,
                fill: palette.muted,
            });
            tree.push(Node::Text {
                origin: Point::new(chart.x0, chart.y1 + label_size * 1.4),
                text: format!("{:.0} m", profile.min_alt),
                size: label_size,
                weight: 500,
                anchor: TextAnchor::Start,
                fill: palette.muted,
            });
        }
        tree.push(Node::Text {
            origin: Point::new(chart.x1, chart.y1 + label_size * 1.4),
            text: format_distance(profile.distance),
            size: label_size,
            weight: 500,
            anchor: TextAnchor::End,
            fill: palette.muted,
        });

        tree
    }
}

struct Profile {
    line: BezPath,
    area: BezPath,
    min_alt: f64,
    max_alt: f64,
    distance: f64,
}

impl Profile {
    /// `None` when there is nothing meaningful to plot.
    fn build(ctx: &RenderContext<'_>, chart: Rect, reveal: f64) -> Option<Self> {
        let samples = ctx.activity_data.samples();
        let (first, last) = (samples.first()?, samples.last()?);
        let distance = last.distance - first.distance;
        if samples.len() < 2 || distance <= 0.0 {
            return None;
        }
        let (min_alt, max_alt) = ctx.activity_data.altitude_range()?;
        let span = (max_alt - min_alt).max(MIN_ALTITUDE_SPAN_M);
        let base = (min_alt + max_alt) / 2.0 - span / 2.0;

        let to_point = |d: f64, alt: f64| {
            Point::new(
                chart.x0 + (d - first.distance) / distance * chart.width(),
                chart.y1 - (alt - base) / span * chart.height(),
            )
        };

        let cutoff = first.distance + distance * reveal.clamp(0.0, 1.0);
        let mut pts = vec![to_point(first.distance, first.altitude)];
        for w in samples.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            if b.distance <= cutoff {
                pts.push(to_point(b.distance, b.altitude));
                continue;
            }
            let seg = b.distance - a.distance;
            if seg > 0.0 && cutoff > a.distance {
                let t = (cutoff - a.distance) / seg;
                pts.push(to_point(cutoff, a.altitude + (b.altitude - a.altitude) * t));
            }
            break;
        }
        if pts.len() < 2 {
            return None;
        }

        let mut line = BezPath::new();
        line.move_to(pts[0]);
        for p in &pts[1..] {
            line.line_to(*p);
        }

        let mut area = line.clone();
        if let (Some(head), Some(tail)) = (pts.first(), pts.last()) {
            area.line_to(Point::new(tail.x, chart.y1));
            area.line_to(Point::new(head.x, chart.y1));
            area.close_path();
        }

        Some(Self {
            line,
            area,
            min_alt,
            max_alt,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        activity::model::fixtures::park_loop,
        animation::{camera::CameraState, sequencer::AnimationState},
        foundation::core::Size,
        layout::format::Format,
        template::variables::apply_preset,
    };

    #[test]
    fn profile_spans_the_chart_width() {
        let t = ElevationTemplate::new();
        let (activity, data) = park_loop();
        let vars = apply_preset(t.variables(), t.presets(), "Night").unwrap();
        let format = Format::landscape();
        let ctx = RenderContext {
            activity: &activity,
            activity_data: &data,
            variables: &vars,
            format: &format,
            size: Size::new(960.0, 540.0),
            animation: None,
        };
        let tree = t.render(&ctx);
        let Node::Path { path, .. } = &tree.nodes[2] else {
            panic!("expected the profile line");
        };
        let bbox = kurbo::Shape::bounding_box(path);
        let margin = 1080.0 * 0.08;
        assert!((bbox.x0 - margin).abs() < 1e-6);
        assert!((bbox.x1 - (1920.0 - margin)).abs() < 1e-6);
        assert!(tree.to_svg().contains("41 m"));
    }

    #[test]
    fn animation_clips_the_profile() {
        let t = ElevationTemplate::new();
        let (activity, data) = park_loop();
        let vars = apply_preset(t.variables(), t.presets(), "Paper").unwrap();
        let format = Format::square();
        let ctx = RenderContext {
            activity: &activity,
            activity_data: &data,
            variables: &vars,
            format: &format,
            size: Size::new(500.0, 500.0),
            animation: Some(AnimationState {
                camera: CameraState {
                    center: data.samples()[0].coord(),
                    zoom: 0.0,
                    bearing: 0.0,
                    pitch: 0.0,
                },
                progress: 0.5,
                phase: Phase::Playing,
                trail: Some(0.5),
            }),
        };
        let tree = t.render(&ctx);
        let Node::Path { path, .. } = &tree.nodes[2] else {
            panic!("expected the profile line");
        };
        let bbox = kurbo::Shape::bounding_box(path);
        let mid = 1080.0 / 2.0;
        assert!((bbox.x1 - mid).abs() < 1.0);
    }
}
