use geo_types::{Coord, LineString};

use crate::{
    animation::sequencer::{AnimationSequencer, Phase, RoutePath},
    foundation::{
        core::{Affine, Point, Rgba8, Size},
        error::TopotrackResult,
    },
    geo::projection::Projection,
    render::tree::{Node, Stroke, TextAnchor, VisualTree},
    template::{
        builtin::{Palette, format_distance, format_duration, theme_variables, title},
        contract::{RenderContext, Template},
        variables::{Preset, VarValue, VariableKind, VariableSpec},
    },
};

const DEFAULT_LINE_WIDTH: f64 = 8.0;
const START_GREEN: Rgba8 = Rgba8::rgb(0x1f, 0xa4, 0x63);
const FINISH_RED: Rgba8 = Rgba8::rgb(0xe0, 0x3e, 0x3e);

/// The recorded route drawn over a plain background, with title and stats.
///
/// While an animation is playing the map layer follows the camera and the route is revealed
/// progressively.
pub struct RouteTemplate {
    variables: Vec<VariableSpec>,
    presets: Vec<Preset>,
}

impl RouteTemplate {
    pub fn new() -> Self {
        let mut variables = theme_variables();
        variables.push(VariableSpec::new(
            "show_stats",
            "Show stats",
            VariableKind::Toggle,
        ));
        variables.push(VariableSpec::new(
            "line_width",
            "Line width",
            VariableKind::Number,
        ));

        let presets = vec![
            Preset::new(
                "Night",
                [
                    ("theme", VarValue::text("Dark")),
                    ("accent", VarValue::text("Orange")),
                    ("show_stats", VarValue::Toggle(true)),
                ],
            ),
            Preset::new(
                "Paper",
                [
                    ("theme", VarValue::text("Light")),
                    ("accent", VarValue::text("Blue")),
                    ("show_stats", VarValue::Toggle(true)),
                ],
            ),
            Preset::new(
                "Minimal",
                [
                    ("theme", VarValue::text("Light")),
                    ("accent", VarValue::text("Magenta")),
                    ("show_stats", VarValue::Toggle(false)),
                    ("line_width", VarValue::Number(5.0)),
                ],
            ),
        ];

        Self { variables, presets }
    }
}

impl Default for RouteTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for RouteTemplate {
    fn name(&self) -> &str {
        "route"
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
        let show_stats = ctx.variables.toggle("show_stats").unwrap_or(false);
        let line_width = match ctx.variables.number("line_width") {
            Ok(w) if w > 0.0 => w.clamp(1.0, 40.0),
            _ => DEFAULT_LINE_WIDTH,
        };

        let unit = canvas.width.min(canvas.height);
        let MapArea {
            origin: map_origin,
            size: map_size,
            margin,
        } = MapArea::new(canvas, show_stats);

        let mut tree = VisualTree::new(canvas, Some(palette.background));

        if let Some((view, nodes)) = map_layer(ctx, map_size, margin, line_width, &palette) {
            tree.push(Node::transformed(
                Affine::translate(map_origin.to_vec2()) * view,
                nodes,
            ));
        }

        tree.push(Node::Text {
            origin: Point::new(margin, margin + unit * 0.05),
            text: title(ctx.variables, ctx.activity).to_string(),
            size: unit * 0.055,
            weight: 700,
            anchor: TextAnchor::Start,
            fill: palette.foreground,
        });

        if show_stats {
            let distance = if ctx.activity.distance_m > 0.0 {
                ctx.activity.distance_m
            } else {
                ctx.activity_data.total_distance()
            };
            let moving = if ctx.activity.moving_time_s > 0.0 {
                ctx.activity.moving_time_s
            } else {
                ctx.activity_data.duration()
            };
            let line = format!(
                "{}  ·  {}  ·  {:.0} m gain",
                format_distance(distance),
                format_duration(moving),
                ctx.activity_data.elevation_gain()
            );
            tree.push(Node::Text {
                origin: Point::new(margin, canvas.height - margin),
                text: line,
                size: unit * 0.035,
                weight: 500,
                anchor: TextAnchor::Start,
                fill: palette.muted,
            });
        }

        tree
    }

    fn replay(&self, ctx: &RenderContext<'_>, secs: f64) -> TopotrackResult<AnimationSequencer> {
        let show_stats = ctx.variables.toggle("show_stats").unwrap_or(false);
        let area = MapArea::new(ctx.canvas(), show_stats);
        AnimationSequencer::route_replay_in(ctx.activity_data, area.size, area.margin, secs)
    }
}

/// Where the map sits on the canvas: between the title header and the optional stats footer.
struct MapArea {
    origin: Point,
    size: Size,
    margin: f64,
}

impl MapArea {
    fn new(canvas: Size, show_stats: bool) -> Self {
        let unit = canvas.width.min(canvas.height);
        let header = unit * 0.14;
        let footer = if show_stats { unit * 0.12 } else { 0.0 };
        Self {
            origin: Point::new(0.0, header),
            size: Size::new(canvas.width, (canvas.height - header - footer).max(1.0)),
            margin: unit * 0.06,
        }
    }
}

/// Transform and nodes for the map, or `None` when the route cannot be projected.
fn map_layer(
    ctx: &RenderContext<'_>,
    size: Size,
    padding: f64,
    line_width: f64,
    palette: &Palette,
) -> Option<(Affine, Vec<Node>)> {
    let coords: Vec<Coord<f64>> = ctx
        .activity_data
        .samples()
        .iter()
        .map(|s| s.coord())
        .collect();
    let projection = Projection::fit_coords(&coords, size, padding).ok()?;

    let anim = ctx.animation.filter(|a| a.phase != Phase::Idle);
    let view = anim
        .map(|a| a.camera.view_transform(&projection, size))
        .unwrap_or(Affine::IDENTITY);
    let trail = anim.and_then(|a| a.trail);

    let full = projection.project_line(&LineString::new(coords.clone()));
    let mut nodes = Vec::new();
    let marker = line_width * 1.4;

    match trail {
        Some(fraction) => {
            nodes.push(Node::Path {
                path: full,
                fill: None,
                stroke: Some(Stroke {
                    color: palette.muted.with_alpha(90),
                    width: line_width * 0.6,
                }),
            });
            // Same arc-length parameterization as the camera, so the head sits under it.
            let revealed = RoutePath::new(coords)
                .map(|route| route.prefix(fraction))
                .unwrap_or_default();
            if revealed.len() >= 2 {
                nodes.push(Node::Path {
                    path: projection.project_line(&LineString::new(revealed.clone())),
                    fill: None,
                    stroke: Some(Stroke {
                        color: palette.accent,
                        width: line_width,
                    }),
                });
            }
            if let Some(head) = revealed.last() {
                nodes.push(Node::Circle {
                    center: projection.project(*head),
                    radius: marker * 1.2,
                    fill: Some(palette.accent),
                    stroke: Some(Stroke {
                        color: palette.background,
                        width: line_width * 0.5,
                    }),
                });
            }
        }
        None => {
            nodes.push(Node::Path {
                path: full,
                fill: None,
                stroke: Some(Stroke {
                    color: palette.accent,
                    width: line_width,
                }),
            });
            if let (Some(start), Some(end)) = (coords.first(), coords.last()) {
                let start = projection.project(*start);
                let end = projection.project(*end);
                nodes.push(endpoint(start, marker, START_GREEN, palette));
                nodes.push(endpoint(end, marker, FINISH_RED, palette));
            }
        }
    }

    Some((view, nodes))
}

fn endpoint(center: Point, radius: f64, fill: Rgba8, palette: &Palette) -> Node {
    Node::Circle {
        center,
        radius,
        fill: Some(fill),
        stroke: Some(Stroke {
            color: palette.background,
            width: radius * 0.35,
        }),
    }
}
