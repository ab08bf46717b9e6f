//! Templates bundled with the crate.

mod elevation;
mod route;

pub use elevation::ElevationTemplate;
pub use route::RouteTemplate;

use crate::{
    activity::model::Activity,
    foundation::core::Rgba8,
    template::variables::{ResolvedVariables, VariableKind, VariableSpec},
};

pub(crate) const THEMES: [&str; 3] = ["Dark", "Light", "Topo"];
pub(crate) const ACCENTS: [&str; 4] = ["Orange", "Blue", "Green", "Magenta"];

#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub background: Rgba8,
    pub foreground: Rgba8,
    pub muted: Rgba8,
    pub accent: Rgba8,
}

impl Palette {
    pub(crate) fn from_variables(vars: &ResolvedVariables) -> Self {
        let (background, foreground, muted) = match vars.text("theme").unwrap_or("Dark") {
            "Light" => (
                Rgba8::rgb(0xf7, 0xf5, 0xf0),
                Rgba8::rgb(0x1d, 0x23, 0x30),
                Rgba8::rgb(0x6b, 0x72, 0x80),
            ),
            "Topo" => (
                Rgba8::rgb(0xe9, 0xe4, 0xd4),
                Rgba8::rgb(0x2f, 0x3b, 0x2f),
                Rgba8::rgb(0x7a, 0x80, 0x6c),
            ),
            _ => (
                Rgba8::rgb(0x11, 0x14, 0x18),
                Rgba8::rgb(0xf2, 0xf4, 0xf7),
                Rgba8::rgb(0x8a, 0x93, 0xa3),
            ),
        };
        let accent = match vars.text("accent").unwrap_or("Orange") {
            "Blue" => Rgba8::rgb(0x2d, 0x7f, 0xf9),
            "Green" => Rgba8::rgb(0x1f, 0xa4, 0x63),
            "Magenta" => Rgba8::rgb(0xd6, 0x33, 0x6c),
            _ => Rgba8::rgb(0xfc, 0x4c, 0x02),
        };
        Self {
            background,
            foreground,
            muted,
            accent,
        }
    }
}

pub(crate) fn theme_variables() -> Vec<VariableSpec> {
    vec![
        VariableSpec::new("theme", "Theme", VariableKind::choice(THEMES)),
        VariableSpec::new("accent", "Accent color", VariableKind::choice(ACCENTS)),
        VariableSpec::new("title", "Title", VariableKind::Text),
    ]
}

/// Title variable, or the activity name when left empty.
pub(crate) fn title<'a>(vars: &'a ResolvedVariables, activity: &'a Activity) -> &'a str {
    match vars.text("title") {
        Ok(t) if !t.trim().is_empty() => t,
        _ => &activity.name,
    }
}

pub(crate) fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

pub(crate) fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
