use crate::{
    activity::model::{Activity, ActivityTelemetry},
    animation::sequencer::{AnimationSequencer, AnimationState},
    foundation::{
        core::Size,
        error::{TopotrackError, TopotrackResult},
    },
    layout::format::Format,
    render::tree::VisualTree,
    template::variables::{Preset, ResolvedVariables, VariableKind, VariableSpec},
};

/// Everything a template sees for one render. Built fresh per render, never stored.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub activity: &'a Activity,
    pub activity_data: &'a ActivityTelemetry,
    pub variables: &'a ResolvedVariables,
    pub format: &'a Format,
    /// Measured size of the preview frame. Trees are still drawn in `format` pixels.
    pub size: Size,
    pub animation: Option<AnimationState>,
}

impl RenderContext<'_> {
    /// Nominal drawing space of the selected format.
    pub fn canvas(&self) -> Size {
        Size::new(f64::from(self.format.width), f64::from(self.format.height))
    }
}

/// A self-describing visual template.
///
/// Implementations are registered once and never mutated. `render` must be pure and fast enough
/// to run every frame; it does no I/O.
pub trait Template: Send + Sync {
    fn name(&self) -> &str;

    fn variables(&self) -> &[VariableSpec];

    fn presets(&self) -> &[Preset];

    fn render(&self, ctx: &RenderContext<'_>) -> VisualTree;

    /// Route-replay camera program matching how this template draws its map.
    ///
    /// The default assumes the map fills the whole canvas.
    fn replay(&self, ctx: &RenderContext<'_>, secs: f64) -> TopotrackResult<AnimationSequencer> {
        AnimationSequencer::route_replay_in(ctx.activity_data, ctx.canvas(), 0.0, secs)
    }
}

/// Structural checks run at registration.
pub(crate) fn validate_template(t: &dyn Template) -> TopotrackResult<()> {
    let name = t.name();
    if name.trim().is_empty() {
        return Err(TopotrackError::validation("template name must be non-empty"));
    }

    let vars = t.variables();
    for (i, v) in vars.iter().enumerate() {
        if vars[..i].iter().any(|o| o.name == v.name) {
            return Err(TopotrackError::validation(format!(
                "template '{name}' declares variable '{}' twice",
                v.name
            )));
        }
        if let VariableKind::Choice { options } = &v.kind {
            if options.is_empty() {
                return Err(TopotrackError::validation(format!(
                    "template '{name}' variable '{}' has no options",
                    v.name
                )));
            }
        }
    }

    let presets = t.presets();
    for (i, p) in presets.iter().enumerate() {
        if presets[..i].iter().any(|o| o.name == p.name) {
            return Err(TopotrackError::validation(format!(
                "template '{name}' declares preset '{}' twice",
                p.name
            )));
        }
    }
    Ok(())
}
