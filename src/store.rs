//! Composer state owned by the composition root.

use crate::{
    activity::model::{Activity, ActivityTelemetry},
    animation::{camera::CameraState, sequencer::AnimationSequencer},
    foundation::{
        core::Size,
        error::{LookupKind, TopotrackError, TopotrackResult},
    },
    layout::{fit::LayoutEngine, format::Format},
    template::{
        contract::RenderContext,
        registry::TemplateRegistry,
        variables::{ResolvedVariables, VarValue, VariableValues, apply_preset, resolve},
    },
};

/// Current template selection, variables, format, layout and animation.
///
/// There is no global instance: the host creates one and passes it by reference to the renderer
/// and the export pipeline.
#[derive(Clone, Debug)]
pub struct ComposerStore {
    template: String,
    variables: ResolvedVariables,
    layout: LayoutEngine,
    animation: AnimationSequencer,
}

impl ComposerStore {
    pub fn new(
        registry: &TemplateRegistry,
        template: &str,
        format: Format,
        container: Size,
    ) -> TopotrackResult<Self> {
        let t = registry.get(template)?;
        let variables = resolve(t.variables(), &VariableValues::new());
        let idle = CameraState {
            center: geo_types::Coord { x: 0.0, y: 0.0 },
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
        };
        Ok(Self {
            template: t.name().to_string(),
            variables,
            layout: LayoutEngine::new(format, container),
            animation: AnimationSequencer::new(idle, Vec::new())?,
        })
    }

    pub fn template_name(&self) -> &str {
        &self.template
    }

    pub fn variables(&self) -> &ResolvedVariables {
        &self.variables
    }

    pub fn format(&self) -> &Format {
        self.layout.format()
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn animation(&self) -> &AnimationSequencer {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut AnimationSequencer {
        &mut self.animation
    }

    /// Install a new camera program, replacing (and cancelling) the current one.
    pub fn set_animation(&mut self, animation: AnimationSequencer) {
        self.animation = animation;
    }

    /// Install the selected template's route replay, `secs` long, left `Idle`.
    pub fn prepare_replay(
        &mut self,
        registry: &TemplateRegistry,
        activity: &Activity,
        telemetry: &ActivityTelemetry,
        secs: f64,
    ) -> TopotrackResult<()> {
        let template = registry.get(&self.template)?;
        let ctx = RenderContext {
            activity,
            activity_data: telemetry,
            variables: &self.variables,
            format: self.layout.format(),
            size: self.layout.frame().size(),
            animation: None,
        };
        let program = template.replay(&ctx, secs)?;
        self.animation = program;
        Ok(())
    }

    /// Switch template and re-resolve: values the new schema does not declare are dropped.
    pub fn select_template(
        &mut self,
        registry: &TemplateRegistry,
        name: &str,
    ) -> TopotrackResult<()> {
        let t = registry.get(name)?;
        self.variables = resolve(t.variables(), self.variables.values());
        self.template = t.name().to_string();
        self.animation.reset();
        Ok(())
    }

    pub fn set_variable(
        &mut self,
        registry: &TemplateRegistry,
        name: &str,
        value: VarValue,
    ) -> TopotrackResult<()> {
        let t = registry.get(&self.template)?;
        if !t.variables().iter().any(|v| v.name == name) {
            return Err(TopotrackError::not_found(LookupKind::Variable, name));
        }
        let mut candidates = self.variables.values().clone();
        candidates.insert(name.to_string(), value);
        self.variables = resolve(t.variables(), &candidates);
        Ok(())
    }

    pub fn apply_preset(
        &mut self,
        registry: &TemplateRegistry,
        preset: &str,
    ) -> TopotrackResult<()> {
        let t = registry.get(&self.template)?;
        self.variables = apply_preset(t.variables(), t.presets(), preset)?;
        Ok(())
    }

    pub fn set_format(&mut self, format: Format) -> bool {
        self.layout.set_format(format)
    }

    pub fn resize(&mut self, container: Size) -> bool {
        self.layout.resize(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_template_keeps_shared_values_and_drops_stale_ones() {
        let registry = TemplateRegistry::with_builtins();
        let mut store =
            ComposerStore::new(&registry, "route", Format::square(), Size::new(400.0, 400.0))
                .unwrap();
        store
            .set_variable(&registry, "theme", VarValue::text("Light"))
            .unwrap();
        store
            .set_variable(&registry, "line_width", VarValue::Number(3.0))
            .unwrap();

        store.select_template(&registry, "elevation").unwrap();
        assert_eq!(store.template_name(), "elevation");
        assert_eq!(store.variables().text("theme").unwrap(), "Light");
        assert!(store.variables().get("line_width").unwrap_err().is_not_found());
        assert!(!store.variables().toggle("show_labels").unwrap());
    }

    #[test]
    fn unknown_names_are_not_found() {
        let registry = TemplateRegistry::with_builtins();
        assert!(
            ComposerStore::new(&registry, "poster", Format::square(), Size::ZERO)
                .unwrap_err()
                .is_not_found()
        );
        let mut store =
            ComposerStore::new(&registry, "route", Format::square(), Size::ZERO).unwrap();
        assert!(
            store
                .set_variable(&registry, "nope", VarValue::Toggle(true))
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.apply_preset(&registry, "Nope").unwrap_err().is_not_found());
        assert_eq!(store.template_name(), "route");
    }

    #[test]
    fn preset_and_format_changes() {
        let registry = TemplateRegistry::with_builtins();
        let mut store =
            ComposerStore::new(&registry, "route", Format::square(), Size::new(1000.0, 500.0))
                .unwrap();
        store.apply_preset(&registry, "Paper").unwrap();
        assert_eq!(store.variables().text("accent").unwrap(), "Blue");
        assert!(store.variables().toggle("show_stats").unwrap());

        assert_eq!(store.layout().frame().width(), 500.0);
        assert!(store.set_format(Format::landscape()));
        assert!((store.layout().frame().width() - 888.888_888).abs() < 1e-3);
        assert!(store.resize(Size::new(1920.0, 1080.0)));
        assert_eq!(store.layout().frame().width(), 1920.0);
    }

    #[test]
    fn prepared_replay_runs_to_completion() {
        use crate::{activity::model::fixtures::park_loop, animation::sequencer::Phase};

        let registry = TemplateRegistry::with_builtins();
        let mut store =
            ComposerStore::new(&registry, "route", Format::square(), Size::new(400.0, 400.0))
                .unwrap();
        let (activity, data) = park_loop();
        store.prepare_replay(&registry, &activity, &data, 3.0).unwrap();
        assert_eq!(store.animation().phase(), Phase::Idle);
        assert!((store.animation().total_duration() - 3.0).abs() < 1e-9);

        store.animation_mut().play();
        let s = store.animation_mut().tick(5.0);
        assert_eq!(s.phase, Phase::Complete);
        assert_eq!(s.trail, Some(1.0));
    }
}
