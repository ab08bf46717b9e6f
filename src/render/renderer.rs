use crate::{
    activity::{model::Activity, source::TelemetryState},
    foundation::core::Size,
    render::tree::VisualTree,
    store::ComposerStore,
    template::{contract::RenderContext, registry::TemplateRegistry},
};

/// Turns the composer's current selection into a visual tree.
///
/// Rendering is synchronous and side-effect free. Missing telemetry, failed telemetry and
/// unknown templates all come back as placeholder trees rather than errors.
#[derive(Clone, Copy, Debug)]
pub struct Renderer<'a> {
    registry: &'a TemplateRegistry,
}

impl<'a> Renderer<'a> {
    pub fn new(registry: &'a TemplateRegistry) -> Self {
        Self { registry }
    }

    #[tracing::instrument(skip_all, fields(template = store.template_name()))]
    pub fn render(
        &self,
        store: &ComposerStore,
        activity: &Activity,
        telemetry: &TelemetryState,
    ) -> VisualTree {
        let format = store.format();
        let canvas = Size::new(f64::from(format.width), f64::from(format.height));

        let data = match telemetry {
            TelemetryState::Loading => return VisualTree::loading(canvas),
            TelemetryState::Failed(msg) => return VisualTree::error(canvas, msg.clone()),
            TelemetryState::Ready(data) => data,
        };

        let template = match self.registry.get(store.template_name()) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "render with unknown template");
                return VisualTree::error(canvas, e.to_string());
            }
        };

        let ctx = RenderContext {
            activity,
            activity_data: data,
            variables: store.variables(),
            format,
            size: store.layout().frame().size(),
            animation: Some(store.animation().state()),
        };
        template.render(&ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        activity::model::fixtures::park_loop,
        layout::format::Format,
        render::tree::TreeKind,
    };

    fn store(registry: &TemplateRegistry) -> ComposerStore {
        ComposerStore::new(registry, "route", Format::square(), Size::new(800.0, 600.0)).unwrap()
    }

    #[test]
    fn loading_and_failed_telemetry_render_placeholders() {
        let registry = TemplateRegistry::with_builtins();
        let renderer = Renderer::new(&registry);
        let store = store(&registry);
        let (activity, _) = park_loop();

        let t = renderer.render(&store, &activity, &TelemetryState::Loading);
        assert_eq!(t.kind, TreeKind::Loading);
        assert_eq!(t.size, Size::new(1080.0, 1080.0));

        let t = renderer.render(
            &store,
            &activity,
            &TelemetryState::Failed("timeout".to_string()),
        );
        assert_eq!(t.kind, TreeKind::Error("timeout".to_string()));
    }

    #[test]
    fn ready_telemetry_renders_selected_template() {
        let registry = TemplateRegistry::with_builtins();
        let renderer = Renderer::new(&registry);
        let mut store = store(&registry);
        let (activity, data) = park_loop();
        let state = TelemetryState::Ready(data);

        let a = renderer.render(&store, &activity, &state);
        assert_eq!(a.kind, TreeKind::Content);

        store.select_template(&registry, "elevation").unwrap();
        let b = renderer.render(&store, &activity, &state);
        assert_eq!(b.kind, TreeKind::Content);
        assert_ne!(a, b);

        // Pure: same inputs, same tree.
        assert_eq!(b, renderer.render(&store, &activity, &state));
    }
}
