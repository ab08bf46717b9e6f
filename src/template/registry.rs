use std::{collections::HashMap, sync::Arc};

use crate::{
    foundation::error::{LookupKind, TopotrackError, TopotrackResult},
    template::{
        builtin::{ElevationTemplate, RouteTemplate},
        contract::{Template, validate_template},
    },
};

/// Catalog of templates, in registration order.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<dyn Template>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.list().map(|t| t.name())).finish()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the bundled templates.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        for t in [
            Arc::new(RouteTemplate::new()) as Arc<dyn Template>,
            Arc::new(ElevationTemplate::new()),
        ] {
            // Bundled templates have distinct names and valid schemas.
            if let Err(e) = r.register_shared(t) {
                tracing::error!(error = %e, "failed to register bundled template");
            }
        }
        r
    }

    pub fn register(&mut self, template: impl Template + 'static) -> TopotrackResult<()> {
        self.register_shared(Arc::new(template))
    }

    pub fn register_shared(&mut self, template: Arc<dyn Template>) -> TopotrackResult<()> {
        let name = template.name().to_string();
        if self.index.contains_key(&name) {
            return Err(TopotrackError::DuplicateTemplate(name));
        }
        validate_template(template.as_ref())?;
        tracing::debug!(template = %name, "registered template");
        self.index.insert(name, self.templates.len());
        self.templates.push(template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> TopotrackResult<&dyn Template> {
        self.index
            .get(name)
            .map(|&i| self.templates[i].as_ref())
            .ok_or_else(|| TopotrackError::not_found(LookupKind::Template, name))
    }

    /// Lazy walk over registered templates; call again to start over.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &dyn Template> + Clone {
        self.templates.iter().map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
