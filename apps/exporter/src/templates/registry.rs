use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::TemplateError;
use crate::templates::{builtin, derive_template, validate_template, Template};

/// Process-local store of registered templates.
///
/// Constructed once at startup and shared by reference (`Arc<TemplateRegistry>`).
/// Templates are immutable after registration; readers receive `Arc<Template>`.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: RwLock<BTreeMap<String, Arc<Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in templates.
    pub fn with_builtin_templates() -> Self {
        let registry = Self::new();
        for template in builtin::all() {
            if let Err(e) = registry.register(template) {
                tracing::error!("Built-in template rejected: {e}");
            }
        }
        registry
    }

    /// Validates and stores a template. Ids are unique.
    pub fn register(&self, template: Template) -> Result<Arc<Template>, TemplateError> {
        validate_template(&template)?;

        let mut templates = self.templates.write();
        if templates.contains_key(&template.id) {
            return Err(TemplateError::Duplicate(template.id));
        }
        let template = Arc::new(template);
        templates.insert(template.id.clone(), Arc::clone(&template));
        info!(template_id = %template.id, "Registered template");
        Ok(template)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Template>, TemplateError> {
        self.templates
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// All registered templates, ordered by id.
    pub fn list(&self) -> Vec<Arc<Template>> {
        self.templates.read().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.templates.read().keys().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.read().contains_key(id)
    }

    /// Derives a customised template from a registered one. The result is not registered.
    pub fn derive(
        &self,
        base_id: &str,
        id: &str,
        name: &str,
        overrides: &Value,
    ) -> Result<Template, TemplateError> {
        let base = self.get(base_id)?;
        debug!(base = base_id, derived = id, "Deriving template");
        derive_template(&base, id, name, overrides)
    }
}
