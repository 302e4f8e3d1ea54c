//! Part/Pin Registry
//!
//! Holds immutable part templates and the arena of part instances stamped
//! from them. A template is validated once at definition time; any number of
//! instances can then share it (fifty identical decoupling capacitors are one
//! template and fifty independent instances).

pub mod instance;
pub mod template;

pub use instance::PartInstance;
pub use template::{PartTemplate, PinFunction, PinSpec, TemplateHandle};

use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

/// Malformed definitions in the design description.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Template '{template}' declares designator '{designator}' more than once")]
    DuplicateDesignator { template: String, designator: String },
    #[error("Template '{name}' is already defined")]
    DuplicateTemplate { name: String },
    #[error("Template name must not be empty")]
    EmptyTemplateName,
    #[error("Net '{net}' cannot be declared both power and no-connect")]
    ConflictingNetClass { net: String },
}

/// Problems with instance or template references.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Reference '{reference}' already exists in the design")]
    DuplicateReference { reference: String },
    #[error("Unknown template '{name}'")]
    UnknownTemplate { name: String },
    #[error("Reference must not be empty")]
    EmptyReference,
}

#[derive(Debug, Default)]
pub struct Registry {
    templates: Vec<PartTemplate>,
    by_name: HashMap<String, TemplateHandle>,
    instances: IndexMap<String, PartInstance>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a template. Fails if two pins share a designator or the name is taken.
    pub fn define_template(
        &mut self,
        name: impl Into<String>,
        footprint_id: impl Into<String>,
        pins: Vec<PinSpec>,
    ) -> Result<TemplateHandle, DefinitionError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DefinitionError::EmptyTemplateName);
        }
        if self.by_name.contains_key(&name) {
            return Err(DefinitionError::DuplicateTemplate { name });
        }

        let template = PartTemplate::new(name.clone(), footprint_id.into(), pins).map_err(
            |designator| DefinitionError::DuplicateDesignator {
                template: name.clone(),
                designator,
            },
        )?;

        let handle = TemplateHandle(self.templates.len());
        tracing::debug!(template = %name, pins = template.pins().len(), "defined template");
        self.templates.push(template);
        self.by_name.insert(name, handle);
        Ok(handle)
    }

    pub fn template(&self, handle: TemplateHandle) -> Option<&PartTemplate> {
        self.templates.get(handle.0)
    }

    pub fn template_by_name(&self, name: &str) -> Option<TemplateHandle> {
        self.by_name.get(name).copied()
    }

    pub fn templates(&self) -> impl Iterator<Item = &PartTemplate> {
        self.templates.iter()
    }

    /// Stamp a new instance from `handle` under a unique `reference`.
    pub fn instantiate(
        &mut self,
        handle: TemplateHandle,
        reference: impl Into<String>,
        value: Option<String>,
    ) -> Result<&PartInstance, ReferenceError> {
        let reference = reference.into();
        if reference.is_empty() {
            return Err(ReferenceError::EmptyReference);
        }
        if self.instances.contains_key(&reference) {
            return Err(ReferenceError::DuplicateReference { reference });
        }
        let template = self
            .templates
            .get(handle.0)
            .ok_or_else(|| ReferenceError::UnknownTemplate {
                name: format!("#{}", handle.0),
            })?;

        let instance = PartInstance::from_template(reference.clone(), handle, template, value);
        tracing::debug!(reference = %reference, template = %template.name(), "instantiated part");
        let entry = self.instances.entry(reference).or_insert(instance);
        Ok(&*entry)
    }

    /// Stamp an instance under the lowest free reference `<prefix><n>`, n >= 1.
    pub fn instantiate_auto(
        &mut self,
        handle: TemplateHandle,
        prefix: &str,
        value: Option<String>,
    ) -> Result<&PartInstance, ReferenceError> {
        if prefix.is_empty() {
            return Err(ReferenceError::EmptyReference);
        }
        let reference = (1usize..)
            .map(|n| format!("{}{}", prefix, n))
            .find(|candidate| !self.instances.contains_key(candidate))
            .unwrap_or_else(|| prefix.to_string());
        self.instantiate(handle, reference, value)
    }

    pub fn instance(&self, reference: &str) -> Option<&PartInstance> {
        self.instances.get(reference)
    }

    /// Instances in instantiation order.
    pub fn instances(&self) -> impl Iterator<Item = &PartInstance> {
        self.instances.values()
    }

    pub fn instance_position(&self, reference: &str) -> Option<usize> {
        self.instances.get_index_of(reference)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor_pins() -> Vec<PinSpec> {
        vec![
            PinSpec::new("1", "~", PinFunction::Passive),
            PinSpec::new("2", "~", PinFunction::Passive),
        ]
    }

    #[test]
    fn test_define_template_duplicate_designator() {
        let mut registry = Registry::new();
        let pins = vec![
            PinSpec::new("1", "A", PinFunction::Input),
            PinSpec::new("1", "B", PinFunction::Output),
        ];
        let err = registry.define_template("BAD", "fp", pins).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::DuplicateDesignator {
                template: "BAD".to_string(),
                designator: "1".to_string(),
            }
        );
        assert!(registry.template_by_name("BAD").is_none());
    }

    #[test]
    fn test_define_template_twice() {
        let mut registry = Registry::new();
        registry.define_template("R", "R_0402", resistor_pins()).unwrap();
        let err = registry.define_template("R", "R_0603", resistor_pins()).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateTemplate { .. }));
    }

    #[test]
    fn test_instantiate_duplicate_reference() {
        let mut registry = Registry::new();
        let r = registry.define_template("R", "R_0402", resistor_pins()).unwrap();
        registry.instantiate(r, "R1", None).unwrap();
        let err = registry.instantiate(r, "R1", None).unwrap_err();
        assert_eq!(
            err,
            ReferenceError::DuplicateReference {
                reference: "R1".to_string()
            }
        );
        assert_eq!(registry.instance_count(), 1);
    }

    #[test]
    fn test_instances_copy_template_pins() {
        let mut registry = Registry::new();
        let r = registry.define_template("R", "R_0402", resistor_pins()).unwrap();
        registry.instantiate(r, "R1", Some("100R".into())).unwrap();
        registry.instantiate(r, "R2", None).unwrap();

        let r1 = registry.instance("R1").unwrap();
        assert_eq!(r1.template_name(), "R");
        assert_eq!(r1.footprint_id(), "R_0402");
        assert_eq!(r1.value(), Some("100R"));
        assert_eq!(r1.pins().len(), 2);
        assert_eq!(registry.instance("R2").unwrap().value(), None);
        assert_eq!(registry.instance_position("R2"), Some(1));
    }

    #[test]
    fn test_instantiate_auto_fills_gaps() {
        let mut registry = Registry::new();
        let c = registry.define_template("C", "C_0402", resistor_pins()).unwrap();
        registry.instantiate(c, "C2", None).unwrap();
        let first = registry.instantiate_auto(c, "C", None).unwrap().reference().to_string();
        let second = registry.instantiate_auto(c, "C", None).unwrap().reference().to_string();
        assert_eq!(first, "C1");
        assert_eq!(second, "C3");
    }
}
