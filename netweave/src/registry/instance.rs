//! Placed parts.

use std::collections::HashMap;

use super::template::{PartTemplate, PinSpec, TemplateHandle};

/// A uniquely referenced part stamped from a template.
///
/// The pin list is a value copy of the template's, so instances never share
/// state. Which net a pin belongs to is tracked by the owning design, not here.
#[derive(Debug, Clone)]
pub struct PartInstance {
    reference: String,
    template: TemplateHandle,
    template_name: String,
    footprint_id: String,
    value: Option<String>,
    pins: Vec<PinSpec>,
    index: HashMap<String, usize>,
}

impl PartInstance {
    pub(crate) fn from_template(
        reference: String,
        handle: TemplateHandle,
        template: &PartTemplate,
        value: Option<String>,
    ) -> Self {
        Self {
            reference,
            template: handle,
            template_name: template.name().to_string(),
            footprint_id: template.footprint_id().to_string(),
            value,
            pins: template.pins().to_vec(),
            index: template.pin_index().clone(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn template(&self) -> TemplateHandle {
        self.template
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn footprint_id(&self) -> &str {
        &self.footprint_id
    }

    /// Free-text value such as "0.1uF" or "4.7k".
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn pins(&self) -> &[PinSpec] {
        &self.pins
    }

    pub fn pin(&self, designator: &str) -> Option<&PinSpec> {
        self.index.get(designator).map(|&i| &self.pins[i])
    }

    pub fn pin_position(&self, designator: &str) -> Option<usize> {
        self.index.get(designator).copied()
    }

    /// All pins carrying `label`, in declaration order.
    pub fn pins_labelled<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a PinSpec> + 'a {
        self.pins.iter().filter(move |p| p.label == label)
    }
}
