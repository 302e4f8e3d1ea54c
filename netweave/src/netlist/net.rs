use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A `(reference, designator)` pair naming one pin of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinRef {
    #[serde(rename = "part_reference")]
    pub reference: String,
    pub designator: String,
}

impl PinRef {
    pub fn new(reference: impl Into<String>, designator: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            designator: designator.into(),
        }
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.reference, self.designator)
    }
}

/// Drive classification of a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveClass {
    Power,
    Signal,
    NoConnect,
}

impl DriveClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DriveClass::Power => "power",
            DriveClass::Signal => "signal",
            DriveClass::NoConnect => "no_connect",
        }
    }
}

impl std::fmt::Display for DriveClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of pins, kept in the order they were bound.
///
/// Members are non-owning references; the design resolves them back to
/// instances and pin specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Net {
    name: String,
    pins: IndexSet<PinRef>,
}

impl Net {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: IndexSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pins(&self) -> impl Iterator<Item = &PinRef> {
        self.pins.iter()
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn contains(&self, pin: &PinRef) -> bool {
        self.pins.contains(pin)
    }

    pub fn position(&self, pin: &PinRef) -> Option<usize> {
        self.pins.get_index_of(pin)
    }

    pub(crate) fn push(&mut self, pin: PinRef) -> bool {
        self.pins.insert(pin)
    }

    pub(crate) fn drain(&mut self) -> Vec<PinRef> {
        self.pins.drain(..).collect()
    }
}
