//! Part templates and their pin tables.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Electrical function of a pin. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PinFunction {
    PowerIn,
    PowerOut,
    Input,
    Output,
    Bidirectional,
    Passive,
    NoConnect,
}

impl PinFunction {
    /// Pins that may source a level onto a net.
    pub fn is_driver(self) -> bool {
        matches!(
            self,
            PinFunction::Output | PinFunction::Bidirectional | PinFunction::PowerOut
        )
    }

    /// Pins that sink a level from a net.
    pub fn is_receiver(self) -> bool {
        matches!(self, PinFunction::Input | PinFunction::Bidirectional)
    }

    pub fn is_power(self) -> bool {
        matches!(self, PinFunction::PowerIn | PinFunction::PowerOut)
    }

    /// Unbound pins of this function are an error rather than a warning or nothing.
    pub fn is_required(self) -> bool {
        !matches!(self, PinFunction::NoConnect | PinFunction::Passive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PinFunction::PowerIn => "power_in",
            PinFunction::PowerOut => "power_out",
            PinFunction::Input => "input",
            PinFunction::Output => "output",
            PinFunction::Bidirectional => "bidirectional",
            PinFunction::Passive => "passive",
            PinFunction::NoConnect => "no_connect",
        }
    }
}

impl std::fmt::Display for PinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinFunction::PowerIn => write!(f, "Power Input"),
            PinFunction::PowerOut => write!(f, "Power Output"),
            PinFunction::Input => write!(f, "Input"),
            PinFunction::Output => write!(f, "Output"),
            PinFunction::Bidirectional => write!(f, "Bidirectional"),
            PinFunction::Passive => write!(f, "Passive"),
            PinFunction::NoConnect => write!(f, "No Connect"),
        }
    }
}

impl FromStr for PinFunction {
    type Err = String;

    /// Accepts the snake_case names plus the short forms common in
    /// schematic-capture scripts (`PWRIN`, `BIDIR`, `NC`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "power_in" | "pwrin" | "pwr_in" => Ok(PinFunction::PowerIn),
            "power_out" | "pwrout" | "pwr_out" => Ok(PinFunction::PowerOut),
            "input" | "in" => Ok(PinFunction::Input),
            "output" | "out" => Ok(PinFunction::Output),
            "bidirectional" | "bidir" | "inout" => Ok(PinFunction::Bidirectional),
            "passive" | "pas" => Ok(PinFunction::Passive),
            "no_connect" | "noconnect" | "nc" => Ok(PinFunction::NoConnect),
            _ => Err(format!("unknown pin function '{}'", s)),
        }
    }
}

impl TryFrom<String> for PinFunction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One physical pin of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSpec {
    /// Physical designator, unique within the template (e.g. "1", "F8", "AA20")
    pub designator: String,

    /// Logical name; several pins may share one (e.g. multiple "VSS" balls)
    pub label: String,

    /// Electrical function
    pub function: PinFunction,
}

impl PinSpec {
    pub fn new(
        designator: impl Into<String>,
        label: impl Into<String>,
        function: PinFunction,
    ) -> Self {
        Self {
            designator: designator.into(),
            label: label.into(),
            function,
        }
    }
}

/// Handle to a template held by a [`super::Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateHandle(pub(crate) usize);

/// Immutable part definition shared by every instance stamped from it.
#[derive(Debug, Clone)]
pub struct PartTemplate {
    name: String,
    footprint_id: String,
    pins: Vec<PinSpec>,
    index: HashMap<String, usize>,
}

impl PartTemplate {
    /// Builds the template, returning the first repeated designator on failure.
    pub(crate) fn new(
        name: String,
        footprint_id: String,
        pins: Vec<PinSpec>,
    ) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(pins.len());
        for (i, pin) in pins.iter().enumerate() {
            if index.insert(pin.designator.clone(), i).is_some() {
                return Err(pin.designator.clone());
            }
        }
        Ok(Self {
            name,
            footprint_id,
            pins,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn footprint_id(&self) -> &str {
        &self.footprint_id
    }

    pub fn pins(&self) -> &[PinSpec] {
        &self.pins
    }

    pub fn pin(&self, designator: &str) -> Option<&PinSpec> {
        self.index.get(designator).map(|&i| &self.pins[i])
    }

    /// Position of a pin in declaration order.
    pub fn pin_position(&self, designator: &str) -> Option<usize> {
        self.index.get(designator).copied()
    }

    pub(crate) fn pin_index(&self) -> &HashMap<String, usize> {
        &self.index
    }
}
