use serde::{Deserialize, Serialize};

use crate::erc::Diagnostic;
use crate::netlist::{Design, DriveClass, PinRef};

/// Version stamped into every rendering.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    pub reference: String,
    pub template_name: String,
    pub footprint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetRecord {
    pub name: String,
    pub drive_class: DriveClass,
    pub pins: Vec<PinRef>,
}

/// The format-independent build artifact.
///
/// Parts are listed in instantiation order, nets in declaration order with
/// members in bind order, diagnostics in report order. Nothing here is keyed
/// by an unordered container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
    pub parts: Vec<PartRecord>,
    pub nets: Vec<NetRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Artifact {
    pub(crate) fn collect(design: &Design, diagnostics: &[Diagnostic]) -> Self {
        let parts = design
            .instances()
            .map(|inst| PartRecord {
                reference: inst.reference().to_string(),
                template_name: inst.template_name().to_string(),
                footprint_id: inst.footprint_id().to_string(),
                value: inst.value().map(str::to_string),
            })
            .collect();

        let nets = design
            .nets()
            .map(|net| NetRecord {
                name: net.name().to_string(),
                drive_class: design.drive_class(net),
                pins: net.pins().cloned().collect(),
            })
            .collect();

        Self {
            format_version: FORMAT_VERSION,
            design: design.name().map(str::to_string),
            parts,
            nets,
            diagnostics: diagnostics.to_vec(),
        }
    }

    pub fn part(&self, reference: &str) -> Option<&PartRecord> {
        self.parts.iter().find(|p| p.reference == reference)
    }

    pub fn net(&self, name: &str) -> Option<&NetRecord> {
        self.nets.iter().find(|n| n.name == name)
    }

    pub fn pin_count(&self) -> usize {
        self.nets.iter().map(|n| n.pins.len()).sum()
    }
}
