//! Renderings of an [`Artifact`].
//!
//! JSON is the canonical form. The S-expression form follows the layout of
//! a KiCad-style netlist so downstream tools can pick it up with a generic
//! s-expression reader.

use super::artifact::{Artifact, NetRecord, PartRecord};
use super::SerializationError;
use crate::erc::Diagnostic;
use crate::parser::SExp;

/// Pretty JSON, two-space indent, trailing newline.
pub fn to_json(artifact: &Artifact) -> Result<String, SerializationError> {
    let mut out = serde_json::to_string_pretty(artifact)
        .map_err(|e| SerializationError::Render(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

pub fn to_sexp(artifact: &Artifact) -> String {
    let mut root = vec![SExp::tagged("version", [SExp::atom(artifact.format_version.to_string())])];
    if let Some(name) = &artifact.design {
        root.push(SExp::tagged("design", [SExp::tagged("source", [SExp::atom(name)])]));
    }
    root.push(SExp::tagged("components", artifact.parts.iter().map(component)));
    root.push(SExp::tagged("nets", artifact.nets.iter().enumerate().map(|(i, n)| net(i + 1, n))));
    root.push(SExp::tagged("diagnostics", artifact.diagnostics.iter().map(diagnostic)));
    SExp::tagged("netlist", root).to_pretty_string()
}

fn component(part: &PartRecord) -> SExp {
    let mut items = vec![SExp::tagged("ref", [SExp::atom(&part.reference)])];
    if let Some(value) = &part.value {
        items.push(SExp::tagged("value", [SExp::atom(value)]));
    }
    items.push(SExp::tagged("footprint", [SExp::atom(&part.footprint_id)]));
    items.push(SExp::tagged("libsource", [SExp::tagged("part", [SExp::atom(&part.template_name)])]));
    SExp::tagged("comp", items)
}

fn net(code: usize, net: &NetRecord) -> SExp {
    let mut items = vec![
        SExp::tagged("code", [SExp::atom(code.to_string())]),
        SExp::tagged("name", [SExp::atom(&net.name)]),
        SExp::tagged("class", [SExp::atom(net.drive_class.as_str())]),
    ];
    items.extend(net.pins.iter().map(|pin| {
        SExp::tagged(
            "node",
            [
                SExp::tagged("ref", [SExp::atom(&pin.reference)]),
                SExp::tagged("pin", [SExp::atom(&pin.designator)]),
            ],
        )
    }));
    SExp::tagged("net", items)
}

fn diagnostic(d: &Diagnostic) -> SExp {
    let mut items = vec![
        SExp::tagged("severity", [SExp::atom(d.severity.to_string())]),
        SExp::tagged("rule", [SExp::atom(&d.rule)]),
    ];
    if let Some(net) = &d.net_name {
        items.push(SExp::tagged("net", [SExp::atom(net)]));
    }
    if let Some(reference) = &d.part_reference {
        items.push(SExp::tagged("ref", [SExp::atom(reference)]));
    }
    if let Some(designator) = &d.designator {
        items.push(SExp::tagged("pin", [SExp::atom(designator)]));
    }
    items.push(SExp::tagged("message", [SExp::atom(&d.message)]));
    SExp::tagged("diagnostic", items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erc::Severity;
    use crate::netlist::{DriveClass, PinRef};
    use crate::parser::SExpParser;

    fn sample() -> Artifact {
        Artifact {
            format_version: 1,
            design: Some("demo".to_string()),
            parts: vec![PartRecord {
                reference: "R1".to_string(),
                template_name: "R".to_string(),
                footprint_id: "Resistor_SMD:R_0402_1005Metric".to_string(),
                value: Some("4.7k".to_string()),
            }],
            nets: vec![NetRecord {
                name: "VCC".to_string(),
                drive_class: DriveClass::Power,
                pins: vec![PinRef::new("R1", "1")],
            }],
            diagnostics: vec![Diagnostic {
                severity: Severity::Warning,
                rule: "isolated_net".to_string(),
                net_name: Some("VCC".to_string()),
                part_reference: None,
                designator: None,
                message: "Net 'VCC' has a single pin (R1:1)".to_string(),
            }],
        }
    }

    #[test]
    fn test_json_field_names() {
        let json = to_json(&sample()).unwrap();
        assert!(json.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["parts"][0]["template_name"], "R");
        assert_eq!(value["nets"][0]["drive_class"], "power");
        assert_eq!(value["nets"][0]["pins"][0]["part_reference"], "R1");
        assert_eq!(value["diagnostics"][0]["severity"], "warning");
        assert!(value["diagnostics"][0].get("designator").is_none());
    }

    #[test]
    fn test_json_reads_back() {
        let artifact = sample();
        let back: Artifact = serde_json::from_str(&to_json(&artifact).unwrap()).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn test_sexp_structure() {
        let text = to_sexp(&sample());
        let tree = SExpParser::new(&text).parse().unwrap();
        assert_eq!(tree.head(), Some("netlist"));
        assert_eq!(tree.get("version").and_then(SExp::as_atom), Some("1"));

        let nets = tree.get_all("nets");
        let net = nets[0].get_all("net");
        assert_eq!(net[0].get("name").and_then(SExp::as_atom), Some("VCC"));
        assert_eq!(net[0].get("class").and_then(SExp::as_atom), Some("power"));

        let comps = tree.get_all("components");
        let comp = comps[0].get_all("comp");
        assert_eq!(comp[0].get("value").and_then(SExp::as_atom), Some("4.7k"));
        assert!(text.contains("(message \"Net 'VCC' has a single pin (R1:1)\")"));
    }
}
