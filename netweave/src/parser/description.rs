//! Design descriptions: the declarative input to a build.
//!
//! A description lists templates, part instantiations, connections and net
//! declarations. Connections (net merges included) are replayed in the order
//! they are written. A description can be written as JSON (the serde model
//! below, field for field) or as an S-expression document:
//!
//! ```text
//! (design codec_board
//!   (template R (footprint Resistor_SMD:R_0402_1005Metric)
//!     (pin 1 ~ passive) (pin 2 ~ passive))
//!   (part R R1 (value 4.7k))
//!   (parts C_Small C 8 (value 0.1uF))
//!   (net SDA U1:12 R1:2)
//!   (net-labels GND U1 VSS DVSS)
//!   (connect R1:1 R2:1)
//!   (merge GND AGND)
//!   (power VDD GND)
//!   (no-connect SPARE))
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use super::sexp::{ParseError, SExp, SExpParser};
use crate::netlist::PinRef;
use crate::registry::{PinFunction, PinSpec};

#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("Invalid JSON description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid S-expression description: {0}")]
    Sexp(#[from] ParseError),

    #[error("Malformed ({form} ...) form: {message}")]
    InvalidForm { form: String, message: String },

    #[error("Unsupported description format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid pin address '{0}', expected REFERENCE:DESIGNATOR")]
    InvalidPinAddress(String),

    #[error("Invalid part entry for template '{template}': {message}")]
    InvalidPart { template: String, message: String },

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),
}

/// `REF:DESIGNATOR` as written in descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PinAddress(pub PinRef);

impl PinAddress {
    pub fn parse(s: &str) -> Result<Self, DescriptionError> {
        match s.split_once(':') {
            Some((reference, designator)) if !reference.is_empty() && !designator.is_empty() => {
                Ok(PinAddress(PinRef::new(reference, designator)))
            }
            _ => Err(DescriptionError::InvalidPinAddress(s.to_string())),
        }
    }
}

impl TryFrom<String> for PinAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PinAddress::parse(&value).map_err(|e| e.to_string())
    }
}

impl From<PinAddress> for String {
    fn from(value: PinAddress) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for PinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
    #[serde(alias = "footprint_id")]
    pub footprint: String,
    pub pins: Vec<PinSpec>,
}

/// One instantiation request. Either a fixed `reference`, or a `prefix`
/// (with optional `count`, default 1) for automatically numbered parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDef {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// How a `PartDef` names its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming<'a> {
    Fixed(&'a str),
    Auto { prefix: &'a str, count: usize },
}

impl PartDef {
    pub fn naming(&self) -> Result<Naming<'_>, DescriptionError> {
        let invalid = |message: &str| DescriptionError::InvalidPart {
            template: self.template.clone(),
            message: message.to_string(),
        };
        match (&self.reference, &self.prefix) {
            (Some(_), Some(_)) => Err(invalid("give either 'reference' or 'prefix', not both")),
            (None, None) => Err(invalid("missing 'reference' or 'prefix'")),
            (Some(reference), None) => {
                if self.count.is_some() {
                    return Err(invalid("'count' only applies with 'prefix'"));
                }
                Ok(Naming::Fixed(reference))
            }
            (None, Some(prefix)) => Ok(Naming::Auto {
                prefix,
                count: self.count.unwrap_or(1),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Connection {
    /// Bind each listed pin to `net`.
    Net { net: String, pins: Vec<PinAddress> },
    /// Bind every pin of `part` carrying one of `labels` to `net`.
    Labels {
        net: String,
        part: String,
        labels: Vec<String>,
    },
    /// Join two pins on a shared, possibly anonymous, net.
    Direct { connect: (PinAddress, PinAddress) },
    /// Union two existing nets.
    Merge { merge: MergeDef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDef {
    pub into: String,
    pub from: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub templates: Vec<TemplateDef>,
    #[serde(default)]
    pub parts: Vec<PartDef>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub power_nets: Vec<String>,
    #[serde(default)]
    pub no_connect_nets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionFormat {
    Json,
    Sexp,
}

impl DescriptionFormat {
    pub fn supported_extensions() -> &'static [&'static str] {
        &["json", "sexp", "net"]
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("json") {
            Some(DescriptionFormat::Json)
        } else if ext.eq_ignore_ascii_case("sexp") || ext.eq_ignore_ascii_case("net") {
            Some(DescriptionFormat::Sexp)
        } else {
            None
        }
    }

    /// Pick the format from a path's extension.
    pub fn detect(path: &Path) -> Result<Self, DescriptionError> {
        let ext = path.extension().and_then(|e| e.to_str());
        ext.and_then(Self::from_extension).ok_or_else(|| {
            DescriptionError::UnsupportedFormat(format!(
                "no loader for .{} files (expected one of: {})",
                ext.unwrap_or("unknown"),
                Self::supported_extensions().join(", ")
            ))
        })
    }
}

impl DesignDescription {
    pub fn parse(content: &str, format: DescriptionFormat) -> Result<Self, DescriptionError> {
        match format {
            DescriptionFormat::Json => Self::from_json_str(content),
            DescriptionFormat::Sexp => Self::from_sexp_str(content),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_sexp_str(content: &str) -> Result<Self, DescriptionError> {
        let root = SExpParser::new(content).parse()?;
        if root.head() != Some("design") {
            return Err(invalid("design", "document must be a single (design ...) form"));
        }

        let mut description = DesignDescription::default();
        let mut args = root.args();
        if let Some(SExp::Atom(name)) = args.first() {
            description.name = Some(name.clone());
            args = &args[1..];
        }

        for form in args {
            let head = form
                .head()
                .ok_or_else(|| invalid("design", &format!("unexpected item {}", form)))?;
            match head {
                "template" => description.templates.push(template_form(form)?),
                "part" => description.parts.push(part_form(form)?),
                "parts" => description.parts.push(parts_form(form)?),
                "net" => {
                    let (net, rest) = split_name(form, "net")?;
                    let pins = atoms(rest, "net")?
                        .into_iter()
                        .map(PinAddress::parse)
                        .collect::<Result<Vec<_>, _>>()?;
                    description.connections.push(Connection::Net { net, pins });
                }
                "net-labels" => {
                    let (net, rest) = split_name(form, "net-labels")?;
                    let (part, labels) = match atoms(rest, "net-labels")?.split_first() {
                        Some((part, labels)) if !labels.is_empty() => (
                            part.to_string(),
                            labels.iter().map(|l| l.to_string()).collect(),
                        ),
                        _ => return Err(invalid("net-labels", "expected NET PART LABEL...")),
                    };
                    description
                        .connections
                        .push(Connection::Labels { net, part, labels });
                }
                "connect" => match atoms(form.args(), "connect")?.as_slice() {
                    [a, b] => description.connections.push(Connection::Direct {
                        connect: (PinAddress::parse(a)?, PinAddress::parse(b)?),
                    }),
                    _ => return Err(invalid("connect", "expected exactly two pin addresses")),
                },
                "merge" => match atoms(form.args(), "merge")?.as_slice() {
                    [into, from] => description.connections.push(Connection::Merge {
                        merge: MergeDef {
                            into: into.to_string(),
                            from: from.to_string(),
                        },
                    }),
                    _ => return Err(invalid("merge", "expected INTO FROM")),
                },
                "power" => description
                    .power_nets
                    .extend(atoms(form.args(), "power")?.into_iter().map(str::to_string)),
                "no-connect" => description
                    .no_connect_nets
                    .extend(atoms(form.args(), "no-connect")?.into_iter().map(str::to_string)),
                other => return Err(invalid(other, "unknown form")),
            }
        }

        Ok(description)
    }

    pub fn to_json_string(&self) -> Result<String, DescriptionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of part instances the description will create.
    pub fn instance_count(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p.naming() {
                Ok(Naming::Auto { count, .. }) => count,
                _ => 1,
            })
            .sum()
    }
}

fn invalid(form: &str, message: &str) -> DescriptionError {
    DescriptionError::InvalidForm {
        form: form.to_string(),
        message: message.to_string(),
    }
}

fn atoms<'a>(items: &'a [SExp], form: &str) -> Result<Vec<&'a str>, DescriptionError> {
    items
        .iter()
        .map(|item| {
            item.as_atom()
                .ok_or_else(|| invalid(form, &format!("expected an atom, found {}", item)))
        })
        .collect()
}

fn split_name<'a>(form: &'a SExp, name: &str) -> Result<(String, &'a [SExp]), DescriptionError> {
    match form.args().split_first() {
        Some((SExp::Atom(first), rest)) => Ok((first.clone(), rest)),
        _ => Err(invalid(name, "missing name")),
    }
}

/// Splits trailing `(value V)` off a part form.
fn value_option(items: &[SExp], form: &str) -> Result<(Vec<String>, Option<String>), DescriptionError> {
    let mut positional = Vec::new();
    let mut value = None;
    for item in items {
        match item {
            SExp::Atom(a) => positional.push(a.clone()),
            SExp::List(_) if item.head() == Some("value") => match item.args() {
                [SExp::Atom(v)] => value = Some(v.clone()),
                _ => return Err(invalid(form, "(value ...) takes one atom")),
            },
            other => return Err(invalid(form, &format!("unexpected item {}", other))),
        }
    }
    Ok((positional, value))
}

fn template_form(form: &SExp) -> Result<TemplateDef, DescriptionError> {
    let (name, rest) = split_name(form, "template")?;
    let mut footprint = None;
    let mut pins = Vec::new();

    for item in rest {
        match (item.head(), item.args()) {
            (Some("footprint"), [SExp::Atom(f)]) => footprint = Some(f.clone()),
            (Some("pin"), [SExp::Atom(designator), SExp::Atom(label), SExp::Atom(function)]) => {
                let function: PinFunction = function
                    .parse()
                    .map_err(|e: String| invalid("pin", &e))?;
                pins.push(PinSpec::new(designator.as_str(), label.as_str(), function));
            }
            (Some("pin"), _) => {
                return Err(invalid("pin", "expected DESIGNATOR LABEL FUNCTION"));
            }
            _ => return Err(invalid("template", &format!("unexpected item {}", item))),
        }
    }

    let footprint = footprint.ok_or_else(|| {
        invalid("template", &format!("template '{}' has no (footprint ...)", name))
    })?;
    Ok(TemplateDef {
        name,
        footprint,
        pins,
    })
}

fn part_form(form: &SExp) -> Result<PartDef, DescriptionError> {
    let (positional, value) = value_option(form.args(), "part")?;
    match positional.as_slice() {
        [template, reference] => Ok(PartDef {
            template: template.clone(),
            reference: Some(reference.clone()),
            prefix: None,
            count: None,
            value,
        }),
        _ => Err(invalid("part", "expected TEMPLATE REFERENCE")),
    }
}

fn parts_form(form: &SExp) -> Result<PartDef, DescriptionError> {
    let (positional, value) = value_option(form.args(), "parts")?;
    match positional.as_slice() {
        [template, prefix, count] => {
            let count = count
                .parse::<usize>()
                .map_err(|_| invalid("parts", &format!("count '{}' is not a number", count)))?;
            Ok(PartDef {
                template: template.clone(),
                reference: None,
                prefix: Some(prefix.clone()),
                count: Some(count),
                value,
            })
        }
        _ => Err(invalid("parts", "expected TEMPLATE PREFIX COUNT")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEXP_DOC: &str = r#"
; two resistors and a buffer
(design divider
  (template R (footprint Resistor_SMD:R_0402_1005Metric)
    (pin 1 ~ passive)
    (pin 2 ~ passive))
  (template BUF (footprint Package_TO_SOT_SMD:SOT-23-5)
    (pin 1 A input) (pin 2 Y output) (pin 3 VCC PWRIN) (pin 4 GND PWRIN))
  (part BUF U1)
  (part R R1 (value "4.7k"))
  (parts R R 2 (value 10k))
  (net VCC U1:3 R1:1)
  (net-labels GND U1 GND)
  (connect R1:2 U1:1)
  (merge VCC GND)
  (power VCC)
  (no-connect SPARE))
"#;

    #[test]
    fn test_sexp_description() {
        let d = DesignDescription::from_sexp_str(SEXP_DOC).unwrap();
        assert_eq!(d.name.as_deref(), Some("divider"));
        assert_eq!(d.templates.len(), 2);
        assert_eq!(d.templates[1].pins[2].function, PinFunction::PowerIn);
        assert_eq!(d.parts[1].value.as_deref(), Some("4.7k"));
        assert_eq!(
            d.parts[2].naming().unwrap(),
            Naming::Auto { prefix: "R", count: 2 }
        );
        assert_eq!(d.instance_count(), 4);
        assert_eq!(d.connections.len(), 4);
        assert!(matches!(&d.connections[1], Connection::Labels { labels, .. } if labels == &["GND"]));
        assert!(matches!(&d.connections[3], Connection::Merge { merge } if merge.from == "GND"));
        assert_eq!(d.power_nets, vec!["VCC"]);
        assert_eq!(d.no_connect_nets, vec!["SPARE"]);
    }

    #[test]
    fn test_json_description() {
        let json = r#"{
            "templates": [
                {"name": "R", "footprint": "R_0402", "pins": [
                    {"designator": "1", "label": "~", "function": "passive"},
                    {"designator": "2", "label": "~", "function": "PASSIVE"}
                ]}
            ],
            "parts": [{"template": "R", "reference": "R1", "value": "1k"}],
            "connections": [
                {"net": "A", "pins": ["R1:1"]},
                {"net": "B", "part": "R1", "labels": ["~"]},
                {"connect": ["R1:1", "R1:2"]},
                {"merge": {"into": "A", "from": "B"}}
            ]
        }"#;
        let d = DesignDescription::from_json_str(json).unwrap();
        assert!(matches!(&d.connections[0], Connection::Net { pins, .. } if pins[0].0 == PinRef::new("R1", "1")));
        assert!(matches!(&d.connections[1], Connection::Labels { .. }));
        assert!(matches!(&d.connections[2], Connection::Direct { .. }));
        assert!(matches!(&d.connections[3], Connection::Merge { merge } if merge.into == "A"));
        assert!(d.power_nets.is_empty());
    }

    #[test]
    fn test_bad_pin_address() {
        let json = r#"{"connections": [{"net": "A", "pins": ["R1-1"]}]}"#;
        assert!(matches!(
            DesignDescription::from_json_str(json),
            Err(DescriptionError::Json(_))
        ));
        let err = DesignDescription::from_sexp_str("(design (net A R1))").unwrap_err();
        assert!(matches!(err, DescriptionError::InvalidPinAddress(a) if a == "R1"));
    }

    #[test]
    fn test_malformed_sexp_forms() {
        for doc in [
            "(board)",
            "(design (template R (pin 1 ~ passive)))",
            "(design (template R (footprint F) (pin 1 ~ sideways)))",
            "(design (parts R R many))",
            "(design (connect R1:1))",
            "(design (wire R1:1 R2:1))",
        ] {
            assert!(
                matches!(
                    DesignDescription::from_sexp_str(doc),
                    Err(DescriptionError::InvalidForm { .. })
                ),
                "{} should be rejected",
                doc
            );
        }
        assert!(matches!(
            DesignDescription::from_sexp_str("(design (part R R1)"),
            Err(DescriptionError::Sexp(ParseError::UnexpectedEof))
        ));
    }

    #[test]
    fn test_part_naming_rules() {
        let both = PartDef {
            template: "R".to_string(),
            reference: Some("R1".to_string()),
            prefix: Some("R".to_string()),
            count: None,
            value: None,
        };
        assert!(both.naming().is_err());
        let neither = PartDef {
            reference: None,
            prefix: None,
            ..both.clone()
        };
        assert!(neither.naming().is_err());
        let fixed = PartDef {
            prefix: None,
            ..both
        };
        assert_eq!(fixed.naming().unwrap(), Naming::Fixed("R1"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DescriptionFormat::detect(Path::new("board.JSON")).unwrap(),
            DescriptionFormat::Json
        );
        assert_eq!(
            DescriptionFormat::detect(Path::new("board.sexp")).unwrap(),
            DescriptionFormat::Sexp
        );
        assert!(matches!(
            DescriptionFormat::detect(Path::new("board.kicad_sch")),
            Err(DescriptionError::UnsupportedFormat(_))
        ));
    }
}
