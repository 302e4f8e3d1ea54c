//! Netweave - circuit connectivity builder and electrical rule checker
//!
//! This library turns a declarative design description (part templates,
//! instantiations, pin-to-net bindings, power-net declarations) into a
//! verified connectivity graph, runs an electrical rule check over it, and
//! emits a deterministic netlist artifact.
//!
//! # Quick Start
//!
//! ```no_run
//! use netweave::{BuildOptions, NetweaveCore};
//! use std::path::Path;
//!
//! let outcome = NetweaveCore::build_file(
//!     Path::new("board.sexp"),
//!     &BuildOptions::default(),
//! ).unwrap();
//!
//! for d in outcome.report().diagnostics() {
//!     println!("{}: {}", d.severity, d.message);
//! }
//! ```
//!
//! # Building a design in code
//!
//! ```
//! use netweave::prelude::*;
//!
//! let mut design = Design::new();
//! let r = design.define_template("R", "Resistor_SMD:R_0402_1005Metric", vec![
//!     PinSpec::new("1", "~", PinFunction::Passive),
//!     PinSpec::new("2", "~", PinFunction::Passive),
//! ]).unwrap();
//! design.instantiate(r, "R1", None).unwrap();
//! design.bind("VIN", "R1", "2").unwrap();
//!
//! let closed = design.close();
//! assert_eq!(closed.report().stats().warnings, 2);
//! let artifact = serialize(&closed, SerializePolicy::Default).unwrap();
//! assert_eq!(artifact.nets[0].name, "VIN");
//! ```
//!
//! # Features
//!
//! - **Registry**: immutable part templates, uniquely referenced instances
//! - **Net builder**: explicit binds, label binds, anonymous connects, net merges
//! - **ERC**: six-rule table, exhaustive and deterministically ordered
//! - **Serializer**: versioned JSON and S-expression netlists

pub mod core;
pub mod erc;
pub mod netlist;
pub mod parser;
pub mod registry;
pub mod serializer;

// Re-export main types
pub use core::{BuildOptions, BuildOutcome, NetweaveCore, NetweaveError};
pub use erc::{Diagnostic, ErcReport, ErcStats, Rule, RulesEngine, Severity};
pub use netlist::{ClosedDesign, ConnectivityError, ConnectivityGraph, Design, DriveClass, Net, PinRef};
pub use parser::{DescriptionError, DescriptionFormat, DesignDescription};
pub use registry::{
    DefinitionError, PartInstance, PartTemplate, PinFunction, PinSpec, ReferenceError,
    TemplateHandle,
};
pub use serializer::{serialize, Artifact, SerializationError, SerializePolicy};

/// Parse a description file (convenience wrapper).
pub fn load_description(path: &std::path::Path) -> Result<DesignDescription, NetweaveError> {
    let format = DescriptionFormat::detect(path)?;
    let content = std::fs::read_to_string(path)?;
    Ok(DesignDescription::parse(&content, format)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        serialize, BuildOptions, ClosedDesign, Design, Diagnostic, NetweaveCore, NetweaveError,
        PinFunction, PinRef, PinSpec, SerializePolicy, Severity,
    };
}
