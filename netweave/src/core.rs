//! Build pipeline shared by the CLI and library callers:
//! description -> open design -> closed design (ERC) -> artifact.

use std::path::Path;

use crate::erc::{ErcReport, ErcStats, RulesEngine};
use crate::netlist::{ClosedDesign, ConnectivityError, Design};
use crate::parser::{Connection, DescriptionError, DescriptionFormat, DesignDescription, Naming};
use crate::registry::{DefinitionError, ReferenceError};
use crate::serializer::{serialize, Artifact, SerializationError, SerializePolicy};

#[derive(Debug, thiserror::Error)]
pub enum NetweaveError {
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),
    #[error("Description error: {0}")]
    Description(#[from] DescriptionError),
    #[error("Serialization refused: {0}")]
    Serialization(#[from] SerializationError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetweaveError {
    /// True when the build stopped before ERC could run.
    pub fn is_structural(&self) -> bool {
        !matches!(self, NetweaveError::Serialization(_))
    }
}

/// Options for a build run.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    pub policy: SerializePolicy,
    /// Rule ids to run; empty means the full rule table.
    pub rules: Vec<String>,
}

impl BuildOptions {
    pub fn engine(&self) -> Result<RulesEngine, DescriptionError> {
        if self.rules.is_empty() {
            return Ok(RulesEngine::with_default_rules());
        }
        RulesEngine::with_selected_rules(&self.rules).map_err(DescriptionError::UnknownRule)
    }
}

/// A design that made it through ERC, with the artifact if the policy let it through.
#[derive(Debug)]
pub struct BuildOutcome {
    pub closed: ClosedDesign,
    pub artifact: Option<Artifact>,
    pub rejection: Option<SerializationError>,
}

impl BuildOutcome {
    pub fn report(&self) -> &ErcReport {
        self.closed.report()
    }

    pub fn stats(&self) -> ErcStats {
        self.closed.report().stats()
    }

    /// `1` when the design carries Error diagnostics or the policy refused it, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.closed.report().has_errors() || self.rejection.is_some() {
            1
        } else {
            0
        }
    }
}

/// Build API used by the CLI.
pub struct NetweaveCore;

impl NetweaveCore {
    /// Replay a description into an open design. Stops at the first structural error.
    pub fn assemble(description: &DesignDescription) -> Result<Design, NetweaveError> {
        let mut design = match &description.name {
            Some(name) => Design::with_name(name.as_str()),
            None => Design::new(),
        };

        for template in &description.templates {
            design.define_template(
                template.name.as_str(),
                template.footprint.as_str(),
                template.pins.clone(),
            )?;
        }

        for net in &description.power_nets {
            design.declare_power_net(net.as_str())?;
        }
        for net in &description.no_connect_nets {
            design.declare_no_connect_net(net.as_str())?;
        }

        for part in &description.parts {
            let handle = design
                .registry()
                .template_by_name(&part.template)
                .ok_or_else(|| ReferenceError::UnknownTemplate {
                    name: part.template.clone(),
                })?;
            match part.naming()? {
                Naming::Fixed(reference) => {
                    design.instantiate(handle, reference, part.value.clone())?;
                }
                Naming::Auto { prefix, count } => {
                    for _ in 0..count {
                        design.instantiate_auto(handle, prefix, part.value.clone())?;
                    }
                }
            }
        }

        for connection in &description.connections {
            match connection {
                Connection::Net { net, pins } => {
                    for pin in pins {
                        design.bind(net, &pin.0.reference, &pin.0.designator)?;
                    }
                }
                Connection::Labels { net, part, labels } => {
                    for label in labels {
                        design.bind_label(net, part, label)?;
                    }
                }
                Connection::Direct { connect: (a, b) } => {
                    design.connect(&a.0, &b.0)?;
                }
                Connection::Merge { merge } => {
                    design.merge_nets(&merge.into, &merge.from)?;
                }
            }
        }

        tracing::debug!(
            templates = description.templates.len(),
            parts = design.registry().instance_count(),
            nets = design.net_count(),
            "description assembled"
        );
        Ok(design)
    }

    /// Assemble, close and serialize. ERC findings never make this fail; a
    /// refused artifact is reported through [`BuildOutcome::rejection`].
    pub fn build_description(
        description: &DesignDescription,
        options: &BuildOptions,
    ) -> Result<BuildOutcome, NetweaveError> {
        let engine = options.engine()?;
        let design = Self::assemble(description)?;
        let closed = design.close_with(&engine);

        let (artifact, rejection) = match serialize(&closed, options.policy) {
            Ok(artifact) => (Some(artifact), None),
            Err(e) => (None, Some(e)),
        };

        Ok(BuildOutcome {
            closed,
            artifact,
            rejection,
        })
    }

    pub fn build_str(
        content: &str,
        format: DescriptionFormat,
        options: &BuildOptions,
    ) -> Result<BuildOutcome, NetweaveError> {
        let description = DesignDescription::parse(content, format)?;
        Self::build_description(&description, options)
    }

    /// Load a description file (format chosen by extension) and build it.
    pub fn build_file(path: &Path, options: &BuildOptions) -> Result<BuildOutcome, NetweaveError> {
        tracing::info!(path = %path.display(), "loading description");
        let description = crate::load_description(path)?;
        Self::build_description(&description, options)
    }
}
