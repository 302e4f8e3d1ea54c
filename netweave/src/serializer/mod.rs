//! Netlist Serializer
//!
//! Turns a [`ClosedDesign`] into an [`Artifact`], subject to the caller's
//! [`SerializePolicy`]. Output order is fully determined by instantiation and
//! bind order, so two identical build sequences render byte-identically.

pub mod artifact;
pub mod render;

pub use artifact::{Artifact, NetRecord, PartRecord, FORMAT_VERSION};
pub use render::{to_json, to_sexp};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::netlist::ClosedDesign;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Design has {errors} unresolved ERC error(s); pass the error override to serialize anyway")]
    UnresolvedErrors { errors: usize },
    #[error("Strict mode: design has {warnings} ERC warning(s)")]
    StrictWarnings { warnings: usize },
    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Which diagnostics block serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializePolicy {
    /// Errors block, warnings ride along.
    #[default]
    Default,
    /// Errors and warnings block.
    Strict,
    /// Nothing blocks; the artifact still carries every diagnostic.
    AllowErrors,
}

impl SerializePolicy {
    /// The precondition failure for `closed` under this policy, if any.
    pub fn check(&self, closed: &ClosedDesign) -> Result<(), SerializationError> {
        let stats = closed.report().stats();
        match self {
            SerializePolicy::AllowErrors => Ok(()),
            _ if stats.errors > 0 => Err(SerializationError::UnresolvedErrors {
                errors: stats.errors,
            }),
            SerializePolicy::Strict if stats.warnings > 0 => {
                Err(SerializationError::StrictWarnings {
                    warnings: stats.warnings,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Produce the artifact for a closed design.
pub fn serialize(
    closed: &ClosedDesign,
    policy: SerializePolicy,
) -> Result<Artifact, SerializationError> {
    if let Err(e) = policy.check(closed) {
        tracing::warn!(policy = ?policy, error = %e, "serialization refused");
        return Err(e);
    }

    let artifact = Artifact::collect(closed.design(), closed.report().diagnostics());
    tracing::info!(
        parts = artifact.parts.len(),
        nets = artifact.nets.len(),
        diagnostics = artifact.diagnostics.len(),
        "artifact serialized"
    );
    Ok(artifact)
}
