//! Net Builder
//!
//! Assembles the connectivity graph of a [`Design`]: named nets made of
//! `(reference, designator)` pin references. Every pin belongs to at most one
//! net; a second, different net for the same pin is an error rather than a
//! silent merge.

pub mod design;
pub mod graph;
pub mod net;

pub use design::{ClosedDesign, Design};
pub use graph::ConnectivityGraph;
pub use net::{DriveClass, Net, PinRef};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectivityError {
    #[error("Unknown pin {reference}:{designator}")]
    UnknownPin { reference: String, designator: String },
    #[error("Unknown part '{reference}'")]
    UnknownPart { reference: String },
    #[error("Part '{reference}' has no pin labelled '{label}'")]
    UnknownLabel { reference: String, label: String },
    #[error("Pin {reference}:{designator} is already on net '{bound_to}', cannot bind it to '{requested}'")]
    PinAlreadyBound {
        reference: String,
        designator: String,
        bound_to: String,
        requested: String,
    },
    #[error("Pin {reference}:{designator} is a no-connect pin and cannot join a net")]
    InvalidBinding { reference: String, designator: String },
    #[error("Unknown net '{net}'")]
    UnknownNet { net: String },
    #[error("Cannot merge net '{from}' into '{into}': power and no-connect declarations conflict")]
    ConflictingMerge { into: String, from: String },
    #[error("Net name must not be empty")]
    EmptyNetName,
    #[error("Net '{net}' was created by connect and cannot be bound by name")]
    AnonymousNet { net: String },
}
