//! The design being built and the net builder operations on it.

use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};

use super::net::{DriveClass, Net, PinRef};
use super::ConnectivityError;
use crate::erc::{ErcReport, RulesEngine};
use crate::registry::{
    DefinitionError, PartInstance, PinFunction, PinSpec, ReferenceError, Registry, TemplateHandle,
};

/// An open design: parts may be instantiated and pins bound.
///
/// The design owns every instance and net. Nets refer to pins by
/// `(reference, designator)`; the reverse lookup lives in `bindings` so that
/// instances never hold a pointer back to a net.
#[derive(Debug, Default)]
pub struct Design {
    name: Option<String>,
    registry: Registry,
    nets: IndexMap<String, Net>,
    bindings: HashMap<PinRef, String>,
    power_nets: IndexSet<String>,
    no_connect_nets: IndexSet<String>,
    // nets created by `connect`; explicit binds may not name them
    anonymous_nets: HashSet<String>,
    anonymous_counter: usize,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ---------------------------------------------------------------------
    // Registry delegation
    // ---------------------------------------------------------------------

    pub fn define_template(
        &mut self,
        name: impl Into<String>,
        footprint_id: impl Into<String>,
        pins: Vec<PinSpec>,
    ) -> Result<TemplateHandle, DefinitionError> {
        self.registry.define_template(name, footprint_id, pins)
    }

    pub fn instantiate(
        &mut self,
        template: TemplateHandle,
        reference: impl Into<String>,
        value: Option<String>,
    ) -> Result<&PartInstance, ReferenceError> {
        self.registry.instantiate(template, reference, value)
    }

    pub fn instantiate_auto(
        &mut self,
        template: TemplateHandle,
        prefix: &str,
        value: Option<String>,
    ) -> Result<&PartInstance, ReferenceError> {
        self.registry.instantiate_auto(template, prefix, value)
    }

    pub fn instance(&self, reference: &str) -> Option<&PartInstance> {
        self.registry.instance(reference)
    }

    pub fn instances(&self) -> impl Iterator<Item = &PartInstance> {
        self.registry.instances()
    }

    // ---------------------------------------------------------------------
    // Net declarations
    // ---------------------------------------------------------------------

    /// Mark `net` as a power net. Power classification is never inferred.
    pub fn declare_power_net(&mut self, net: impl Into<String>) -> Result<(), DefinitionError> {
        let net = net.into();
        if self.no_connect_nets.contains(&net) {
            return Err(DefinitionError::ConflictingNetClass { net });
        }
        self.power_nets.insert(net);
        Ok(())
    }

    /// Mark `net` as intentionally unconnected.
    pub fn declare_no_connect_net(&mut self, net: impl Into<String>) -> Result<(), DefinitionError> {
        let net = net.into();
        if self.power_nets.contains(&net) {
            return Err(DefinitionError::ConflictingNetClass { net });
        }
        self.no_connect_nets.insert(net);
        Ok(())
    }

    pub fn is_declared_power(&self, net: &str) -> bool {
        self.power_nets.contains(net)
    }

    pub fn is_declared_no_connect(&self, net: &str) -> bool {
        self.no_connect_nets.contains(net)
    }

    // ---------------------------------------------------------------------
    // Net builder
    // ---------------------------------------------------------------------

    /// Bind `(part_ref, designator)` to the net named `net_name`, creating the
    /// net on first use. Rebinding a pin to the net it is already on is a no-op.
    pub fn bind(
        &mut self,
        net_name: &str,
        part_ref: &str,
        designator: &str,
    ) -> Result<(), ConnectivityError> {
        self.check_net_name(net_name)?;
        let pin = self.resolve_bindable(part_ref, designator)?;
        if !self.check_unbound_or_on(&pin, net_name)? {
            tracing::trace!(pin = %pin, net = net_name, "pin already on net");
            return Ok(());
        }

        tracing::debug!(pin = %pin, net = net_name, "bind");
        self.attach(net_name, pin);
        Ok(())
    }

    /// Bind every pin of `part_ref` labelled `label`, in pin declaration order.
    ///
    /// All-or-nothing: if any labelled pin cannot join `net_name`, nothing is bound.
    pub fn bind_label(
        &mut self,
        net_name: &str,
        part_ref: &str,
        label: &str,
    ) -> Result<usize, ConnectivityError> {
        self.check_net_name(net_name)?;
        let instance = self
            .registry
            .instance(part_ref)
            .ok_or_else(|| ConnectivityError::UnknownPart {
                reference: part_ref.to_string(),
            })?;
        let designators: Vec<String> = instance
            .pins_labelled(label)
            .map(|p| p.designator.clone())
            .collect();

        if designators.is_empty() {
            return Err(ConnectivityError::UnknownLabel {
                reference: part_ref.to_string(),
                label: label.to_string(),
            });
        }

        let mut pending = Vec::with_capacity(designators.len());
        for designator in &designators {
            let pin = self.resolve_bindable(part_ref, designator)?;
            if self.check_unbound_or_on(&pin, net_name)? {
                pending.push(pin);
            }
        }

        tracing::debug!(
            part = part_ref,
            label,
            net = net_name,
            pins = pending.len(),
            "bind label"
        );
        for pin in pending {
            self.attach(net_name, pin);
        }
        Ok(designators.len())
    }

    /// Join two pins without naming the net.
    ///
    /// Returns the name of the net both pins end up on. A fresh `N$<k>` net is
    /// created when neither pin is bound yet.
    pub fn connect(&mut self, a: &PinRef, b: &PinRef) -> Result<String, ConnectivityError> {
        let a = self.resolve_bindable(&a.reference, &a.designator)?;
        let b = self.resolve_bindable(&b.reference, &b.designator)?;

        let net_a = self.bindings.get(&a).cloned();
        let net_b = self.bindings.get(&b).cloned();

        match (net_a, net_b) {
            (Some(na), Some(nb)) if na == nb => Ok(na),
            (Some(na), Some(nb)) => Err(ConnectivityError::PinAlreadyBound {
                reference: b.reference,
                designator: b.designator,
                bound_to: nb,
                requested: na,
            }),
            (Some(na), None) => {
                self.attach(&na, b);
                Ok(na)
            }
            (None, Some(nb)) => {
                self.attach(&nb, a);
                Ok(nb)
            }
            (None, None) => {
                let name = self.next_anonymous_name();
                tracing::debug!(net = %name, a = %a, b = %b, "connect");
                self.attach(&name, a);
                self.attach(&name, b);
                Ok(name)
            }
        }
    }

    /// Explicit union: every pin of `from` moves to the end of `into`, and
    /// `from` ceases to exist. Declarations on `from` carry over.
    pub fn merge_nets(&mut self, into: &str, from: &str) -> Result<(), ConnectivityError> {
        if !self.nets.contains_key(into) {
            return Err(ConnectivityError::UnknownNet {
                net: into.to_string(),
            });
        }
        if !self.nets.contains_key(from) {
            return Err(ConnectivityError::UnknownNet {
                net: from.to_string(),
            });
        }
        if into == from {
            return Ok(());
        }

        let power = self.power_nets.contains(into) || self.power_nets.contains(from);
        let no_connect = self.no_connect_nets.contains(into) || self.no_connect_nets.contains(from);
        if power && no_connect {
            return Err(ConnectivityError::ConflictingMerge {
                into: into.to_string(),
                from: from.to_string(),
            });
        }

        let moved = match self.nets.shift_remove(from) {
            Some(mut net) => net.drain(),
            None => Vec::new(),
        };
        self.anonymous_nets.remove(from);
        tracing::debug!(into, from, pins = moved.len(), "merge nets");
        for pin in moved {
            self.attach(into, pin);
        }

        if self.power_nets.shift_remove(from) {
            self.power_nets.insert(into.to_string());
        }
        if self.no_connect_nets.shift_remove(from) {
            self.no_connect_nets.insert(into.to_string());
        }
        Ok(())
    }

    fn check_net_name(&self, net_name: &str) -> Result<(), ConnectivityError> {
        if net_name.is_empty() {
            return Err(ConnectivityError::EmptyNetName);
        }
        if self.anonymous_nets.contains(net_name) {
            return Err(ConnectivityError::AnonymousNet {
                net: net_name.to_string(),
            });
        }
        Ok(())
    }

    /// `Ok(true)` if `pin` is free, `Ok(false)` if it is already on `net_name`.
    fn check_unbound_or_on(&self, pin: &PinRef, net_name: &str) -> Result<bool, ConnectivityError> {
        match self.bindings.get(pin) {
            None => Ok(true),
            Some(existing) if existing == net_name => Ok(false),
            Some(existing) => Err(ConnectivityError::PinAlreadyBound {
                reference: pin.reference.clone(),
                designator: pin.designator.clone(),
                bound_to: existing.clone(),
                requested: net_name.to_string(),
            }),
        }
    }

    fn resolve_bindable(&self, part_ref: &str, designator: &str) -> Result<PinRef, ConnectivityError> {
        let spec = self
            .registry
            .instance(part_ref)
            .and_then(|inst| inst.pin(designator))
            .ok_or_else(|| ConnectivityError::UnknownPin {
                reference: part_ref.to_string(),
                designator: designator.to_string(),
            })?;

        if spec.function == PinFunction::NoConnect {
            return Err(ConnectivityError::InvalidBinding {
                reference: part_ref.to_string(),
                designator: designator.to_string(),
            });
        }
        Ok(PinRef::new(part_ref, designator))
    }

    fn attach(&mut self, net_name: &str, pin: PinRef) {
        self.nets
            .entry(net_name.to_string())
            .or_insert_with(|| Net::new(net_name))
            .push(pin.clone());
        self.bindings.insert(pin, net_name.to_string());
    }

    fn next_anonymous_name(&mut self) -> String {
        loop {
            self.anonymous_counter += 1;
            let candidate = format!("N${}", self.anonymous_counter);
            if !self.nets.contains_key(&candidate) {
                self.anonymous_nets.insert(candidate.clone());
                return candidate;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Nets in declaration (first bind) order.
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    pub fn net(&self, name: &str) -> Option<&Net> {
        self.nets.get(name)
    }

    pub fn net_position(&self, name: &str) -> Option<usize> {
        self.nets.get_index_of(name)
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// The net `pin` is bound to, if any.
    pub fn net_of(&self, pin: &PinRef) -> Option<&Net> {
        self.bindings.get(pin).and_then(|name| self.nets.get(name))
    }

    pub fn is_bound(&self, pin: &PinRef) -> bool {
        self.bindings.contains_key(pin)
    }

    pub fn pin_spec(&self, pin: &PinRef) -> Option<&PinSpec> {
        self.registry
            .instance(&pin.reference)
            .and_then(|inst| inst.pin(&pin.designator))
    }

    pub fn pin_function(&self, pin: &PinRef) -> Option<PinFunction> {
        self.pin_spec(pin).map(|spec| spec.function)
    }

    /// Functions of every member pin, in member order.
    pub fn member_functions(&self, net: &Net) -> Vec<PinFunction> {
        net.pins().filter_map(|p| self.pin_function(p)).collect()
    }

    /// Drive classification, computed on demand.
    ///
    /// `Power` needs both an explicit declaration and at least one power pin
    /// on the net; a declared net carrying only signal pins stays `Signal`.
    pub fn drive_class(&self, net: &Net) -> DriveClass {
        if self.no_connect_nets.contains(net.name()) {
            return DriveClass::NoConnect;
        }
        if self.power_nets.contains(net.name())
            && net
                .pins()
                .filter_map(|p| self.pin_function(p))
                .any(PinFunction::is_power)
        {
            return DriveClass::Power;
        }
        DriveClass::Signal
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Close the design and run the default rule set over it.
    pub fn close(self) -> ClosedDesign {
        self.close_with(&RulesEngine::with_default_rules())
    }

    /// Close the design and run `engine` over it. No further mutation is possible.
    pub fn close_with(self, engine: &RulesEngine) -> ClosedDesign {
        tracing::info!(
            parts = self.registry.instance_count(),
            nets = self.nets.len(),
            "design closed"
        );
        let report = engine.analyze(&self);
        let stats = report.stats();
        tracing::info!(errors = stats.errors, warnings = stats.warnings, "ERC finished");
        if stats.warnings > 0 {
            tracing::warn!(count = stats.warnings, "ERC reported warnings");
        }
        ClosedDesign {
            design: self,
            report,
        }
    }
}

/// A design after ERC: immutable, carrying its diagnostics.
#[derive(Debug)]
pub struct ClosedDesign {
    design: Design,
    report: ErcReport,
}

impl ClosedDesign {
    pub fn design(&self) -> &Design {
        &self.design
    }

    pub fn report(&self) -> &ErcReport {
        &self.report
    }

    /// Any Error-severity diagnostic rejects the design for plain serialization.
    pub fn is_rejected(&self) -> bool {
        self.report.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design_with_parts() -> Design {
        let mut design = Design::new();
        let r = design
            .define_template(
                "R",
                "Resistor_SMD:R_0402_1005Metric",
                vec![
                    PinSpec::new("1", "~", PinFunction::Passive),
                    PinSpec::new("2", "~", PinFunction::Passive),
                ],
            )
            .unwrap();
        let ic = design
            .define_template(
                "IC",
                "Package_QFN:QFN-16",
                vec![
                    PinSpec::new("1", "VDD", PinFunction::PowerIn),
                    PinSpec::new("2", "VSS", PinFunction::PowerIn),
                    PinSpec::new("3", "VSS", PinFunction::PowerIn),
                    PinSpec::new("4", "OUT", PinFunction::Output),
                    PinSpec::new("5", "NC", PinFunction::NoConnect),
                ],
            )
            .unwrap();
        design.instantiate(r, "R1", None).unwrap();
        design.instantiate(r, "R2", None).unwrap();
        design.instantiate(ic, "U1", None).unwrap();
        design
    }

    #[test]
    fn test_bind_creates_net_in_order() {
        let mut design = design_with_parts();
        design.bind("B", "R1", "1").unwrap();
        design.bind("A", "R2", "1").unwrap();
        design.bind("B", "R2", "2").unwrap();

        let names: Vec<_> = design.nets().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["B", "A"]);
        let members: Vec<_> = design.net("B").unwrap().pins().map(|p| p.to_string()).collect();
        assert_eq!(members, vec!["R1:1", "R2:2"]);
    }

    #[test]
    fn test_bind_unknown_pin() {
        let mut design = design_with_parts();
        let err = design.bind("X", "R9", "1").unwrap_err();
        assert!(matches!(err, ConnectivityError::UnknownPin { .. }));
        let err = design.bind("X", "R1", "3").unwrap_err();
        assert!(matches!(err, ConnectivityError::UnknownPin { .. }));
        assert_eq!(design.net_count(), 0);
    }

    #[test]
    fn test_rebind_same_net_is_noop() {
        let mut design = design_with_parts();
        design.bind("N1", "R1", "1").unwrap();
        design.bind("N1", "R1", "1").unwrap();
        assert_eq!(design.net("N1").unwrap().len(), 1);
    }

    #[test]
    fn test_double_bind_rejected() {
        let mut design = design_with_parts();
        design.bind("N1", "R1", "1").unwrap();
        let err = design.bind("N2", "R1", "1").unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::PinAlreadyBound {
                reference: "R1".to_string(),
                designator: "1".to_string(),
                bound_to: "N1".to_string(),
                requested: "N2".to_string(),
            }
        );
        assert!(design.net("N2").is_none());
    }

    #[test]
    fn test_no_connect_pin_never_binds() {
        let mut design = design_with_parts();
        let err = design.bind("N1", "U1", "5").unwrap_err();
        assert!(matches!(err, ConnectivityError::InvalidBinding { .. }));
    }

    #[test]
    fn test_bind_label_binds_all_matching_pins() {
        let mut design = design_with_parts();
        let count = design.bind_label("GND", "U1", "VSS").unwrap();
        assert_eq!(count, 2);
        let members: Vec<_> = design.net("GND").unwrap().pins().map(|p| p.to_string()).collect();
        assert_eq!(members, vec!["U1:2", "U1:3"]);

        let err = design.bind_label("GND", "U1", "VBAT").unwrap_err();
        assert!(matches!(err, ConnectivityError::UnknownLabel { .. }));
        let err = design.bind_label("GND", "U9", "VSS").unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::UnknownPart {
                reference: "U9".to_string()
            }
        );
    }

    #[test]
    fn test_failed_bind_label_binds_nothing() {
        let mut design = design_with_parts();
        design.bind("OTHER", "U1", "3").unwrap();

        let err = design.bind_label("GND", "U1", "VSS").unwrap_err();
        assert!(matches!(
            err,
            ConnectivityError::PinAlreadyBound { ref designator, .. } if designator == "3"
        ));
        assert!(design.net("GND").is_none());
        assert!(!design.is_bound(&PinRef::new("U1", "2")));
    }

    #[test]
    fn test_bind_label_partially_on_net() {
        let mut design = design_with_parts();
        design.bind("GND", "U1", "3").unwrap();
        assert_eq!(design.bind_label("GND", "U1", "VSS").unwrap(), 2);
        let members: Vec<_> = design.net("GND").unwrap().pins().map(|p| p.to_string()).collect();
        assert_eq!(members, vec!["U1:3", "U1:2"]);
    }

    #[test]
    fn test_empty_net_name_rejected() {
        let mut design = design_with_parts();
        assert_eq!(design.bind("", "R1", "1").unwrap_err(), ConnectivityError::EmptyNetName);
        assert_eq!(
            design.bind_label("", "U1", "VSS").unwrap_err(),
            ConnectivityError::EmptyNetName
        );
        assert_eq!(design.net_count(), 0);
    }

    #[test]
    fn test_connect_creates_anonymous_net() {
        let mut design = design_with_parts();
        let name = design
            .connect(&PinRef::new("R1", "2"), &PinRef::new("R2", "1"))
            .unwrap();
        assert_eq!(name, "N$1");

        let joined = design
            .connect(&PinRef::new("R2", "1"), &PinRef::new("U1", "4"))
            .unwrap();
        assert_eq!(joined, "N$1");
        assert_eq!(design.net("N$1").unwrap().len(), 3);
    }

    #[test]
    fn test_explicit_bind_cannot_name_anonymous_net() {
        let mut design = design_with_parts();
        design
            .connect(&PinRef::new("R1", "1"), &PinRef::new("R2", "1"))
            .unwrap();
        let err = design.bind("N$1", "U1", "4").unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::AnonymousNet {
                net: "N$1".to_string()
            }
        );
        assert_eq!(design.net("N$1").unwrap().len(), 2);

        // named before any connect: an ordinary net, and connect skips the name
        let mut design = design_with_parts();
        design.bind("N$1", "U1", "4").unwrap();
        design.bind("N$1", "U1", "1").unwrap();
        let name = design
            .connect(&PinRef::new("R1", "1"), &PinRef::new("R2", "1"))
            .unwrap();
        assert_eq!(name, "N$2");
    }

    #[test]
    fn test_connect_conflicting_nets() {
        let mut design = design_with_parts();
        design.bind("A", "R1", "1").unwrap();
        design.bind("B", "R2", "1").unwrap();
        let err = design
            .connect(&PinRef::new("R1", "1"), &PinRef::new("R2", "1"))
            .unwrap_err();
        assert!(matches!(err, ConnectivityError::PinAlreadyBound { .. }));
    }

    #[test]
    fn test_merge_nets_moves_members_and_flags() {
        let mut design = design_with_parts();
        design.bind("GND", "U1", "2").unwrap();
        design.bind("AGND", "R1", "2").unwrap();
        design.declare_power_net("AGND").unwrap();

        design.merge_nets("GND", "AGND").unwrap();
        assert!(design.net("AGND").is_none());
        let gnd = design.net("GND").unwrap();
        assert_eq!(gnd.len(), 2);
        assert_eq!(design.net_of(&PinRef::new("R1", "2")).map(|n| n.name()), Some("GND"));
        assert!(design.is_declared_power("GND"));
        assert_eq!(design.drive_class(gnd), DriveClass::Power);
    }

    #[test]
    fn test_merge_unknown_net() {
        let mut design = design_with_parts();
        design.bind("GND", "U1", "2").unwrap();
        let err = design.merge_nets("GND", "NOPE").unwrap_err();
        assert!(matches!(err, ConnectivityError::UnknownNet { .. }));
    }

    #[test]
    fn test_merge_power_into_no_connect_rejected() {
        let mut design = design_with_parts();
        design.bind("VDD", "U1", "1").unwrap();
        design.bind("SPARE", "R1", "1").unwrap();
        design.declare_power_net("VDD").unwrap();
        design.declare_no_connect_net("SPARE").unwrap();

        let err = design.merge_nets("SPARE", "VDD").unwrap_err();
        assert_eq!(
            err,
            ConnectivityError::ConflictingMerge {
                into: "SPARE".to_string(),
                from: "VDD".to_string(),
            }
        );
        assert_eq!(design.net("VDD").unwrap().len(), 1);
        assert_eq!(design.net("SPARE").unwrap().len(), 1);
    }

    #[test]
    fn test_merged_anonymous_net_name_is_released() {
        let mut design = design_with_parts();
        design
            .connect(&PinRef::new("R1", "1"), &PinRef::new("R2", "1"))
            .unwrap();
        design.bind("OUT", "U1", "4").unwrap();
        design.merge_nets("OUT", "N$1").unwrap();
        assert_eq!(design.net("OUT").unwrap().len(), 3);

        design.bind("N$1", "R1", "2").unwrap();
        assert_eq!(design.net("N$1").unwrap().len(), 1);
    }

    #[test]
    fn test_drive_class_requires_declaration_and_power_pin() {
        let mut design = design_with_parts();
        design.bind("VCC", "U1", "1").unwrap();
        design.bind("SIG", "R1", "1").unwrap();
        design.declare_power_net("SIG").unwrap();

        assert_eq!(design.drive_class(design.net("VCC").unwrap()), DriveClass::Signal);
        assert_eq!(design.drive_class(design.net("SIG").unwrap()), DriveClass::Signal);

        design.declare_power_net("VCC").unwrap();
        assert_eq!(design.drive_class(design.net("VCC").unwrap()), DriveClass::Power);
    }

    #[test]
    fn test_conflicting_declarations() {
        let mut design = design_with_parts();
        design.declare_power_net("X").unwrap();
        let err = design.declare_no_connect_net("X").unwrap_err();
        assert!(matches!(err, DefinitionError::ConflictingNetClass { .. }));
    }
}
