// Rule implementations

use super::rules::{Diagnostic, Rule, Severity};
use crate::netlist::{Design, DriveClass, Net, PinRef};
use crate::registry::PinFunction;

fn pin_list<'a>(design: &Design, net: &'a Net, pred: impl Fn(PinFunction) -> bool) -> Vec<&'a PinRef> {
    net.pins()
        .filter(|p| design.pin_function(p).map(&pred).unwrap_or(false))
        .collect()
}

fn join(pins: &[&PinRef]) -> String {
    pins.iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Nets declared no-connect are exempt from the net-level drive rules.
fn is_checked_net(design: &Design, net: &Net) -> bool {
    design.drive_class(net) != DriveClass::NoConnect
}

pub struct DriverlessInputRule;

impl Rule for DriverlessInputRule {
    fn id(&self) -> &str {
        "driverless_input"
    }

    fn name(&self) -> &str {
        "Driverless input"
    }

    fn description(&self) -> &str {
        "Net has input or bidirectional pins but nothing that drives it (output, bidirectional or power output)"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for net in design.nets().filter(|n| is_checked_net(design, n)) {
            let functions = design.member_functions(net);
            let has_receiver = functions.iter().any(|f| f.is_receiver());
            let has_driver = functions.iter().any(|f| f.is_driver());
            if has_receiver && !has_driver {
                let inputs = pin_list(design, net, PinFunction::is_receiver);
                diagnostics.push(Diagnostic::for_net(
                    self,
                    net.name(),
                    format!(
                        "Net '{}' has input pin(s) {} but no driver",
                        net.name(),
                        join(&inputs)
                    ),
                ));
            }
        }
        diagnostics
    }
}

pub struct OutputConflictRule;

impl Rule for OutputConflictRule {
    fn id(&self) -> &str {
        "output_conflict"
    }

    fn name(&self) -> &str {
        "Output conflict"
    }

    fn description(&self) -> &str {
        "Two or more push-pull output pins drive the same net"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for net in design.nets().filter(|n| is_checked_net(design, n)) {
            let outputs = pin_list(design, net, |f| f == PinFunction::Output);
            if outputs.len() >= 2 {
                diagnostics.push(Diagnostic::for_net(
                    self,
                    net.name(),
                    format!(
                        "Net '{}' is driven by {} output pins: {}",
                        net.name(),
                        outputs.len(),
                        join(&outputs)
                    ),
                ));
            }
        }
        diagnostics
    }
}

pub struct PowerPinOffRailRule;

impl Rule for PowerPinOffRailRule {
    fn id(&self) -> &str {
        "power_pin_off_rail"
    }

    fn name(&self) -> &str {
        "Power pin off-rail"
    }

    fn description(&self) -> &str {
        "A power input pin sits on a net that is not declared as a power net"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for net in design.nets() {
            let class = design.drive_class(net);
            if class == DriveClass::Power {
                continue;
            }
            for pin in pin_list(design, net, |f| f == PinFunction::PowerIn) {
                diagnostics.push(
                    Diagnostic::for_pin(
                        self,
                        pin,
                        format!(
                            "Power input {} is on net '{}' which is classified {}, not power",
                            pin,
                            net.name(),
                            class
                        ),
                    )
                    .with_net(net.name()),
                );
            }
        }
        diagnostics
    }
}

pub struct UnboundRequiredPinRule;

impl Rule for UnboundRequiredPinRule {
    fn id(&self) -> &str {
        "unbound_required_pin"
    }

    fn name(&self) -> &str {
        "Unbound required pin"
    }

    fn description(&self) -> &str {
        "A pin that is neither passive nor no-connect is not on any net"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for part in design.instances() {
            for spec in part.pins().iter().filter(|p| p.function.is_required()) {
                let pin = PinRef::new(part.reference(), spec.designator.as_str());
                if !design.is_bound(&pin) {
                    diagnostics.push(Diagnostic::for_pin(
                        self,
                        &pin,
                        format!(
                            "{} pin {} ({}) is not connected to any net",
                            spec.function, pin, spec.label
                        ),
                    ));
                }
            }
        }
        diagnostics
    }
}

pub struct IsolatedNetRule;

impl Rule for IsolatedNetRule {
    fn id(&self) -> &str {
        "isolated_net"
    }

    fn name(&self) -> &str {
        "Isolated net"
    }

    fn description(&self) -> &str {
        "Net has exactly one member pin"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        design
            .nets()
            .filter(|n| n.len() == 1 && is_checked_net(design, n))
            .map(|net| {
                let only = net.pins().map(|p| p.to_string()).collect::<Vec<_>>().join("");
                Diagnostic::for_net(
                    self,
                    net.name(),
                    format!("Net '{}' connects only one pin ({})", net.name(), only),
                )
            })
            .collect()
    }
}

pub struct PassivePinUnconnectedRule;

impl Rule for PassivePinUnconnectedRule {
    fn id(&self) -> &str {
        "passive_pin_unconnected"
    }

    fn name(&self) -> &str {
        "Passive pin unconnected"
    }

    fn description(&self) -> &str {
        "A passive pin is not on any net"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for part in design.instances() {
            for spec in part
                .pins()
                .iter()
                .filter(|p| p.function == PinFunction::Passive)
            {
                let pin = PinRef::new(part.reference(), spec.designator.as_str());
                if !design.is_bound(&pin) {
                    diagnostics.push(Diagnostic::for_pin(
                        self,
                        &pin,
                        format!("Passive pin {} is not connected to any net", pin),
                    ));
                }
            }
        }
        diagnostics
    }
}
