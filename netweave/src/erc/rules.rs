use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::checks::{
    DriverlessInputRule, IsolatedNetRule, OutputConflictRule, PassivePinUnconnectedRule,
    PowerPinOffRailRule, UnboundRequiredPinRule,
};
use crate::netlist::{Design, PinRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One rule-table finding, with enough location to find the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designator: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn for_net(
        rule: &dyn Rule,
        net: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: rule.severity(),
            rule: rule.id().to_string(),
            net_name: Some(net.into()),
            part_reference: None,
            designator: None,
            message: message.into(),
        }
    }

    pub fn for_pin(rule: &dyn Rule, pin: &PinRef, message: impl Into<String>) -> Self {
        Self {
            severity: rule.severity(),
            rule: rule.id().to_string(),
            net_name: None,
            part_reference: Some(pin.reference.clone()),
            designator: Some(pin.designator.clone()),
            message: message.into(),
        }
    }

    pub fn with_net(mut self, net: impl Into<String>) -> Self {
        self.net_name = Some(net.into());
        self
    }
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn severity(&self) -> Severity;
    /// Reads the closed design; never short-circuits on the first finding.
    fn check(&self, design: &Design) -> Vec<Diagnostic>;
}

pub struct RulesEngine {
    rules: Vec<Arc<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The full rule table, in table order.
    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Arc::new(DriverlessInputRule));
        engine.add_rule(Arc::new(OutputConflictRule));
        engine.add_rule(Arc::new(PowerPinOffRailRule));
        engine.add_rule(Arc::new(UnboundRequiredPinRule));
        engine.add_rule(Arc::new(IsolatedNetRule));
        engine.add_rule(Arc::new(PassivePinUnconnectedRule));
        engine
    }

    /// Default rules restricted to `ids`. Returns the first unknown id on failure.
    pub fn with_selected_rules<S: AsRef<str>>(ids: &[S]) -> Result<Self, String> {
        let all = Self::with_default_rules();
        for id in ids {
            let id = id.as_ref();
            if !all.rules.iter().any(|r| r.id() == id) {
                return Err(id.to_string());
            }
        }
        Ok(Self {
            rules: all
                .rules
                .into_iter()
                .filter(|r| ids.iter().any(|id| id.as_ref() == r.id()))
                .collect(),
        })
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Run every rule and order the findings.
    ///
    /// Net-scoped findings come first (net declaration order, then member
    /// order), pin-scoped ones after (instance order, then pin order). Ties
    /// fall back to rule order.
    pub fn analyze(&self, design: &Design) -> ErcReport {
        let mut keyed = Vec::new();
        for (rule_pos, rule) in self.rules.iter().enumerate() {
            let found = rule.check(design);
            tracing::debug!(rule = rule.id(), count = found.len(), "rule checked");
            for diagnostic in found {
                keyed.push((order_key(design, rule_pos, &diagnostic), diagnostic));
            }
        }
        keyed.sort_by_key(|(key, _)| *key);
        ErcReport {
            diagnostics: keyed.into_iter().map(|(_, d)| d).collect(),
        }
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

fn order_key(design: &Design, rule_pos: usize, d: &Diagnostic) -> (u8, usize, usize, usize) {
    let pin = match (&d.part_reference, &d.designator) {
        (Some(reference), Some(designator)) => Some(PinRef::new(reference.as_str(), designator.as_str())),
        _ => None,
    };

    if let Some(net_name) = &d.net_name {
        let net_pos = design.net_position(net_name).unwrap_or(usize::MAX);
        let member_pos = pin
            .as_ref()
            .and_then(|p| design.net(net_name).and_then(|n| n.position(p)))
            .map(|i| i + 1)
            .unwrap_or(0);
        return (0, net_pos, member_pos, rule_pos);
    }

    let (inst_pos, pin_pos) = pin
        .as_ref()
        .and_then(|p| {
            let inst_pos = design.registry().instance_position(&p.reference)?;
            let pin_pos = design.instance(&p.reference)?.pin_position(&p.designator)?;
            Some((inst_pos, pin_pos))
        })
        .unwrap_or((usize::MAX, usize::MAX));
    (1, inst_pos, pin_pos, rule_pos)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErcStats {
    pub errors: usize,
    pub warnings: usize,
}

impl ErcStats {
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

/// Ordered diagnostics from one ERC run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErcReport {
    diagnostics: Vec<Diagnostic>,
}

impl ErcReport {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }

    pub fn stats(&self) -> ErcStats {
        let mut stats = ErcStats::default();
        for d in &self.diagnostics {
            match d.severity {
                Severity::Error => stats.errors += 1,
                Severity::Warning => stats.warnings += 1,
            }
        }
        stats
    }
}
