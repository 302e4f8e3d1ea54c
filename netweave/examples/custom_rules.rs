//! Example: extending the rule table with a project-specific rule.
//! Run with: cargo run --example custom_rules [path/to/design.sexp]

use netweave::erc::{Diagnostic, Rule, RulesEngine, Severity};
use netweave::{Design, NetweaveCore};
use std::path::Path;
use std::sync::Arc;

/// Flags nets whose names are not upper case, a common house style.
struct UppercaseNetNames;

impl Rule for UppercaseNetNames {
    fn id(&self) -> &str {
        "uppercase_net_names"
    }

    fn name(&self) -> &str {
        "Upper-case net names"
    }

    fn description(&self) -> &str {
        "Net names should be upper case"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, design: &Design) -> Vec<Diagnostic> {
        design
            .nets()
            .filter(|n| n.name() != n.name().to_uppercase())
            .map(|n| Diagnostic::for_net(self, n.name(), format!("Net '{}' is not upper case", n.name())))
            .collect()
    }
}

fn main() -> Result<(), netweave::NetweaveError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/sensor_node.sexp".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example custom_rules [path/to/design.sexp]");
        std::process::exit(1);
    }

    let description = netweave::load_description(path)?;
    let design = NetweaveCore::assemble(&description)?;

    let mut engine = RulesEngine::with_default_rules();
    engine.add_rule(Arc::new(UppercaseNetNames));
    let closed = design.close_with(&engine);

    let report = closed.report();
    println!(
        "Custom check found {} finding(s) for {}",
        report.diagnostics().len(),
        path.display()
    );
    for d in report.diagnostics() {
        println!("  [{}] {}: {}", d.severity, d.rule, d.message);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
