//! Electrical Rule Checker
//!
//! Runs the rule table over a closed design. Every rule runs independently
//! and reads the design only; findings are collected into one ordered
//! [`ErcReport`] instead of failing on the first one.
//!
//! | Rule | Severity |
//! |---|---|
//! | `driverless_input` | Error |
//! | `output_conflict` | Error |
//! | `power_pin_off_rail` | Error |
//! | `unbound_required_pin` | Error |
//! | `isolated_net` | Warning |
//! | `passive_pin_unconnected` | Warning |

pub mod checks;
pub mod rules;

pub use rules::{Diagnostic, ErcReport, ErcStats, Rule, RulesEngine, Severity};
