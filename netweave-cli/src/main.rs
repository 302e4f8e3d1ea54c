//! Netweave CLI - build and check circuit netlists from the command line.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use netweave::serializer::{to_json, to_sexp};
use netweave::{
    Artifact, BuildOptions, BuildOutcome, ConnectivityGraph, Diagnostic, NetweaveCore,
    RulesEngine, SerializePolicy,
};
use std::path::{Path, PathBuf};
use std::process;

/// Exit code for descriptions that fail before ERC can run.
const EXIT_MALFORMED: i32 = 2;

#[derive(Parser)]
#[command(name = "netweave")]
#[command(about = "Circuit connectivity builder and electrical rule checker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a design description into a netlist artifact
    Build {
        /// Path to a .json or .sexp design description
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Refuse to emit the artifact when ERC reports warnings
        #[arg(long, conflicts_with = "allow_errors")]
        strict: bool,

        /// Emit the artifact even when ERC reports errors (exit code stays 1)
        #[arg(long)]
        allow_errors: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Write the artifact to FILE instead of stdout (JSON when --format is human)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Only run the given rule (repeatable)
        #[arg(long = "rule", value_name = "ID")]
        rules: Vec<String>,

        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = ArgAction::Count)]
        verbose: u8,
    },

    /// List available ERC rules
    Rules {
        /// Show detailed rule descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable report
    Human,
    /// JSON artifact
    Json,
    /// S-expression netlist
    Sexp,
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Build {
            path,
            strict,
            allow_errors,
            format,
            output,
            rules,
            verbose,
        } => {
            init_tracing(verbose);
            let policy = if strict {
                SerializePolicy::Strict
            } else if allow_errors {
                SerializePolicy::AllowErrors
            } else {
                SerializePolicy::Default
            };
            handle_build(&path, BuildOptions { policy, rules }, format, output.as_deref())
        }
        Commands::Rules { verbose } => {
            handle_rules(verbose);
            0
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_build(
    path: &Path,
    options: BuildOptions,
    format: OutputFormat,
    output: Option<&Path>,
) -> i32 {
    tracing::debug!(?options, "build options");
    let outcome = match NetweaveCore::build_file(path, &options) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return if e.is_structural() { EXIT_MALFORMED } else { 1 };
        }
    };

    if let Err(e) = emit(path, &outcome, format, output) {
        eprintln!("Error: {:#}", e);
        return 1;
    }
    if let Some(rejection) = &outcome.rejection {
        eprintln!("Error: {}", rejection);
    }
    outcome.exit_code()
}

fn emit(
    path: &Path,
    outcome: &BuildOutcome,
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if let OutputFormat::Human = format {
        output_human(path, outcome, output);
    } else {
        for d in outcome.report().diagnostics() {
            eprintln!("{}", diagnostic_line(d));
        }
    }

    let Some(artifact) = &outcome.artifact else {
        return Ok(());
    };
    let rendered = render(artifact, format)?;
    match (format, output) {
        (_, Some(file)) => std::fs::write(file, rendered)
            .with_context(|| format!("failed to write {}", file.display()))?,
        (OutputFormat::Human, None) => {}
        (_, None) => print!("{}", rendered),
    }
    Ok(())
}

fn render(artifact: &Artifact, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Sexp => Ok(to_sexp(artifact)),
        OutputFormat::Json | OutputFormat::Human => {
            to_json(artifact).context("failed to render artifact")
        }
    }
}

fn diagnostic_line(d: &Diagnostic) -> String {
    let mut location = Vec::new();
    if let Some(net) = &d.net_name {
        location.push(format!("net {}", net));
    }
    if let (Some(reference), Some(designator)) = (&d.part_reference, &d.designator) {
        location.push(format!("pin {}:{}", reference, designator));
    }
    format!("{}[{}] {} ({})", d.severity, d.rule, d.message, location.join(", "))
}

fn output_human(path: &Path, outcome: &BuildOutcome, output: Option<&Path>) {
    let design = outcome.closed.design();
    let title = design
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    println!("\nDesign: {}", title);
    println!("{}", "─".repeat(60));

    let islands = ConnectivityGraph::from_design(design).islands().len();
    println!(
        "  Parts: {}  Nets: {}  Islands: {}",
        design.registry().instance_count(),
        design.net_count(),
        islands
    );

    let report = outcome.report();
    if report.is_empty() {
        println!("\n  No ERC findings");
    }

    let errors: Vec<_> = report.errors().collect();
    let warnings: Vec<_> = report.warnings().collect();
    for (title, group) in [("ERRORS", errors), ("WARNINGS", warnings)] {
        if group.is_empty() {
            continue;
        }
        println!("\n  {}:", title);
        for d in group {
            println!("    - [{}] {}", d.rule, d.message);
            if let Some(ref net) = d.net_name {
                println!("      Net: {}", net);
            }
            if let (Some(reference), Some(designator)) = (&d.part_reference, &d.designator) {
                println!("      Pin: {}:{}", reference, designator);
            }
        }
    }

    let stats = outcome.stats();
    println!("\n  Summary:");
    println!("    Errors:   {}", stats.errors);
    println!("    Warnings: {}", stats.warnings);

    match (&outcome.artifact, output) {
        (Some(_), Some(file)) => println!("    Artifact: written to {}", file.display()),
        (Some(_), None) => println!("    Artifact: ok"),
        (None, _) => println!("    Artifact: not generated"),
    }
}

fn handle_rules(verbose: bool) {
    println!("Available ERC rules:\n");

    let engine = RulesEngine::with_default_rules();
    for rule in engine.rules() {
        println!("  {} ({})", rule.id(), rule.severity());
        println!("    {}", rule.name());
        if verbose {
            println!("    {}", rule.description());
        }
        println!();
    }
}
