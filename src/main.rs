//! copyspec - Resolve hierarchical copy specifications.
//!
//! Usage:
//!   copyspec plan <DOC>      Show every file the spec copies and where
//!   copyspec tree <DOC>      Show the effective settings of every spec
//!   copyspec --help          Show help

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use copyspec_core::SpecWarning;
use copyspec_scan::{FsFileResolver, FsResolverConfig};
use copyspec_tree::{CopyPlan, CopySpec, SpecDocument, SpecRegistry, SpecResolver};

#[derive(Parser)]
#[command(
    name = "copyspec",
    version,
    about = "Resolve hierarchical copy specifications",
    long_about = "copyspec reads a TOML description of a copy specification tree and \
                  shows what it resolves to.\n\n\
                  Set RUST_LOG (e.g. RUST_LOG=copyspec_tree=debug) for diagnostics."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every file the spec copies and where it lands
    Plan {
        /// Spec document
        document: PathBuf,

        /// Directory relative sources are resolved against (defaults to the document's directory)
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Include hidden files
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        hidden: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective settings of every spec in the tree
    Tree {
        /// Spec document
        document: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            document,
            base,
            hidden,
            format,
        } => {
            run_plan(&document, base, hidden, format)?;
        }
        Command::Tree { document, format } => {
            run_tree(&document, format)?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (warnings by default).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the document against the filesystem and print the plan.
fn run_plan(document: &Path, base: Option<PathBuf>, hidden: bool, format: OutputFormat) -> Result<()> {
    let doc = SpecDocument::load(document).context("Failed to load spec document")?;
    let root = doc.build().context("Invalid spec document")?;

    let base_dir = match base {
        Some(base) => base,
        None => document_dir(document),
    };
    let config = FsResolverConfig::builder()
        .base_dir(base_dir.clone())
        .include_hidden(hidden)
        .build()
        .context("Invalid resolver configuration")?;
    let files = FsFileResolver::new(config);

    eprintln!("Resolving sources in {}...", base_dir.display());

    let plan = CopyPlan::build(&root.resolver(), &files).context("Failed to resolve copy plan")?;
    debug!(entries = plan.len(), warnings = plan.warnings.len(), "resolved copy plan");

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Copy Plan");
            println!("{}", "─".repeat(70));
            println!();

            if plan.is_empty() {
                println!(" Nothing to copy.");
            } else {
                for entry in &plan.entries {
                    let marker = if entry.is_directory { "/" } else { "" };
                    let spec: &str = if entry.spec_key.is_empty() { "root" } else { &entry.spec_key };
                    println!(
                        "   {:<10} {:o}  {}{} <- {}",
                        spec,
                        entry.mode,
                        entry.destination,
                        marker,
                        entry.source.display()
                    );
                }
                println!();
                println!(
                    " {} files, {} directories",
                    plan.file_destinations().len(),
                    plan.len() - plan.file_destinations().len()
                );
            }
            print_warnings(&plan.warnings);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}

/// Print the effective settings of each spec, keyed by address.
fn run_tree(document: &Path, format: OutputFormat) -> Result<()> {
    let doc = SpecDocument::load(document).context("Failed to load spec document")?;

    // Register before configuring so every attached child is recorded.
    let root = match &doc.defaults {
        Some(defaults) => {
            CopySpec::with_defaults(defaults.clone()).context("Invalid spec defaults")?
        }
        None => CopySpec::new(),
    };
    let registry = SpecRegistry::attach(&root, "rootSpec");
    doc.apply_to(&root).context("Invalid spec document")?;

    let mut specs: Vec<(String, SpecResolver)> = vec![("rootSpec".to_string(), root.resolver())];
    specs.extend(
        registry
            .entries()
            .into_iter()
            .map(|entry| (entry.key.clone(), entry.resolver())),
    );

    match format {
        OutputFormat::Text => {
            for (key, resolver) in &specs {
                let settings = resolver.settings()?;
                let depth = resolver_depth(resolver);
                let indent = "  ".repeat(depth);
                println!("{indent}{key}");
                println!("{indent}  into: {}", display_or(&settings.destination, "."));
                if !settings.sources.is_empty() {
                    println!("{indent}  from: {}", settings.sources.join(", "));
                }
                if !settings.includes.is_empty() {
                    println!("{indent}  include: {}", settings.includes.join(", "));
                }
                if !settings.excludes.is_empty() {
                    println!("{indent}  exclude: {}", settings.excludes.join(", "));
                }
                println!(
                    "{indent}  case sensitive: {}, empty dirs: {}, duplicates: {}, charset: {}",
                    settings.case_sensitive,
                    settings.include_empty_dirs,
                    settings.duplicates_strategy,
                    settings.filtering_charset
                );
                if settings.actions > 0 {
                    println!("{indent}  actions: {}", settings.actions);
                }
            }
            print_warnings(&root.warnings());
        }
        OutputFormat::Json => {
            let mut entries = Vec::with_capacity(specs.len());
            for (key, resolver) in &specs {
                let settings = resolver.settings()?;
                entries.push(serde_json::json!({
                    "key": key,
                    "settings": settings,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

/// Directory containing the document, or the current directory.
fn document_dir(document: &Path) -> PathBuf {
    document
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolver_depth(resolver: &SpecResolver) -> usize {
    let mut depth = 0;
    let mut current = resolver.parent();
    while let Some(parent) = current {
        depth += 1;
        current = parent.parent();
    }
    depth
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

fn print_warnings(warnings: &[SpecWarning]) {
    if !warnings.is_empty() {
        println!();
        println!("{} warning(s)", warnings.len());
        for warning in warnings {
            println!("   {}", warning.message);
        }
    }
}
