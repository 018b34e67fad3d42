//! Bridgegen CLI
//!
//! Generates a target-neutral package schema from a provider tree, or checks
//! the name mapping without writing anything.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bridgegen::config::{GeneratorConfig, OutputFormat};
use bridgegen::spec::ObjectTypeSpec;
use bridgegen::{compile, CamelCaseMapper, CompileOptions, Fingerprint, LogSink, ProviderTree};

#[derive(Parser)]
#[command(name = "bridgegen")]
#[command(about = "Compile a provider schema tree into a package schema")]
struct Cli {
    /// Path to a config file (bridgegen.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the package schema
    Generate {
        /// Provider tree JSON file
        #[arg(short, long)]
        tree: PathBuf,

        /// Output schema file
        #[arg(short, long, default_value = "schema.json")]
        out: PathBuf,
    },

    /// Run the name validation pass only
    Check {
        /// Provider tree JSON file
        #[arg(short, long)]
        tree: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GeneratorConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Generate { tree, out } => {
            let output = run_compile(&tree, &config)?;

            let encoded = match config.output.format {
                OutputFormat::Pretty => serde_json::to_string_pretty(&output.spec)?,
                OutputFormat::Compact => serde_json::to_string(&output.spec)?,
            };
            std::fs::write(&out, &encoded)
                .with_context(|| format!("failed to write {}", out.display()))?;

            println!("Wrote {} ({} types, {} resources, {} functions)",
                out.display(),
                output.spec.types.len(),
                output.spec.resources.len(),
                output.spec.functions.len(),
            );
            if config.output.include_fingerprint {
                println!("Fingerprint: {}", Fingerprint::of_spec(&output.spec)?);
            }
            report_findings(output.diagnostics.len(), config.validation.fail_on_findings)
        }
        Commands::Check { tree } => {
            let output = run_compile(&tree, &config)?;
            report_findings(output.diagnostics.len(), config.validation.fail_on_findings)
        }
    }
}

fn run_compile(
    tree_path: &PathBuf,
    config: &GeneratorConfig,
) -> anyhow::Result<bridgegen::CompileOutput> {
    let raw = std::fs::read_to_string(tree_path)
        .with_context(|| format!("failed to read {}", tree_path.display()))?;
    let tree: ProviderTree = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse provider tree {}", tree_path.display()))?;

    let extra_types = load_extra_types(config)?;
    let options = CompileOptions {
        version: config.package.version.clone(),
        extra_types,
    };

    // Findings also go to stderr through tracing as they are reported.
    let mut sink = LogSink;
    let output = compile(&tree, &options, &CamelCaseMapper, &mut sink)
        .context("schema compilation failed")?;
    Ok(output)
}

fn load_extra_types(config: &GeneratorConfig) -> anyhow::Result<BTreeMap<String, ObjectTypeSpec>> {
    let Some(path) = &config.validation.extra_types_file else {
        return Ok(BTreeMap::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read extra types {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse extra types {}", path.display()))
}

fn report_findings(count: usize, fail_on_findings: bool) -> anyhow::Result<()> {
    if count == 0 {
        println!("Name validation: clean");
        return Ok(());
    }
    if fail_on_findings {
        anyhow::bail!("{} name validation finding(s) (fail_on_findings is set)", count);
    }
    println!("Name validation: {} finding(s)", count);
    Ok(())
}
