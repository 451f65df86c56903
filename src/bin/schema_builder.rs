//! Schema Builder CLI
//!
//! Drives the schema store from JSON files: load a snapshot, replay a list of
//! commands against it, then print the result, the save payload, the
//! consistency report, the reference graph or the navigation menu.

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use schema_builder::{
    consistency, BuilderConfig, Command, Menu, ReferenceGraph, SchemaStore, Snapshot,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-builder")]
#[command(about = "Edit content-type and component schemas from the command line")]
struct Cli {
    /// Config file (in addition to the default locations)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Snapshot JSON (defaults to snapshot.path from the config)
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// JSON array of commands to apply after loading the snapshot
    #[arg(long)]
    commands: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply commands and print the resulting schemas
    Apply {
        #[command(flatten)]
        input: Input,

        /// Print the save payload instead of the full snapshot
        #[arg(long)]
        payload: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check relation pairing and references
    Check {
        #[command(flatten)]
        input: Input,
    },

    /// Export the entity reference graph as DOT
    Graph {
        #[command(flatten)]
        input: Input,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the navigation menu
    Menu {
        #[command(flatten)]
        input: Input,

        /// Fuzzy filter on display names
        #[arg(long)]
        search: Option<String>,
    },

    /// Print the effective configuration, or write it to a file
    Config {
        /// Write the configuration here instead of printing it
        #[arg(long)]
        init: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = BuilderConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Apply { input, payload, output } => {
            let store = load_store(&config, &input)?;
            let rendered = if payload {
                config.export.output_format.render(&store.save_payload())?
            } else {
                config.export.output_format.render(&store.snapshot())?
            };
            emit(&rendered, output.as_deref())
        }

        Commands::Check { input } => {
            let store = load_store(&config, &input)?;
            let report = consistency::check(&store);

            for diagnostic in &report.diagnostics {
                println!(
                    "{:?} [{}] {}.{}: {}",
                    diagnostic.severity,
                    diagnostic.code,
                    diagnostic.uid,
                    diagnostic.attribute.as_deref().unwrap_or("-"),
                    diagnostic.message
                );
            }

            let errors = report.errors().count();
            let warnings = report.warnings().count();
            println!("{} error(s), {} warning(s)", errors, warnings);

            if errors > 0 || (config.check.fail_on_warnings && warnings > 0) {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Graph { input, output } => {
            let store = load_store(&config, &input)?;
            let graph = ReferenceGraph::from_store(&store);
            info!(nodes = graph.node_count(), edges = graph.edge_count(), "Built reference graph");
            emit(&graph.to_dot(), output.as_deref())
        }

        Commands::Menu { input, search } => {
            let store = load_store(&config, &input)?;
            let menu = Menu::build(&store, search.as_deref());

            for section in &menu.sections {
                println!("{} ({})", section.title, section.links_count);
                for link in &section.links {
                    print_link(link, 1);
                }
            }
            Ok(())
        }

        Commands::Config { init } => match init {
            Some(path) => {
                config
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Wrote configuration to {}", path.display());
                Ok(())
            }
            None => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn load_store(config: &BuilderConfig, input: &Input) -> anyhow::Result<SchemaStore> {
    let path = input
        .snapshot
        .as_ref()
        .or(config.snapshot.path.as_ref())
        .ok_or_else(|| anyhow!("No snapshot given; pass --snapshot or set snapshot.path"))?;

    let mut snapshot = Snapshot::from_path(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    snapshot.reserved_names.extend(&config.reserved_names());

    let mut store = SchemaStore::from_snapshot(snapshot)?;

    if let Some(commands_path) = &input.commands {
        let content = std::fs::read_to_string(commands_path)
            .with_context(|| format!("Failed to read {}", commands_path.display()))?;
        let commands: Vec<Command> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse commands in {}", commands_path.display()))?;

        let total = commands.len();
        let applied = store
            .dispatch_all(commands)
            .map_err(|(index, e)| anyhow!("Command #{} failed: {}", index + 1, e))?;
        info!(applied, total, "Applied commands");
    }

    Ok(store)
}

fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn print_link(link: &schema_builder::menu::MenuLink, depth: usize) {
    let indent = "  ".repeat(depth);
    match link.status {
        Some(status) => println!("{}{} [{}] ({})", indent, link.title, status, link.name),
        None => println!("{}{}", indent, link.title),
    }
    for child in &link.links {
        print_link(child, depth + 1);
    }
}
