//! PanelFlow Command Line Tool
//!
//! Runs and validates panel workflow definitions using the PanelFlow
//! engine, without any host application attached.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use panelflow_engine::engine::WorkflowRunner;
use panelflow_engine::events::{EventBus, InProcessEventBus, WorkflowEvent};
use panelflow_engine::workflow::{parse_workflow_json, parse_workflow_yaml, Workflow};

#[derive(Parser)]
#[command(name = "panelflowctl")]
#[command(version, about = "PanelFlow Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow definition to termination
    /// Examples:
    ///     panelflowctl run demos/hello.json
    ///     panelflowctl run demos/chain.yaml --quiet
    #[command(verbatim_doc_comment)]
    Run {
        /// Path to the workflow file (.json, .yaml or .yml)
        file: PathBuf,

        /// Suppress per-state data output, only report events
        #[arg(short, long)]
        quiet: bool,
    },
    /// Parse and validate a workflow definition without executing it
    /// Examples:
    ///     panelflowctl validate demos/hello.json
    #[command(verbatim_doc_comment)]
    Validate {
        /// Path to the workflow file (.json, .yaml or .yml)
        file: PathBuf,
    },
}

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,panelflow_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load a workflow from disk, dispatching the parser on extension.
fn load_workflow(file: &Path) -> Result<Workflow> {
    let content =
        fs::read_to_string(file).context(format!("Failed to read file: {}", file.display()))?;

    let workflow = match file.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_workflow_json(&content)?,
        Some("yaml") | Some("yml") => parse_workflow_yaml(&content)?,
        other => bail!(
            "Unsupported workflow file extension {:?} for {}",
            other.unwrap_or(""),
            file.display()
        ),
    };

    Ok(workflow)
}

fn run_workflow(file: &Path, quiet: bool) -> Result<()> {
    let workflow = load_workflow(file)?;
    let state_names: Vec<String> = workflow
        .state_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let bus = Arc::new(InProcessEventBus::new());
    bus.subscribe(Arc::new(|event: &WorkflowEvent| {
        match &event.data {
            Some(data) => println!("event {}: {}", event.publish, data),
            None => println!("event {}", event.publish),
        }
    }));

    let mut runner = WorkflowRunner::new(workflow, bus);
    runner.start()?;

    if !quiet {
        for name in state_names {
            if let Some(data) = runner.state_data(&name) {
                println!("state {}:", name);
                println!("{}", serde_json::to_string_pretty(data)?);
            }
        }
    }

    Ok(())
}

fn validate_workflow_file(file: &Path) -> Result<()> {
    let workflow = load_workflow(file)?;
    println!(
        "{} is valid: workflow '{}' ({} states)",
        file.display(),
        workflow.name,
        workflow.states.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, quiet } => run_workflow(&file, quiet),
        Commands::Validate { file } => validate_workflow_file(&file),
    }
}
