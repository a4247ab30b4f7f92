// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tessera CLI entrypoint.
//!
//! Offline commands (`nodes`, `relabel`, `style`, `render`) work on a Mermaid file directly.
//! `generate` drives a full session against the generation service.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tessera::config::{load_config, AppConfig};
use tessera::model::{DiagramKind, DiagramSource, NodeStyle};
use tessera::ops::{apply_style, declared_labels, node_ids, update_label};
use tessera::render::{FlowchartSvgRenderer, Renderer};
use tessera::service::HttpGenerationService;
use tessera::session::{DiagramSessionController, SessionOptions};
use tessera::store::{FileStore, KeyValueStore, MemoryStore};

const LOG_ENV: &str = "TESSERA_LOG";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace); `TESSERA_LOG` takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List node ids and their declared labels
    Nodes {
        input: PathBuf,
    },
    /// Replace one node's label, leaving the rest of the file untouched
    Relabel {
        input: PathBuf,
        node_id: String,
        label: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Set (or clear, with no properties) one node's style rule
    Style {
        input: PathBuf,
        node_id: String,
        #[arg(long)]
        fill: Option<String>,
        #[arg(long)]
        stroke: Option<String>,
        #[arg(long)]
        stroke_width: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Render a flowchart to SVG
    Render {
        input: PathBuf,
        #[arg(short, long, default_value = "out.svg")]
        output: PathBuf,
    },
    /// Generate a diagram from a prompt via the generation service
    Generate {
        prompt: String,
        #[arg(long, default_value = "architecture")]
        kind: DiagramKind,
        /// Ask for a structural plan first
        #[arg(long)]
        plan: bool,
        /// Confirm the plan without stopping to show it
        #[arg(long, requires = "plan")]
        yes: bool,
        /// Persist the conversation under this identity
        #[arg(long)]
        user: Option<String>,
        /// Write the generated source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug)]
struct OutputArgs {
    /// Rewrite the input file instead of printing to stdout
    #[arg(long, conflicts_with = "output")]
    in_place: bool,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level: {level}. Using 'warn' instead.");
            EnvFilter::new("warn")
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn read_source(path: &Path) -> Result<DiagramSource, Box<dyn Error>> {
    let text = fs::read_to_string(path).map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    Ok(DiagramSource::new(text))
}

fn write_text(text: &str, input: &Path, output: &OutputArgs) -> Result<(), Box<dyn Error>> {
    let target = if output.in_place { Some(input) } else { output.output.as_deref() };
    match target {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    match config.store.resolved_dir() {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => {
            tracing::warn!("no data directory available, conversation will not be persisted");
            Arc::new(MemoryStore::new())
        }
    }
}

async fn generate(
    config: &AppConfig,
    prompt: &str,
    kind: DiagramKind,
    plan: bool,
    yes: bool,
    user: Option<&str>,
) -> Result<Option<String>, Box<dyn Error>> {
    let service = HttpGenerationService::new(&config.service.base_url, config.service.timeout())?;
    let mut options = SessionOptions::from(config);
    options.plan_first = plan;

    let mut session = DiagramSessionController::new(options, Arc::new(service), open_store(config));
    if let Some(user) = user {
        session.set_identity(user)?;
    }
    session.set_diagram_kind(kind);
    session.submit_prompt(prompt).await?;

    if plan {
        let summary = session.pending_plan().map(|plan| plan.summary.clone()).unwrap_or_default();
        eprintln!("{summary}");
        if !yes {
            eprintln!("Re-run with --yes to generate the diagram from this plan.");
            return Ok(None);
        }
        session.confirm_plan().await?;
    }

    if let Some(explanation) = session.explanation() {
        eprintln!("{explanation}");
    }
    Ok(session.source().map(|source| source.as_str().to_owned()))
}

fn run(cli: Cli, config: AppConfig) -> Result<(), Box<dyn Error>> {
    let policy = config.editor.label_policy();
    match cli.command {
        Command::Nodes { input } => {
            let source = read_source(&input)?;
            let labels = declared_labels(&source);
            for node_id in node_ids(&source) {
                match labels.iter().find(|(id, _)| *id == node_id) {
                    Some((_, label)) => println!("{node_id}\t{label}"),
                    None => println!("{node_id}"),
                }
            }
        }
        Command::Relabel { input, node_id, label, output } => {
            let source = read_source(&input)?;
            let updated = update_label(&source, &node_id, &label, &policy)?;
            write_text(updated.as_str(), &input, &output)?;
        }
        Command::Style { input, node_id, fill, stroke, stroke_width, color, output } => {
            let source = read_source(&input)?;
            let style = NodeStyle { fill, stroke, stroke_width, color, ..NodeStyle::default() };
            let updated = apply_style(&source, &node_id, &style)?;
            write_text(updated.as_str(), &input, &output)?;
        }
        Command::Render { input, output } => {
            let source = read_source(&input)?;
            let rendered = FlowchartSvgRenderer::default().render(&source, 0)?;
            fs::write(&output, rendered.svg)?;
            tracing::info!(path = %output.display(), nodes = rendered.node_ids.len(), "svg written");
        }
        Command::Generate { prompt, kind, plan, yes, user, output } => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            let code = runtime.block_on(generate(&config, &prompt, kind, plan, yes, user.as_deref()))?;
            if let Some(code) = code {
                match output {
                    Some(path) => fs::write(path, code)?,
                    None => print!("{code}"),
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    tracing::debug!(?cli, "parsed arguments");

    let result = load_config(cli.config.as_deref())
        .map_err(Box::<dyn Error>::from)
        .and_then(|config| run(cli, config));

    if let Err(err) = result {
        tracing::error!(error = %err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
