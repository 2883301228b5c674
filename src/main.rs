//! Ripple - git-flow release assistant.
//!
//! Creates and finishes feature/release/hotfix branches, bumps the version
//! recorded in the project manifest, and commits/tags/merges as each step
//! completes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ripple::{
    init, preload, BranchKind, BumpPart, CommandRunner, ShellRunner, Workflow, WorkflowOptions,
};

/// Git-flow release assistant
#[derive(Parser)]
#[command(name = "ripple")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path of the manifest file to read and modify
    #[arg(short = 'p', long, global = true, default_value = "./package.json")]
    manifest: String,

    /// Do not commit version changes automatically
    #[arg(short = 'x', long, global = true)]
    no_commit: bool,

    /// Show raw git output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Output the current status of the active project
    Status,

    /// Create a new branch of type "feature", "release", or "hotfix"
    Start {
        /// Branch type to start
        #[arg(value_enum)]
        kind: BranchKind,

        /// Branch name (required when starting a feature)
        name: Option<String>,
    },

    /// Bump the version number while on a release branch
    Bump {
        /// Version part to increment
        #[arg(value_enum)]
        part: BumpPart,
    },

    /// Finish and merge the current feature, release, or hotfix branch
    Finish {
        /// Branch type to finish
        #[arg(value_enum)]
        kind: BranchKind,
    },

    /// Create a fresh manifest for a new project
    Init {
        /// Project name
        name: String,

        /// Initial version
        #[arg(id = "initial_version", value_name = "VERSION", default_value = "0.1.0")]
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.debug { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).init();

    let Some(command) = cli.command else {
        println!("Use --help for command line options.");
        return Ok(());
    };

    let manifest_path = PathBuf::from(shellexpand::tilde(&cli.manifest).into_owned());
    let opts = WorkflowOptions {
        manifest_path,
        commit: !cli.no_commit,
        verbose: cli.verbose,
    };

    // init needs neither a repository nor the preload chain.
    if let Commands::Init { name, version } = &command {
        return init(&opts, name, version);
    }

    let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
    let state = preload(&runner).await?;
    let workflow = Workflow::new(runner, state, opts);

    match command {
        Commands::Status => workflow.status(),
        Commands::Start { kind, name } => workflow.start(kind, name.as_deref()).await,
        Commands::Bump { part } => workflow.bump(part).await,
        Commands::Finish { kind } => workflow.finish(kind).await,
        Commands::Init { .. } => unreachable!("handled before preload"),
    }
}
