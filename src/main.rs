use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reset SIGPIPE to default behavior so piping (e.g. `aquaform plan | less`)
/// exits cleanly instead of panicking on broken pipe.
#[cfg(unix)]
fn reset_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use aquaform::backend::{BackendKind, LiveFactory};
use aquaform::config::loader;
use aquaform::engine::Reconciler;
use aquaform::model;
use aquaform::output::formatter;
use aquaform::state::store::StateStore;

/// aquaform - declarative table schema manager
#[derive(Parser)]
#[command(name = "aquaform", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to every file matching the backend's
    /// pattern in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the state file (defaults to aqua.state.json / aquamy.state.json)
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    /// Database backend
    #[arg(
        short = 't',
        long = "backend",
        value_enum,
        default_value = "postgres",
        global = true
    )]
    backend: BackendKind,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the state file
    Init,

    /// Show the planned changes without applying them
    Plan,

    /// Apply the planned changes to the database
    Apply,

    /// Drop resources and remove them from state
    Destroy {
        /// Destroy only this resource id
        #[arg(short, long)]
        resource: Option<String>,
    },

    /// Generate a starter config file
    Model {
        /// Output path (defaults to aqua.model.yaml / aquamy.model.yaml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(unix)]
    reset_sigpipe();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cmd_init(&cli),
        Commands::Plan => cmd_plan(&cli),
        Commands::Apply => cmd_apply(&cli).await,
        Commands::Destroy { ref resource } => cmd_destroy(&cli, resource.as_deref()).await,
        Commands::Model { ref output } => cmd_model(&cli, output.as_deref()),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn state_path(cli: &Cli) -> PathBuf {
    cli.state
        .clone()
        .unwrap_or_else(|| PathBuf::from(cli.backend.default_state_file()))
}

fn build_reconciler(cli: &Cli) -> Result<Reconciler> {
    let desired = loader::load_tables(cli.config.as_deref(), cli.backend)?;
    let state = StateStore::load(state_path(cli));
    let factory = Arc::new(LiveFactory::new(cli.backend));
    Ok(Reconciler::new(desired, state, factory))
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn cmd_init(cli: &Cli) -> Result<()> {
    let mut reconciler = build_reconciler(cli)?;
    reconciler.init()
}

fn cmd_plan(cli: &Cli) -> Result<()> {
    let reconciler = build_reconciler(cli)?;
    let plan = reconciler.plan();
    formatter::print_plan(&plan);
    Ok(())
}

async fn cmd_apply(cli: &Cli) -> Result<()> {
    let mut reconciler = build_reconciler(cli)?;

    let has_changes = {
        let plan = reconciler.plan();
        formatter::print_plan(&plan);
        !plan.is_empty()
    };
    if !has_changes {
        return Ok(());
    }

    let summary = reconciler.apply().await?;

    println!();
    println!("{}", summary);
    println!(
        "{} State written to {}",
        "→".blue(),
        reconciler.state().path().display()
    );

    if summary.failed > 0 {
        formatter::print_error(&format!(
            "{} change(s) failed; state reflects only the successful ones.",
            summary.failed
        ));
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_destroy(cli: &Cli, resource: Option<&str>) -> Result<()> {
    let mut reconciler = build_reconciler(cli)?;
    let summary = reconciler.destroy(resource).await?;

    println!();
    println!("{}", summary);
    println!(
        "{} State written to {}",
        "→".blue(),
        reconciler.state().path().display()
    );

    if summary.failed > 0 {
        formatter::print_error(&format!(
            "{} drop(s) failed; the affected resources remain in state.",
            summary.failed
        ));
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_model(cli: &Cli, output: Option<&Path>) -> Result<()> {
    let default_path = PathBuf::from(cli.backend.default_model_file());
    let output = output.unwrap_or(&default_path);

    model::write_model(cli.backend, output)?;
    formatter::print_success(&format!("Generated model config: {}", output.display()));

    println!();
    println!("Next steps:");
    println!("  1. Set the environment variables the model references:");
    for var in model::model_env_vars(cli.backend) {
        println!("     - {}", var);
    }
    println!("  2. Adjust the generated tables to your needs");
    println!("  3. Run: aquaform init && aquaform plan && aquaform apply");
    Ok(())
}
