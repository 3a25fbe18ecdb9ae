mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{backup::BackupSubcommand, standard::StandardSubcommand, Exit};
use marr_core::paths::Layout;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "marr",
    about = "Making Agents Really Reliable: validate layered AI assistant standards and resolve conflicts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/marr/ or .git/)
    #[arg(long, global = true, env = "MARR_ROOT")]
    root: Option<PathBuf>,

    /// Home directory holding the user-scope ~/.claude/ config
    #[arg(long, global = true, env = "MARR_HOME")]
    home: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate MARR configuration in the current project
    Validate {
        /// Treat warnings and conflicts as errors (exit code 1)
        #[arg(long)]
        strict: bool,

        /// Only check for conflicts (skip structural validation)
        #[arg(long)]
        conflicts: bool,

        /// Show setup diagnostics when the project is not initialized
        #[arg(long)]
        verbose: bool,
    },

    /// Detect and resolve conflicts between existing config and MARR standards
    Doctor {
        /// Apply every recommended resolution without prompting
        #[arg(long)]
        auto: bool,

        /// Only check user-scope config (~/.claude/)
        #[arg(long, short = 'u')]
        user: bool,

        /// Only check project-scope config
        #[arg(long, short = 'p')]
        project: bool,

        /// Show what would change without modifying files
        #[arg(long, short = 'n')]
        dry_run: bool,

        /// Show counts of standards and config files before detecting
        #[arg(long)]
        summary: bool,
    },

    /// Manage standards with structured frontmatter
    Standard {
        #[command(subcommand)]
        subcommand: StandardSubcommand,
    },

    /// List, restore and prune file backups
    Backup {
        #[command(subcommand)]
        subcommand: BackupSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let result = layout(&root, cli.home).and_then(|layout| match cli.command {
        Commands::Validate {
            strict,
            conflicts,
            verbose,
        } => cmd::validate::run(&layout, strict, conflicts, verbose, cli.json),
        Commands::Doctor {
            auto,
            user,
            project,
            dry_run,
            summary,
        } => {
            let opts = cmd::doctor::DoctorOptions {
                auto,
                user,
                project,
                dry_run,
                summary,
            };
            cmd::doctor::run(&layout, opts, cli.json)
        }
        Commands::Standard { subcommand } => cmd::standard::run(&layout, subcommand, cli.json),
        Commands::Backup { subcommand } => cmd::backup::run(&layout, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Results were already printed; only the exit code is left to report.
        if let Some(exit) = e.downcast_ref::<Exit>() {
            std::process::exit(exit.code());
        }
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn layout(root: &std::path::Path, home: Option<PathBuf>) -> anyhow::Result<Layout> {
    Ok(match home {
        Some(home) => Layout::new(home, root),
        None => Layout::discover(root)?,
    })
}
