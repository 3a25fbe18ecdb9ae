use crate::cmd::Exit;
use crate::output::{display_path, print_json, print_table, section};
use clap::Subcommand;
use marr_core::catalog::{self, StandardCheck};
use marr_core::paths::{Layout, STANDARDS_DIR};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum StandardSubcommand {
    /// Validate frontmatter in standard file(s)
    Validate {
        /// Standard file (relative to the project root or the standards directory)
        path: Option<PathBuf>,
        /// Validate every standard in .claude/marr/standards/
        #[arg(long, conflicts_with = "path")]
        all: bool,
    },

    /// List all standards with their triggers
    List,

    /// Scaffold a new standard with valid frontmatter
    Create {
        /// Standard name; `prj-` and `.md` are added when missing
        name: String,
    },

    /// Regenerate the Standards section of MARR-PROJECT-CLAUDE.md from frontmatter
    Sync {
        /// Print the regenerated section without writing it
        #[arg(long, short = 'n')]
        dry_run: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(layout: &Layout, subcmd: StandardSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StandardSubcommand::Validate { path, all } => validate(layout, path.as_deref(), all, json),
        StandardSubcommand::List => list(layout, json),
        StandardSubcommand::Create { name } => create(layout, &name, json),
        StandardSubcommand::Sync { dry_run } => sync(layout, dry_run, json),
    }
}

/// Absolute paths as given; otherwise the project root, then the standards
/// directory.
fn locate(layout: &Layout, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let in_project = layout.project.join(path);
    if in_project.exists() {
        in_project
    } else {
        layout.project_standards_dir().join(path)
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(layout: &Layout, path: Option<&Path>, all: bool, json: bool) -> anyhow::Result<()> {
    let checks: Vec<StandardCheck> = if all {
        let checks = catalog::check_all(&layout.project_standards_dir());
        if checks.is_empty() {
            anyhow::bail!("no standard files found in {STANDARDS_DIR}/");
        }
        checks
    } else if let Some(path) = path {
        let full = locate(layout, path);
        if !full.is_file() {
            anyhow::bail!("file not found: {}", path.display());
        }
        vec![catalog::check_standard(&full)]
    } else {
        anyhow::bail!("specify a file path or use --all to validate all standards");
    };

    let invalid = checks.iter().filter(|c| !c.is_valid()).count();
    if json {
        print_json(&serde_json::json!({
            "valid": invalid == 0,
            "standards": checks,
        }))?;
    } else {
        section(&format!("Validating {} standard(s)", checks.len()));
        for check in &checks {
            if check.is_valid() {
                println!("✓ {}: valid", check.filename);
            } else {
                println!("✗ {}:", check.filename);
                for error in &check.errors {
                    println!("  - {error}");
                }
            }
        }
        if invalid == 0 {
            println!("\n✓ All {} standard(s) valid", checks.len());
        } else {
            println!("\n✗ {invalid} of {} standard(s) invalid", checks.len());
        }
    }

    if invalid > 0 {
        return Err(Exit::InvalidStandards {
            invalid,
            total: checks.len(),
        }
        .into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(layout: &Layout, json: bool) -> anyhow::Result<()> {
    let dir = layout.project_standards_dir();
    if !dir.is_dir() {
        anyhow::bail!("standards directory not found: {STANDARDS_DIR}/ (create it, then run: marr standard create <name>)");
    }
    let checks = catalog::check_all(&dir);

    if json {
        return print_json(&checks);
    }
    if checks.is_empty() {
        println!("No standard files found.");
        return Ok(());
    }

    let rows = checks
        .iter()
        .map(|c| match &c.frontmatter {
            Some(fm) => vec![
                c.filename.clone(),
                fm.title.clone(),
                fm.scope.clone(),
                fm.triggers.join("; "),
            ],
            None => vec![
                c.filename.clone(),
                "(invalid frontmatter)".to_string(),
                String::new(),
                String::new(),
            ],
        })
        .collect();
    print_table(&["FILE", "TITLE", "SCOPE", "TRIGGERS"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

fn create(layout: &Layout, name: &str, json: bool) -> anyhow::Result<()> {
    let path = catalog::create_standard(layout, name)?;
    let shown = display_path(&layout.project, &path);

    if json {
        return print_json(&serde_json::json!({ "created": shown }));
    }
    println!("Created: {shown}");
    println!("\nNext steps:");
    println!("  1. Edit the file to add your standard content");
    println!("  2. Update the frontmatter triggers");
    println!(
        "  3. Run: marr standard validate {}",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

fn sync(layout: &Layout, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let outcome = catalog::sync_triggers(layout, dry_run)?;

    if json {
        return print_json(&outcome);
    }
    if outcome.synced.is_empty() && outcome.skipped.is_empty() {
        println!("No standard files found.");
        return Ok(());
    }
    if !outcome.skipped.is_empty() {
        println!("Skipped {} file(s):", outcome.skipped.len());
        for s in &outcome.skipped {
            println!("  - {}: {}", display_path(&layout.project, &s.path), s.reason);
        }
        println!();
    }
    if dry_run {
        println!("Dry run - would update standards section:\n");
        println!("{}", outcome.section);
        println!("\n{} standard(s) would be synced", outcome.synced.len());
    } else {
        println!("Updated {}", marr_core::paths::PROJECT_CONFIG_FILE);
        println!("Synced {} standard(s)", outcome.synced.len());
    }
    Ok(())
}
