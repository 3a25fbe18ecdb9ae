use crate::cmd::Exit;
use crate::output::{print_conflict, print_json, section};
use anyhow::Context;
use marr_core::config::DetectionConfig;
use marr_core::detector::Detector;
use marr_core::paths::Layout;
use marr_core::validate::{validate_conflicts, validate_project, SetupState, ValidationResult};

pub fn run(
    layout: &Layout,
    strict: bool,
    conflicts_only: bool,
    verbose: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = DetectionConfig::load(layout).context("failed to load .claude/marr/config.yaml")?;
    let detector = Detector::new(layout, config);
    let result = if conflicts_only {
        validate_conflicts(&detector)
    } else {
        validate_project(&detector)
    };

    if json {
        print_json(&result.report())?;
    } else {
        print_human(layout, &result, strict, verbose);
    }

    if result.fails(strict) {
        return Err(Exit::ValidationFailed.into());
    }
    Ok(())
}

fn print_human(layout: &Layout, result: &ValidationResult, strict: bool, verbose: bool) {
    if result.not_initialized {
        print_not_initialized(layout, verbose);
        return;
    }

    section("MARR Configuration Validation");
    for check in &result.passed {
        println!("✓ {check}");
    }

    if !result.errors.is_empty() {
        section("Errors");
        for error in &result.errors {
            println!("✗ {error}");
        }
    }
    if !result.warnings.is_empty() {
        section("Warnings");
        for warning in &result.warnings {
            println!("⚠ {warning}");
        }
    }
    if !result.conflicts.is_empty() {
        section("Conflicts Detected");
        for conflict in &result.conflicts {
            print_conflict(&layout.project, conflict);
        }
        println!("\nRun: marr doctor  to resolve conflicts interactively");
    }

    let summary = result.report().summary;
    if summary.errors + summary.warnings + summary.conflicts == 0 {
        println!("\n✓ Validation passed! Configuration is valid.");
        return;
    }
    section("Summary");
    println!("Errors: {}", summary.errors);
    println!("Warnings: {}", summary.warnings);
    println!("Conflicts: {}", summary.conflicts);
    if strict && summary.warnings + summary.conflicts > 0 {
        println!("\n✗ Validation failed in strict mode (warnings/conflicts treated as errors)");
    }
}

fn print_not_initialized(layout: &Layout, verbose: bool) {
    let setup = SetupState::of(layout);
    println!("✗ {}", marr_core::validate::NOT_INITIALIZED);
    println!("\nProject root: {}", setup.root.display());
    if setup.has_claude_dir {
        println!("\nFound:");
        println!("  ✓ .claude/ directory exists");
        println!("  ✗ .claude/marr/ directory missing");
    }
    println!("\nWhat to do:");
    println!("  • If this should be a MARR project: create .claude/marr/MARR-PROJECT-CLAUDE.md");
    println!("  • If you're in the wrong directory: pass --root or cd to the project root");

    if verbose {
        let yes_no = |b: bool| if b { "Yes" } else { "No" };
        section("Diagnostics");
        println!("  .claude/ exists: {}", yes_no(setup.has_claude_dir));
        println!("  .claude/marr/ exists: {}", yes_no(setup.has_marr_dir));
        println!("  MARR-PROJECT-CLAUDE.md exists: {}", yes_no(setup.has_project_config));
        println!("  Standards directory exists: {}", yes_no(setup.has_standards));
        println!("  User MARR setup: {}", yes_no(layout.user_marr_dir().is_dir()));
    }
}
