use crate::output::{display_path, print_json, section};
use anyhow::Context;
use marr_core::config::{DetectionConfig, WarnLevel};
use marr_core::conflict::{DoctorSummary, ReportScope};
use marr_core::detector::{Detector, ScanSummary};
use marr_core::paths::Layout;
use marr_core::resolve::{Mode, Resolver};
use serde::Serialize;

pub struct DoctorOptions {
    pub auto: bool,
    pub user: bool,
    pub project: bool,
    pub dry_run: bool,
    pub summary: bool,
}

impl DoctorOptions {
    fn scope(&self) -> ReportScope {
        match (self.user, self.project) {
            (true, false) => ReportScope::User,
            (false, true) => ReportScope::Project,
            _ => ReportScope::Both,
        }
    }

    fn mode(&self) -> Mode {
        if self.auto {
            Mode::Auto
        } else {
            Mode::Interactive
        }
    }
}

#[derive(Serialize)]
struct DoctorOutput {
    #[serde(flatten)]
    summary: DoctorSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    scan: Option<ScanSummary>,
}

pub fn run(layout: &Layout, opts: DoctorOptions, json: bool) -> anyhow::Result<()> {
    let config = DetectionConfig::load(layout).context("failed to load .claude/marr/config.yaml")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => anyhow::bail!("invalid detection config: {}", w.message),
        }
    }
    let backup_keep = config.backup_keep;
    let detector = Detector::new(layout, config);

    let scan = opts.summary.then(|| detector.scan_summary());
    if !json {
        section(if opts.dry_run {
            "MARR Doctor (Dry Run)"
        } else {
            "MARR Doctor"
        });
        if let Some(scan) = &scan {
            println!("Standards:        {}", scan.standards);
            println!("Directives:       {}", scan.directives);
            println!("Config files:     {}", scan.config_files);
            println!("Custom standards: {}", scan.custom_standards);
        }
        println!("\nScanning for conflicts...");
    }

    let report = detector.report(opts.scope());
    if report.conflicts.is_empty() {
        if json {
            return print_json(&DoctorOutput {
                summary: DoctorSummary::new(0, Vec::new()),
                scan,
            });
        }
        println!("\n✓ No conflicts detected! Your configuration is clean.");
        return Ok(());
    }

    let resolver = Resolver::new(layout, opts.dry_run);
    let stdin = std::io::stdin();
    let summary = if json {
        // Keep stdout for the JSON document; prompts go to stderr.
        resolver.run(
            &report.conflicts,
            opts.mode(),
            backup_keep,
            stdin.lock(),
            std::io::stderr(),
        )?
    } else {
        println!("\nFound {} conflict(s) to resolve.", report.conflicts.len());
        resolver.run(
            &report.conflicts,
            opts.mode(),
            backup_keep,
            stdin.lock(),
            std::io::stdout(),
        )?
    };

    if json {
        return print_json(&DoctorOutput { summary, scan });
    }
    print_summary(layout, &summary, opts.auto, opts.dry_run);
    Ok(())
}

fn print_summary(layout: &Layout, summary: &DoctorSummary, auto: bool, dry_run: bool) {
    // Interactive mode already printed each outcome as it was applied.
    if auto {
        println!();
        for action in &summary.actions {
            let status = if action.success { "✓" } else { "✗" };
            let detail = action
                .error
                .as_deref()
                .or(action.note.as_deref())
                .unwrap_or_default();
            println!("{status} {} [{}] {detail}", action.conflict_id, action.resolution);
        }
    }

    section(if dry_run {
        "Dry Run Summary"
    } else {
        "Resolution Summary"
    });
    let counts = &summary.summary;
    if dry_run {
        println!("Would resolve: {}", counts.resolved);
    } else {
        println!("Resolved: {}", counts.resolved);
    }
    println!("Skipped: {}", counts.skipped);
    println!("Failed: {}", counts.failed);

    if !summary.backups.is_empty() {
        println!("\nBackups created:");
        for backup in &summary.backups {
            println!("  {}", display_path(&layout.project, backup));
        }
        println!("\nRestore with: marr backup restore <backup>");
    }
    if dry_run {
        println!("\nRun without --dry-run to apply changes.");
    }
}
