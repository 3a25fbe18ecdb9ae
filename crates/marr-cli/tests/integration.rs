#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PROJECT_IMPORT: &str = "@.claude/marr/MARR-PROJECT-CLAUDE.md";

const TESTING_STANDARD: &str = "---
marr: standard
version: 1
title: Testing Standard
scope: All testing activities
triggers:
  - WHEN running tests
  - WHEN writing tests
---

# Testing Standard

## Core Rules (NEVER VIOLATE)

1. **Always run tests before committing**
2. **Write unit tests for new code**
";

const SYSTEM_CONFIG: &str = "# Demo Project

## Standards

(generated)

---

## Notes
";

struct Env {
    home: TempDir,
    project: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
        }
    }

    /// An initialized project with one standard and an importing CLAUDE.md.
    fn initialized() -> Self {
        let env = Self::new();
        env.put(".claude/marr/MARR-PROJECT-CLAUDE.md", SYSTEM_CONFIG);
        env.put(".claude/marr/standards/prj-testing-standard.md", TESTING_STANDARD);
        env.put("CLAUDE.md", &format!("# Demo\n{PROJECT_IMPORT}\n"));
        env
    }

    fn marr(&self) -> Command {
        let mut cmd = Command::cargo_bin("marr").unwrap();
        cmd.current_dir(self.project.path())
            .env("MARR_ROOT", self.project.path())
            .env("MARR_HOME", self.home.path())
            .env_remove("RUST_LOG");
        cmd
    }

    fn put(&self, rel: &str, content: &str) {
        let path = self.project.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.project.path().join(rel)).unwrap()
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let out = self.marr().arg("--json").args(args).output().unwrap();
        serde_json::from_slice(&out.stdout).unwrap()
    }

    fn json_with_stdin(&self, args: &[&str], stdin: &str) -> serde_json::Value {
        let out = self
            .marr()
            .arg("--json")
            .args(args)
            .write_stdin(stdin)
            .output()
            .unwrap();
        serde_json::from_slice(&out.stdout).unwrap()
    }
}

fn backups_of(path: &Path) -> usize {
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .flatten()
        .filter(|e| {
            let n = e.file_name().to_string_lossy().into_owned();
            n.starts_with(&format!("{name}.")) && n.ends_with(".bak")
        })
        .count()
}

// ---------------------------------------------------------------------------
// marr validate
// ---------------------------------------------------------------------------

#[test]
fn validate_uninitialized_project_fails() {
    let env = Env::new();
    env.marr()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Not a MARR-initialized project"));
}

#[test]
fn validate_clean_project_passes_strict() {
    let env = Env::initialized();
    env.marr()
        .args(["validate", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation passed"));
}

#[test]
fn validate_json_lists_conflicts() {
    let env = Env::initialized();
    env.put(
        "CLAUDE.md",
        &format!("# Demo\n{PROJECT_IMPORT}\nNever run tests automatically for hotfixes\n"),
    );

    let json = env.json(&["validate"]);
    assert_eq!(json["valid"], true);
    assert_eq!(json["summary"]["conflicts"], 1);
    let conflict = &json["conflicts"][0];
    assert_eq!(conflict["category"], "directive_conflict");
    assert_eq!(conflict["marrSource"], "prj-testing-standard.md");
    assert_eq!(conflict["existing"], "Never run tests automatically for hotfixes");
    assert_eq!(conflict["line"], 3);
}

#[test]
fn validate_strict_fails_on_conflicts_only() {
    let env = Env::initialized();
    env.put("CLAUDE.md", "# Demo\n");

    env.marr().arg("validate").assert().success();
    env.marr().args(["validate", "--strict"]).assert().failure();
    env.marr()
        .args(["validate", "--conflicts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing MARR import line").not())
        .stdout(predicate::str::contains("doesn't import MARR"));
}

// ---------------------------------------------------------------------------
// marr doctor
// ---------------------------------------------------------------------------

#[test]
fn doctor_clean_project() {
    let env = Env::initialized();
    env.marr()
        .args(["doctor", "--project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No conflicts detected"));
}

#[test]
fn doctor_auto_adds_import_and_backs_up() {
    let env = Env::initialized();
    env.put("CLAUDE.md", "# Demo\n\nNotes.\n");

    let json = env.json(&["doctor", "--project", "--auto"]);
    assert_eq!(json["conflictsFound"], 1);
    assert_eq!(json["summary"]["resolved"], 1);
    assert_eq!(json["actions"][0]["resolution"], "Add import");
    assert_eq!(json["backups"].as_array().unwrap().len(), 1);

    assert!(env.read("CLAUDE.md").contains(PROJECT_IMPORT));
    assert_eq!(backups_of(&env.project.path().join("CLAUDE.md")), 1);

    env.marr()
        .args(["validate", "--strict"])
        .assert()
        .success();
}

#[test]
fn doctor_dry_run_changes_nothing() {
    let env = Env::initialized();
    env.put("CLAUDE.md", "# Demo\n");

    env.marr()
        .args(["doctor", "--project", "--auto", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would apply: Add import"));

    assert_eq!(env.read("CLAUDE.md"), "# Demo\n");
    assert_eq!(backups_of(&env.project.path().join("CLAUDE.md")), 0);
}

#[test]
fn doctor_interactive_reads_choices() {
    let env = Env::initialized();
    env.put(
        "CLAUDE.md",
        &format!("# Demo\n{PROJECT_IMPORT}\nNever run tests automatically\nKeep me\n"),
    );

    env.marr()
        .args(["doctor", "--project"])
        .write_stdin("m\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/1] Directive Conflict"))
        .stdout(predicate::str::contains("[m] Adopt standard (recommended)"))
        .stdout(predicate::str::contains("Resolved: 1"));

    assert_eq!(
        env.read("CLAUDE.md"),
        format!("# Demo\n{PROJECT_IMPORT}\nKeep me\n")
    );
}

#[test]
fn doctor_invalid_choice_is_skipped() {
    let env = Env::initialized();
    env.put("CLAUDE.md", "# Demo\n");

    let json = env.json_with_stdin(&["doctor", "--project"], "zz\n");
    assert_eq!(json["summary"]["skipped"], 1);
    assert_eq!(json["actions"][0]["resolution"], "skipped");
    assert_eq!(json["actions"][0]["error"], "Invalid choice");
    assert_eq!(env.read("CLAUDE.md"), "# Demo\n");
}

#[test]
fn doctor_user_scope_uses_user_import() {
    let env = Env::initialized();
    let user_config = env.home.path().join(".claude/CLAUDE.md");
    std::fs::create_dir_all(user_config.parent().unwrap()).unwrap();
    std::fs::write(&user_config, "# Me\n").unwrap();

    env.marr()
        .args(["doctor", "--user", "--auto"])
        .assert()
        .success();
    let content = std::fs::read_to_string(&user_config).unwrap();
    assert!(content.contains("@~/.claude/marr/MARR-USER-CLAUDE.md"));
}

#[test]
fn doctor_summary_counts() {
    let env = Env::initialized();
    let json = env.json(&["doctor", "--project", "--summary"]);
    assert_eq!(json["scan"]["standards"], 1);
    assert_eq!(json["scan"]["directives"], 2);
    assert_eq!(json["conflictsFound"], 0);
}

// ---------------------------------------------------------------------------
// marr standard
// ---------------------------------------------------------------------------

#[test]
fn standard_validate_all() {
    let env = Env::initialized();
    env.marr()
        .args(["standard", "validate", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prj-testing-standard.md: valid"));

    env.put(".claude/marr/standards/prj-bad.md", "---\nmarr: standard\nversion: 1\n---\n");
    env.marr()
        .args(["standard", "validate", "--all"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("title: "));
}

#[test]
fn standard_validate_by_name() {
    let env = Env::initialized();
    env.marr()
        .args(["standard", "validate", "prj-testing-standard.md"])
        .assert()
        .success();
    env.marr()
        .args(["standard", "validate", "prj-missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn standard_create_then_list() {
    let env = Env::initialized();
    env.marr()
        .args(["standard", "create", "code-review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("prj-code-review.md"));
    env.marr()
        .args(["standard", "create", "code-review"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let json = env.json(&["standard", "list"]);
    let titles: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["frontmatter"]["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Code Review Standard", "Testing Standard"]);
}

#[test]
fn standard_sync_rewrites_trigger_table() {
    let env = Env::initialized();
    env.marr()
        .args(["standard", "sync", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 standard(s) would be synced"));
    assert_eq!(env.read(".claude/marr/MARR-PROJECT-CLAUDE.md"), SYSTEM_CONFIG);

    env.marr().args(["standard", "sync"]).assert().success();
    let content = env.read(".claude/marr/MARR-PROJECT-CLAUDE.md");
    assert!(content.contains("### `prj-testing-standard.md`\nRead this standard when:\n- WHEN running tests"));
    assert!(!content.contains("(generated)"));
    assert!(content.ends_with("## Notes\n"));
}

// ---------------------------------------------------------------------------
// marr backup
// ---------------------------------------------------------------------------

#[test]
fn backup_list_restore_clean() {
    let env = Env::initialized();
    for day in 1..=3 {
        env.put(&format!("CLAUDE.md.202601{day:02}-120000.bak"), &format!("v{day}"));
    }

    let json = env.json(&["backup", "list", "CLAUDE.md"]);
    let listed = json.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed[0]["backupPath"]
        .as_str()
        .unwrap()
        .ends_with("CLAUDE.md.20260103-120000.bak"));

    env.marr()
        .args(["backup", "restore", "CLAUDE.md.20260102-120000.bak"])
        .assert()
        .success();
    assert_eq!(env.read("CLAUDE.md"), "v2");

    env.marr()
        .args(["backup", "clean", "CLAUDE.md", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 old backup(s)"));
    assert_eq!(backups_of(&env.project.path().join("CLAUDE.md")), 1);
}

#[test]
fn backup_restore_rejects_bad_name() {
    let env = Env::initialized();
    env.put("CLAUDE.md.bak", "x");
    env.marr()
        .args(["backup", "restore", "CLAUDE.md.bak"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid backup filename"));
}
