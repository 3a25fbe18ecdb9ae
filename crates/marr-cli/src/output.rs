use marr_core::conflict::{Conflict, Severity};
use serde::Serialize;
use std::path::Path;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Print an underlined section heading.
pub fn section(title: &str) {
    println!("\n{title}\n{}", "=".repeat(title.len()));
}

/// `path` relative to `root` when it lies inside it.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print one conflict's details, without its resolution menu.
pub fn print_conflict(root: &Path, conflict: &Conflict) {
    let icon = match conflict.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
    };
    println!("\n{icon} {}", conflict.description);
    let location = display_path(root, &conflict.location);
    match conflict.line {
        Some(line) => println!("  Location: {location}:{line}"),
        None => println!("  Location: {location}"),
    }
    println!("  Found: \"{}\"", conflict.existing);
    if let Some(expects) = &conflict.marr_expects {
        println!("  MARR expects: {expects}");
    }
    if let Some(source) = &conflict.marr_source {
        println!("  Source: {source}");
    }
}
