//! Plain-text output with optional color.

use std::fmt::Write as _;

use yansi::Paint;

use super::{ScanReport, ScanStatus, StatusReport};

/// Render a scan report.
///
/// Groups are separated by blank lines and followed by where the state was
/// saved; a failed scan renders only its error.
#[must_use]
pub fn render_scan(report: &ScanReport, color: bool) -> String {
    let mut out = String::new();

    if report.status == ScanStatus::Failed {
        let _ = writeln!(
            out,
            "{} {}",
            paint_if("Scan halted:", color, |s| s.red().bold()),
            report.last_error.as_deref().unwrap_or("unknown error")
        );
        return out;
    }

    if report.has_duplicates() {
        for (i, group) in report.groups.iter().enumerate() {
            let heading = format!("Group {} ({} files)", i + 1, group.len());
            let _ = writeln!(out, "{}", paint_if(&heading, color, |s| s.cyan().bold()));
            for path in group {
                let _ = writeln!(out, "  {}", path);
            }
            out.push('\n');
        }

        let summary = format!(
            "{} duplicate groups, {} files, {} redundant copies",
            report.stats.groups, report.stats.duplicate_files, report.stats.redundant_files
        );
        let _ = writeln!(out, "{}", paint_if(&summary, color, |s| s.green()));
    } else {
        let _ = writeln!(out, "No duplicates found under {}", report.root);
    }

    match (&report.checkpoint, report.checkpoint_saved) {
        (Some(path), true) => {
            let _ = writeln!(out, "State saved at: {}", path);
        }
        (Some(path), false) => {
            let _ = writeln!(
                out,
                "{} {}",
                paint_if("Not possible to save state at:", color, |s| s.yellow()),
                path
            );
        }
        (None, _) => {
            let _ = writeln!(out, "State not saved (no checkpoint destination)");
        }
    }
    out
}

/// Render the contents of a checkpoint file.
#[must_use]
pub fn render_status(report: &StatusReport, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        paint_if("Checkpoint:", color, |s| s.bold()),
        report.checkpoint
    );

    if report.entries.is_empty() {
        out.push_str("  no stored scans\n");
        return out;
    }

    for entry in &report.entries {
        let state = match (&entry.last_error, entry.cursor) {
            (Some(_), cursor) => format!("halted before stage {}", cursor + 1),
            (None, 0) if entry.duplicate_groups.is_some() => "complete".to_string(),
            (None, 0) => "not started".to_string(),
            (None, cursor) => format!("resumable at stage {}", cursor + 1),
        };
        let _ = writeln!(out, "  {} [{}]", entry.root, state);
        if let Some(files) = entry.indexed_files {
            let _ = writeln!(out, "    indexed files: {}", files);
        }
        if let Some(groups) = entry.duplicate_groups {
            let _ = writeln!(out, "    duplicate groups: {}", groups);
        }
        if let Some(err) = &entry.last_error {
            let _ = writeln!(out, "    last error: {}", paint_if(err, color, |s| s.red()));
        }
    }
    out
}

fn paint_if<F>(text: &str, color: bool, style: F) -> String
where
    F: FnOnce(&str) -> yansi::Painted<&str>,
{
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}
