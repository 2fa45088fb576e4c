//! Plain-text audit report

use chrono::{DateTime, Local, Utc};
use imgaudit_store::{EditRecord, FileRecord};
use std::fmt::Write;

const RULE_WIDTH: usize = 70;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIME_FORMAT).to_string()
}

/// Render every record with its edits, oldest edit first
pub fn render(entries: &[(FileRecord, Vec<EditRecord>)], generated: DateTime<Local>) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out, "FILE INTEGRITY MONITORING REPORT");
    let _ = writeln!(out, "Generated: {}", generated.format(TIME_FORMAT));
    let _ = writeln!(out, "Files: {}", entries.len());
    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(out);

    for (record, edits) in entries {
        let _ = writeln!(out, "Filename: {}", record.filename);
        let _ = writeln!(out, "Path: {}", record.filepath.display());
        let _ = writeln!(out, "Algorithm: {}", record.algorithm());
        let _ = writeln!(out, "Original Hash: {}", record.original_hash);
        let _ = writeln!(out, "Current Hash: {}", record.current_hash);
        let _ = writeln!(out, "Size: {} bytes", record.file_size);
        let _ = writeln!(
            out,
            "Registered: {} by {}",
            local(record.created_date),
            record.registered_by
        );
        let _ = writeln!(
            out,
            "Last Verified: {}",
            record.last_verified.map_or_else(|| "Never".to_string(), local)
        );
        let _ = writeln!(
            out,
            "Last Modified: {}",
            record.last_modified.map_or_else(|| "Never".to_string(), local)
        );
        let _ = writeln!(out, "Status: {}", record.status);
        if let Some(notes) = &record.notes {
            let _ = writeln!(out, "Notes: {notes}");
        }

        if edits.is_empty() {
            let _ = writeln!(out, "Edit History: none");
        } else {
            let _ = writeln!(out, "Edit History ({}):", edits.len());
            for (index, edit) in edits.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. {} {} by {} using {}",
                    index + 1,
                    local(edit.edit_date),
                    edit.edit_type,
                    edit.approved_by,
                    edit.software_used
                );
                let _ = writeln!(out, "     {}", edit.edit_description);
                let _ = writeln!(
                    out,
                    "     {} -> {}",
                    edit.previous_hash.display_prefix(),
                    edit.new_hash.display_prefix()
                );
            }
        }
        let _ = writeln!(out, "{light}");
        let _ = writeln!(out);
    }

    out
}
