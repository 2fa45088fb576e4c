//! Output rendering and formatting

use comfy_table::presets::{ASCII_FULL, UTF8_FULL};
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use imgaudit_engine::{BatchVerification, RegistrationSummary, VerificationResult};
use imgaudit_store::{EditRecord, FileRecord, RemovedRecord};
use imgaudit_types::{Classification, ColorChoice, OutputFormat};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

/// Result of a command, rendered once it completes
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutput {
    Registration(RegistrationSummary),
    Verification(BatchVerification),
    Approved { edit: EditRecord },
    History { path: PathBuf, edits: Vec<EditRecord> },
    Chain { path: PathBuf, links: usize },
    Removed(RemovedRecord),
    Records { records: Vec<FileRecord> },
    Report {
        #[serde(skip_serializing_if = "Option::is_none")]
        written_to: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        files: usize,
    },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    format: OutputFormat,
    color_choice: ColorChoice,
    term: Term,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat, color_choice: ColorChoice) -> Self {
        Self {
            format,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render a command result
    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            let json = serde_json::to_string_pretty(output).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match output {
            CommandOutput::Registration(summary) => self.render_registration(summary),
            CommandOutput::Verification(batch) => self.render_verification(batch),
            CommandOutput::Approved { edit } => {
                self.render_success(&format!(
                    "Approved {} edit {} -> {}",
                    edit.edit_type,
                    edit.previous_hash.display_prefix(),
                    edit.new_hash.display_prefix()
                ));
                Ok(())
            }
            CommandOutput::History { path, edits } => self.render_history(path, edits),
            CommandOutput::Chain { path, links } => {
                self.render_success(&format!(
                    "Hash chain intact for {} ({links} edit(s))",
                    path.display()
                ));
                Ok(())
            }
            CommandOutput::Removed(removed) => {
                self.render_success(&format!(
                    "Removed {} and {} edit record(s)",
                    removed.record.filepath.display(),
                    removed.edits_removed
                ));
                Ok(())
            }
            CommandOutput::Records { records } => self.render_records(records),
            CommandOutput::Report {
                written_to, text, ..
            } => {
                if let Some(text) = text {
                    print!("{text}");
                }
                if let Some(path) = written_to {
                    self.render_success(&format!("Report generated: {}", path.display()));
                }
                Ok(())
            }
        }
    }

    fn new_table(&self) -> Table {
        let mut table = Table::new();
        let preset = if self.format == OutputFormat::Plain {
            ASCII_FULL
        } else {
            UTF8_FULL
        };
        table
            .load_preset(preset)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.supports_color() {
            table.force_no_tty();
        }
        table
    }

    fn header(names: &[&str]) -> Vec<Cell> {
        names
            .iter()
            .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
            .collect()
    }

    fn render_registration(&self, summary: &RegistrationSummary) -> io::Result<()> {
        if !summary.registered.is_empty() {
            let mut table = self.new_table();
            table.set_header(Self::header(&["File", "Hash", "Size", "Registered By"]));
            for record in &summary.registered {
                table.add_row(vec![
                    Cell::new(record.filepath.display()),
                    Cell::new(record.original_hash.display_prefix()),
                    Cell::new(format_size(record.file_size)),
                    Cell::new(&record.registered_by),
                ]);
            }
            println!("{table}");
        }

        for failure in &summary.failures {
            let mut line = format!(
                "{}: {}",
                failure.path.display(),
                failure.failure.message
            );
            if let Some(hint) = &failure.failure.hint {
                line.push_str(&format!(" ({hint})"));
            }
            println!("{}", self.paint(&line, &Style::new().yellow()));
        }

        println!(
            "Registered {} of {} file(s)",
            summary.registered.len(),
            summary.total()
        );
        Ok(())
    }

    fn render_verification(&self, batch: &BatchVerification) -> io::Result<()> {
        if batch.results.len() == 1 && !batch.interrupted {
            self.render_single_result(&batch.results[0]);
            return Ok(());
        }

        if !batch.results.is_empty() {
            let mut table = self.new_table();
            table.set_header(Self::header(&["File", "Result", "Details"]));
            for result in &batch.results {
                table.add_row(vec![
                    Cell::new(result.path.display()),
                    self.classification_cell(result.classification),
                    Cell::new(&result.message),
                ]);
            }
            println!("{table}");
        }

        let counts = &batch.counts;
        println!(
            "Verification complete: {} clean, {} approved modification, {} tampered, {} not registered, {} error(s)",
            counts.verified,
            counts.approved_modification,
            counts.tampered,
            counts.unregistered,
            counts.errors
        );
        if batch.interrupted {
            println!(
                "{}",
                self.paint(
                    "Interrupted: remaining files were not checked",
                    &Style::new().yellow()
                )
            );
        }
        Ok(())
    }

    fn render_single_result(&self, result: &VerificationResult) {
        let label = self.paint(
            result.classification.label(),
            &classification_style(result.classification),
        );
        println!("{}: {label}", result.path.display());
        println!("  {}", result.message);

        if matches!(
            result.classification,
            Classification::Tampered | Classification::Error | Classification::ApprovedModification
        ) {
            if let Some(stored) = result.stored_hash_prefix() {
                println!("  Stored hash:  {stored}");
            }
            if let Some(current) = result.current_hash_prefix() {
                println!("  Current hash: {current}");
            }
            if let Some(size) = result.size_stored {
                println!("  Stored size:  {}", format_size(size));
            }
            if let Some(size) = result.size_current {
                println!("  Current size: {}", format_size(size));
            }
        }
    }

    fn render_history(&self, path: &std::path::Path, edits: &[EditRecord]) -> io::Result<()> {
        if edits.is_empty() {
            println!("No approved edits for {}", path.display());
            return Ok(());
        }

        let mut table = self.new_table();
        table.set_header(Self::header(&[
            "Date",
            "Type",
            "Description",
            "Approved By",
            "Software",
            "Hash Change",
        ]));
        for edit in edits {
            table.add_row(vec![
                Cell::new(
                    edit.edit_date
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S"),
                ),
                Cell::new(edit.edit_type),
                Cell::new(&edit.edit_description),
                Cell::new(&edit.approved_by),
                Cell::new(&edit.software_used),
                Cell::new(format!(
                    "{} -> {}",
                    edit.previous_hash.prefix(8),
                    edit.new_hash.prefix(8)
                )),
            ]);
        }
        println!("Edit history for {}", self.style_path(path));
        println!("{table}");
        Ok(())
    }

    fn render_records(&self, records: &[FileRecord]) -> io::Result<()> {
        if records.is_empty() {
            println!("No files registered.");
            return Ok(());
        }

        let mut table = self.new_table();
        table.set_header(Self::header(&[
            "File",
            "Status",
            "Current Hash",
            "Size",
            "Registered",
            "Last Verified",
        ]));
        for record in records {
            let status = match record.status {
                imgaudit_types::FileStatus::Original => Cell::new(record.status),
                imgaudit_types::FileStatus::ApprovedEdit => {
                    Cell::new(record.status).fg(Color::Cyan)
                }
            };
            table.add_row(vec![
                Cell::new(record.filepath.display()),
                status,
                Cell::new(record.current_hash.display_prefix()),
                Cell::new(format_size(record.file_size)),
                Cell::new(
                    record
                        .created_date
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M"),
                ),
                Cell::new(record.last_verified.map_or_else(
                    || "Never".to_string(),
                    |at| at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string(),
                )),
            ]);
        }
        println!("{table}");
        println!("{} file(s) registered", records.len());
        Ok(())
    }

    fn render_success(&self, message: &str) {
        println!("{}", self.paint(message, &Style::new().green()));
    }

    fn classification_cell(&self, classification: Classification) -> Cell {
        let cell = Cell::new(classification.label());
        if !self.supports_color() {
            return cell;
        }
        match classification {
            Classification::Verified => cell.fg(Color::Green),
            Classification::ApprovedModification => cell.fg(Color::Cyan),
            Classification::Tampered | Classification::Error => {
                cell.fg(Color::Red).add_attribute(Attribute::Bold)
            }
            Classification::Unregistered => cell.fg(Color::Yellow),
        }
    }

    fn style_path(&self, path: &std::path::Path) -> String {
        self.paint(&path.display().to_string(), &Style::new().bold())
    }

    fn paint(&self, text: &str, style: &Style) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn supports_color(&self) -> bool {
        if self.format == OutputFormat::Plain {
            return false;
        }
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn classification_style(classification: Classification) -> Style {
    match classification {
        Classification::Verified => Style::new().green(),
        Classification::ApprovedModification => Style::new().cyan(),
        Classification::Tampered | Classification::Error => Style::new().red().bold(),
        Classification::Unregistered => Style::new().yellow(),
    }
}

/// Format a byte count for display
fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_scale_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
