//! Event handling and status display

use console::{Style, Term};
use imgaudit_events::{
    AppEvent, EditEvent, GeneralEvent, RegistryEvent, VerificationEvent,
};

/// Prints status lines for engine events on stderr
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Files checked in the running batch, for progress lines
    batch_progress: Option<(usize, usize)>,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            batch_progress: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        if self.debug_enabled {
            event.log();
        }

        match event {
            AppEvent::General(event) => self.handle_general(event),
            AppEvent::Registry(event) => self.handle_registry(event),
            AppEvent::Verification(event) => self.handle_verification(event),
            AppEvent::Edit(event) => self.handle_edit(event),
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => {
                let line = match context {
                    Some(context) => format!("Warning: {message} ({context})"),
                    None => format!("Warning: {message}"),
                };
                self.show(&line, &Style::new().yellow());
            }
            GeneralEvent::OperationFailed { operation, failure } => {
                self.show(
                    &format!("{operation} failed: {}", failure.message),
                    &Style::new().red(),
                );
            }
            GeneralEvent::OperationCompleted {
                operation,
                success: false,
            } => {
                self.show(
                    &format!("{operation} finished with problems"),
                    &Style::new().yellow(),
                );
            }
            GeneralEvent::OperationStarted { .. } | GeneralEvent::OperationCompleted { .. } => {}
        }
    }

    fn handle_registry(&self, event: RegistryEvent) {
        match event {
            RegistryEvent::FileRegistered {
                path, hash_prefix, ..
            } => {
                self.show(
                    &format!("Registered {} ({hash_prefix})", path.display()),
                    &Style::new().green(),
                );
            }
            RegistryEvent::RegistrationFailed { path, failure } => {
                self.show(
                    &format!("Could not register {}: {}", path.display(), failure.message),
                    &Style::new().yellow(),
                );
            }
            RegistryEvent::DirectoryScanned { root, matched } => {
                self.show(
                    &format!("Found {matched} matching file(s) under {}", root.display()),
                    &Style::new().dim(),
                );
            }
            RegistryEvent::FileRemoved { .. } => {}
        }
    }

    fn handle_verification(&mut self, event: VerificationEvent) {
        match event {
            VerificationEvent::BatchStarted { total } => {
                self.batch_progress = (total > 1).then_some((0, total));
            }
            VerificationEvent::Completed { path, .. } => {
                if let Some((done, total)) = self.batch_progress.as_mut() {
                    *done += 1;
                    let line = format!("[{done}/{total}] {}", path.display());
                    self.show(&line, &Style::new().dim());
                }
            }
            VerificationEvent::BatchCompleted { interrupted, .. } => {
                if interrupted {
                    self.show("Verification cancelled", &Style::new().yellow());
                }
                self.batch_progress = None;
            }
            VerificationEvent::Started { .. } => {}
        }
    }

    fn handle_edit(&self, event: EditEvent) {
        match event {
            EditEvent::Approved {
                path,
                edit_type,
                approved_by,
                ..
            } => {
                self.show(
                    &format!("{edit_type} on {} approved by {approved_by}", path.display()),
                    &Style::new().green(),
                );
            }
            EditEvent::NothingToApprove { path } => {
                self.show(
                    &format!("{} is unchanged since the last approval", path.display()),
                    &Style::new().yellow(),
                );
            }
        }
    }

    fn show(&self, message: &str, style: &Style) {
        let line = if self.colors_enabled {
            style.apply_to(message).to_string()
        } else {
            message.to_string()
        };
        let _ = self.term.write_line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn tracks_batch_progress() {
        let mut handler = EventHandler::new(false, false);
        handler.handle_event(AppEvent::Verification(VerificationEvent::BatchStarted {
            total: 2,
        }));
        handler.handle_event(AppEvent::Verification(VerificationEvent::Completed {
            path: PathBuf::from("/lab/a.scn"),
            classification: imgaudit_types::Classification::Verified,
            message: "ok".into(),
        }));
        assert_eq!(handler.batch_progress, Some((1, 2)));

        handler.handle_event(AppEvent::Verification(VerificationEvent::BatchCompleted {
            counts: imgaudit_events::BatchCounts::default(),
            interrupted: false,
        }));
        assert!(handler.batch_progress.is_none());
    }

    #[test]
    fn single_file_verification_has_no_progress() {
        let mut handler = EventHandler::new(false, false);
        handler.handle_event(AppEvent::Verification(VerificationEvent::BatchStarted {
            total: 1,
        }));
        assert!(handler.batch_progress.is_none());
    }
}
