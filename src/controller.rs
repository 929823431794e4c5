//! Application controller.
//!
//! This module orchestrates the main application loop:
//! - Terminal initialization and cleanup
//! - Event polling and handling
//! - Carrying out the effects queued by state transitions
//! - Collecting service responses from worker threads
//!
//! Each service request runs on its own thread and reports back over a
//! channel. The loop drains that channel between key presses, so responses
//! are applied on the UI thread only.

use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::client::{ApiClient, Completion, ServiceRequest, Ticket, STRUCTURE_SVG};
use crate::clipboard::Clipboard;
use crate::event::{apply_action, handle_event, poll_event};
use crate::export::{export, to_delimited_text, write_artifact, ExportFormat, WorkbookHandle};
use crate::model::{AppState, Effect, NoticeLevel, Panel};
use crate::ui::{glyphs::Glyphs, render};

/// Carries out effects and owns everything that talks to the outside world.
pub struct Executor {
    client: ApiClient,
    workbook: WorkbookHandle,
    clipboard: Box<dyn Clipboard>,
    svg_path: PathBuf,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    /// Set when an effect asks for the terminal bell
    bell: bool,
}

impl Executor {
    pub fn new(client: ApiClient, workbook: WorkbookHandle, clipboard: Box<dyn Clipboard>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            client,
            workbook,
            clipboard,
            svg_path: PathBuf::from(STRUCTURE_SVG),
            sender,
            receiver,
            bell: false,
        }
    }

    /// Carries out every queued effect.
    pub fn perform(&mut self, state: &mut AppState) {
        for effect in state.take_effects() {
            match effect {
                Effect::Submit(ticket, request) => self.submit(ticket, request),
                Effect::Export { panel, format, path } => {
                    self.export_table(state, panel, format, path)
                }
                Effect::Copy(panel) => self.copy(state, panel),
                Effect::Announce => self.bell = true,
            }
        }
    }

    /// Applies responses that have arrived. Returns true if any did.
    pub fn collect(&mut self, state: &mut AppState) -> bool {
        let mut any = false;
        while let Ok(completion) = self.receiver.try_recv() {
            state.complete(completion);
            any = true;
        }
        any
    }

    /// Takes the pending bell request.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    fn submit(&self, ticket: Ticket, request: ServiceRequest) {
        let client = self.client.clone();
        let sender = self.sender.clone();
        let svg_path = self.svg_path.clone();
        thread::spawn(move || {
            let outcome = client.execute(request, &svg_path);
            // The receiver is gone once the app has quit
            let _ = sender.send(Completion { ticket, outcome });
        });
    }

    fn export_table(&self, state: &mut AppState, panel: Panel, format: ExportFormat, path: Option<String>) {
        let table = state.table(panel);
        let records = table.sorted_records();
        let result = export(&records, format, &table.title, &self.workbook).and_then(|artifact| {
            let target = artifact.target_path(path.as_deref(), &table.file_stem);
            write_artifact(&artifact, &target)?;
            Ok((artifact, target))
        });
        match result {
            Ok((artifact, target)) => match artifact.warning {
                Some(warning) => state.notify(
                    NoticeLevel::Warning,
                    format!("{} Saved {}", warning, target.display()),
                ),
                None => state.notify(
                    NoticeLevel::Success,
                    format!("Exported {} rows to {}", records.len(), target.display()),
                ),
            },
            Err(e) => state.notify(NoticeLevel::Error, format!("Export failed: {}", e)),
        }
    }

    fn copy(&mut self, state: &mut AppState, panel: Panel) {
        let table = state.table(panel);
        let text = to_delimited_text(&table.sorted_records());
        let rows = table.len();
        match self.clipboard.set_text(&text) {
            Ok(()) => state.notify(NoticeLevel::Success, format!("Copied {} rows to clipboard", rows)),
            Err(e) => state.notify(NoticeLevel::Error, e.to_string()),
        }
    }
}

/// The main application controller.
pub struct App {
    /// Terminal backend
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Application state
    state: AppState,
    /// Side effect runner
    executor: Executor,
    /// Symbols used by the renderer
    glyphs: Glyphs,
    /// Event poll timeout
    tick_rate: Duration,
}

impl App {
    /// Creates a new application with the given state.
    pub fn new(state: AppState, executor: Executor, glyphs: Glyphs) -> Result<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            state,
            executor,
            glyphs,
            tick_rate: Duration::from_millis(50),
        })
    }

    /// Runs the main application loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.executor.perform(&mut self.state);
            self.executor.collect(&mut self.state);

            if self.executor.take_bell() {
                let backend = self.terminal.backend_mut();
                backend.write_all(b"\x07")?;
                backend.flush()?;
            }

            // Render
            self.terminal.draw(|frame| {
                render(frame, &self.state, &self.glyphs);
            })?;

            // Handle events
            if let Some(event) = poll_event(self.tick_rate) {
                let action = handle_event(event, &self.state.mode, self.state.show_help);
                apply_action(&mut self.state, action);

                if self.state.should_quit {
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Convenience function to run the application.
pub fn run_app(state: AppState, executor: Executor, glyphs: Glyphs) -> Result<()> {
    let mut app = App::new(state, executor, glyphs)?;
    app.run()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use crate::export::ExportResult;
    use crate::model::{Field, Record};

    /// Clipboard that shares what it received with the test.
    struct SharedClipboard(Rc<RefCell<Option<String>>>);

    impl Clipboard for SharedClipboard {
        fn set_text(&mut self, text: &str) -> ExportResult<()> {
            *self.0.borrow_mut() = Some(text.to_string());
            Ok(())
        }
    }

    fn executor(clipboard: Box<dyn Clipboard>) -> Executor {
        let client = ApiClient::new(None, DEFAULT_TIMEOUT).unwrap();
        Executor::new(client, WorkbookHandle::unavailable(), clipboard)
    }

    fn state_with_rows() -> AppState {
        let mut state = AppState::default();
        state.table_mut(Panel::Generated).replace(vec![
            Record::new("UUUU").with(Field::Kd, "<2"),
            Record::new("AAAA").with(Field::Kd, 7.0),
        ]);
        state.select_sort(Field::Sequence);
        state
    }

    #[test]
    fn test_copy_uses_display_order() {
        let contents = Rc::new(RefCell::new(None));
        let mut executor = executor(Box::new(SharedClipboard(contents.clone())));
        let mut state = state_with_rows();
        state.request_copy();
        executor.perform(&mut state);

        let copied = contents.borrow().clone().unwrap();
        let lines: Vec<&str> = copied.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1\tAAAA"));
        assert!(lines[2].ends_with("<2"));
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Success));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut executor = executor(Box::new(crate::clipboard::MemoryClipboard::default()));
        let mut state = state_with_rows();
        state.request_export(ExportFormat::Txt, Some(path.display().to_string()));
        executor.perform(&mut state);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("#\tSequence"));
        assert!(written.contains("1\tAAAA"));
    }

    #[test]
    fn test_xlsx_export_falls_back_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut executor = executor(Box::new(crate::clipboard::MemoryClipboard::default()));
        let mut state = state_with_rows();
        state.request_export(ExportFormat::Xlsx, Some(path.display().to_string()));
        executor.perform(&mut state);

        assert!(dir.path().join("out.csv").exists());
        assert!(!path.exists());
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Warning));
    }

    #[test]
    fn test_unconfigured_service_reports_error() {
        let mut executor = executor(Box::new(crate::clipboard::MemoryClipboard::default()));
        let mut state = AppState::default();
        state.generate_form.reference = "ACGU".to_string();
        state.request_generate();
        executor.perform(&mut state);

        let completion = executor.receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        state.complete(completion);
        assert!(!state.pending.generate);
        assert_eq!(state.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_announce_sets_bell() {
        let mut executor = executor(Box::new(crate::clipboard::MemoryClipboard::default()));
        let mut state = AppState::default();
        state.effects.push(Effect::Announce);
        executor.perform(&mut state);
        assert!(executor.take_bell());
        assert!(!executor.take_bell());
    }
}
