//! Clipboard access through the platform's copy command.

use std::io::Write;
use std::process::{Command, Stdio};

use crate::export::{ExportError, ExportResult};

/// Something that can receive copied text.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> ExportResult<()>;
}

/// Copy commands tried in order, with their arguments.
const COPY_COMMANDS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

/// Pipes text into the first copy command found on the system.
#[derive(Debug, Default)]
pub struct SystemClipboard {
    /// Index into the command list of the command that last worked
    working: Option<usize>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn pipe(program: &str, args: &[&str], text: &str) -> std::io::Result<bool> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        Ok(child.wait()?.success())
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> ExportResult<()> {
        let start = self.working.unwrap_or(0);
        for (i, (program, args)) in COPY_COMMANDS.iter().enumerate().skip(start) {
            match Self::pipe(program, args, text) {
                Ok(true) => {
                    log::debug!("copied {} bytes with {}", text.len(), program);
                    self.working = Some(i);
                    return Ok(());
                }
                Ok(false) => log::debug!("{} exited with an error", program),
                Err(e) => log::debug!("{} unavailable: {}", program, e),
            }
        }
        self.working = None;
        Err(ExportError::Clipboard(
            "no clipboard command found (install wl-copy, xclip or xsel)".to_string(),
        ))
    }
}

/// In-memory clipboard, for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> ExportResult<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
