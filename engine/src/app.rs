//! Coordinating state between a [`Document`] and the terminal UI.
//!
//! `App` is the single consumer of the document's build events. The UI calls
//! the action methods and renders the accessors; it never touches the
//! session directly.

use std::path::PathBuf;

use natty_navigate::{NavigateError, Navigator};
use natty_types::{BuildEvent, BuildState, Diagnostic, LineNumber, OutputStream, StatusSummary, strip_escapes};
use tokio::sync::mpsc;

use crate::document::Document;
use crate::session::BuildEvents;

/// Process events applied per tick, so a chatty build cannot starve input.
pub const EVENT_BUDGET: usize = 512;

/// Oldest transcript lines are dropped past this many.
const MAX_TRANSCRIPT_LINES: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Command,
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Transcript,
    Diagnostics,
}

impl Focus {
    fn toggle(self) -> Self {
        match self {
            Focus::Transcript => Focus::Diagnostics,
            Focus::Diagnostics => Focus::Transcript,
        }
    }
}

enum OpenRequest {
    Reference { file: String, line: LineNumber },
    Text(String),
}

pub struct App {
    document: Document,
    events: BuildEvents,
    transcript: Vec<TranscriptLine>,
    /// Highlighted transcript line; `None` follows the tail.
    transcript_cursor: Option<usize>,
    selected_diagnostic: Option<usize>,
    focus: Focus,
    notice: Option<String>,
    bell: bool,
    should_quit: bool,
    pending_opens: usize,
    open_tx: mpsc::UnboundedSender<Result<PathBuf, NavigateError>>,
    open_rx: mpsc::UnboundedReceiver<Result<PathBuf, NavigateError>>,
}

impl App {
    #[must_use]
    pub fn new(document: Document, events: BuildEvents) -> Self {
        let (open_tx, open_rx) = mpsc::unbounded_channel();
        Self {
            document,
            events,
            transcript: Vec::new(),
            transcript_cursor: None,
            selected_diagnostic: None,
            focus: Focus::default(),
            notice: None,
            bell: false,
            should_quit: false,
            pending_opens: 0,
            open_tx,
            open_rx,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    #[must_use]
    pub fn transcript_cursor(&self) -> Option<usize> {
        self.transcript_cursor
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.document.diagnostics()
    }

    #[must_use]
    pub fn selected_diagnostic(&self) -> Option<usize> {
        self.selected_diagnostic
    }

    #[must_use]
    pub fn focus(&self) -> Focus {
        self.focus
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> StatusSummary {
        self.document.status()
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether an editor launch is still being resolved.
    #[must_use]
    pub fn is_opening(&self) -> bool {
        self.pending_opens > 0
    }

    /// Whether the UI should ring the bell; resets the request.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell)
    }

    /// Apply pending session and editor-launch events.
    pub fn tick(&mut self) {
        self.document.session_mut().poll_events(EVENT_BUDGET);
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event);
        }
        while let Ok(outcome) = self.open_rx.try_recv() {
            self.apply_open_outcome(outcome);
        }
    }

    fn apply_event(&mut self, event: BuildEvent) {
        match event {
            BuildEvent::StateChanged(BuildState::Building) => {
                self.selected_diagnostic = None;
                self.focus = Focus::Transcript;
                self.notice = None;
            }
            BuildEvent::StateChanged(BuildState::Built(code)) => {
                self.push_text(LineKind::Stdout, "");
                if code != 0 && !self.document.diagnostics().is_empty() {
                    self.focus = Focus::Diagnostics;
                    self.selected_diagnostic.get_or_insert(0);
                }
            }
            BuildEvent::StateChanged(BuildState::Canceled) => {
                self.push_text(LineKind::Stdout, "");
                self.selected_diagnostic = None;
                self.focus = Focus::Transcript;
            }
            BuildEvent::StateChanged(BuildState::Idle) => {}
            BuildEvent::CommandEcho(text) => self.push_text(LineKind::Command, &text),
            BuildEvent::Output { stream, chunk } => {
                let kind = match stream {
                    OutputStream::Stdout => LineKind::Stdout,
                    OutputStream::Stderr => LineKind::Stderr,
                };
                self.push_text(kind, &chunk);
            }
            BuildEvent::Diagnostic(_) => {
                self.selected_diagnostic.get_or_insert(0);
            }
        }
    }

    fn push_text(&mut self, kind: LineKind, text: &str) {
        let clean = strip_escapes(text);
        let clean: &str = &clean;
        let body = clean.strip_suffix('\n').unwrap_or(clean);
        for line in body.split('\n') {
            self.transcript.push(TranscriptLine {
                kind,
                text: line.trim_end_matches('\r').to_string(),
            });
        }

        let excess = self.transcript.len().saturating_sub(MAX_TRANSCRIPT_LINES);
        if excess > 0 {
            self.transcript.drain(..excess);
            self.transcript_cursor = self
                .transcript_cursor
                .map(|cursor| cursor.saturating_sub(excess));
        }
    }

    fn apply_open_outcome(&mut self, outcome: Result<PathBuf, NavigateError>) {
        self.pending_opens = self.pending_opens.saturating_sub(1);
        match outcome {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Opened in editor");
                self.notice = None;
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!("{err}");
                self.bell = true;
            }
            Err(err) => {
                tracing::warn!("{err}");
                self.notice = Some(format!("Couldn't open the file: {err}"));
            }
        }
    }

    // ---- actions ----------------------------------------------------------

    pub fn build(&mut self) {
        if !self.document.can_build() {
            self.bell = true;
            return;
        }
        if let Err(err) = self.document.build() {
            // Spawn failures are already in the transcript; this is the short form.
            self.notice = Some(err.to_string());
        }
    }

    pub fn cancel(&mut self) {
        if !self.document.cancel() {
            self.bell = true;
        }
    }

    pub fn next_target(&mut self) {
        if self.document.state().is_building() || self.document.next_target().is_none() {
            self.bell = true;
        }
    }

    pub fn previous_target(&mut self) {
        if self.document.state().is_building() || self.document.previous_target().is_none() {
            self.bell = true;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = self.focus.toggle();
        if self.focus == Focus::Diagnostics && self.selected_diagnostic.is_none() {
            self.selected_diagnostic = (!self.diagnostics().is_empty()).then_some(0);
        }
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Diagnostics => {
                self.selected_diagnostic = self.selected_diagnostic.map(|i| i.saturating_sub(1));
            }
            Focus::Transcript => {
                let last = self.transcript.len().checked_sub(1);
                self.transcript_cursor = match self.transcript_cursor {
                    Some(cursor) => Some(cursor.saturating_sub(1)),
                    None => last,
                };
            }
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Diagnostics => {
                let count = self.diagnostics().len();
                self.selected_diagnostic = match self.selected_diagnostic {
                    Some(i) if i + 1 < count => Some(i + 1),
                    Some(i) => Some(i),
                    None if count > 0 => Some(0),
                    None => None,
                };
            }
            Focus::Transcript => {
                self.transcript_cursor = match self.transcript_cursor {
                    Some(cursor) if cursor + 1 < self.transcript.len() => Some(cursor + 1),
                    _ => None,
                };
            }
        }
    }

    /// Open the selected diagnostic or transcript line in the editor.
    ///
    /// Resolution walks the project tree, so it runs on the blocking pool;
    /// the outcome is applied by a later [`App::tick`].
    pub fn open_selected(&mut self) {
        let request = match self.focus {
            Focus::Diagnostics => self
                .selected_diagnostic
                .and_then(|i| self.diagnostics().get(i))
                .map(|d| OpenRequest::Reference {
                    file: d.file().to_string(),
                    line: d.line(),
                }),
            Focus::Transcript => self
                .transcript_cursor
                .and_then(|i| self.transcript.get(i))
                .map(|l| OpenRequest::Text(l.text.clone())),
        };
        let Some(request) = request else {
            self.bell = true;
            return;
        };

        let navigator: Navigator = self.document.navigator().clone();
        let tx = self.open_tx.clone();
        self.pending_opens += 1;
        tokio::task::spawn_blocking(move || {
            let outcome = match request {
                OpenRequest::Reference { file, line } => navigator.open(&file, line),
                OpenRequest::Text(text) => navigator.open_line(&text),
            };
            let _ = tx.send(outcome);
        });
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
        self.transcript_cursor = None;
    }

    pub fn quit(&mut self) {
        if self.document.state().is_building() {
            self.document.cancel();
        }
        self.should_quit = true;
    }
}
