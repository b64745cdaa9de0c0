//! Status line summarization.
//!
//! Pure functions of diagnostics, exit code and elapsed time. The UI only
//! renders the result; it never recomputes counts itself.

use std::time::Duration;

use crate::{BuildState, Diagnostic};

/// Colour class of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTone {
    #[default]
    Normal,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSummary {
    text: String,
    tone: StatusTone,
}

impl StatusSummary {
    #[must_use]
    pub fn new(text: impl Into<String>, tone: StatusTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn tone(&self) -> StatusTone {
        self.tone
    }
}

/// Summarize a session in any state.
///
/// `elapsed` is only consulted for a clean `Built(0)` run.
#[must_use]
pub fn summarize(state: BuildState, diagnostics: &[Diagnostic], elapsed: Duration) -> StatusSummary {
    match state {
        BuildState::Idle => StatusSummary::default(),
        BuildState::Building => StatusSummary::new("building...", StatusTone::Normal),
        BuildState::Built(exit_code) => summarize_built(diagnostics, exit_code, elapsed),
        BuildState::Canceled => StatusSummary::new("canceled", StatusTone::Warning),
    }
}

/// Summarize a finished run.
#[must_use]
pub fn summarize_built(diagnostics: &[Diagnostic], exit_code: i32, elapsed: Duration) -> StatusSummary {
    if diagnostics.is_empty() {
        return if exit_code == 0 {
            StatusSummary::new(
                format!("built in {:.1} secs", elapsed.as_secs_f64()),
                StatusTone::Normal,
            )
        } else {
            StatusSummary::new(
                format!("failed with exit code {exit_code}"),
                StatusTone::Error,
            )
        };
    }

    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    let warnings = diagnostics.len() - errors;

    let text = match (errors, warnings) {
        (1, 0) => "one error".to_string(),
        (0, 1) => "one warning".to_string(),
        (e, 0) => format!("{e} errors"),
        (0, w) => format!("{w} warnings"),
        (e, w) => format!("{e} errors, {w} warnings"),
    };
    let tone = if errors > 0 {
        StatusTone::Error
    } else {
        StatusTone::Warning
    };
    StatusSummary::new(text, tone)
}
