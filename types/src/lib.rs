//! Core domain types for Natty.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod output;
mod status;
mod targets;

pub use output::strip_escapes;
pub use status::{StatusSummary, StatusTone, summarize, summarize_built};
pub use targets::{TargetSet, UnknownTargetError};

use std::fmt;

// ============================================================================
// Build state
// ============================================================================

/// Lifecycle of a build session.
///
/// Legal transitions are `{Idle, Built, Canceled} -> Building` and
/// `Building -> {Built, Canceled}`. Anything else is a logic bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    Idle,
    Building,
    Built(i32),
    Canceled,
}

impl BuildState {
    #[must_use]
    pub fn is_building(self) -> bool {
        matches!(self, Self::Building)
    }

    #[must_use]
    pub fn can_transition_to(self, next: BuildState) -> bool {
        match (self, next) {
            (Self::Idle | Self::Built(_) | Self::Canceled, Self::Building) => true,
            (Self::Building, Self::Built(_) | Self::Canceled) => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Built(_) => "built",
            Self::Canceled => "canceled",
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A 1-based source line, or `0` when the line is unknown.
///
/// Displays as a plain digit string, so `LineNumber::UNKNOWN` renders as `"0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineNumber(u32);

impl LineNumber {
    pub const UNKNOWN: LineNumber = LineNumber(0);

    #[must_use]
    pub const fn new(line: u32) -> Self {
        Self(line)
    }

    /// Parse a run of ASCII digits.
    ///
    /// Empty input, any non-digit character, or a value that does not fit in
    /// `u32` yields [`LineNumber::UNKNOWN`]; partial numbers are never accepted.
    #[must_use]
    pub fn from_digits(digits: &str) -> Self {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::UNKNOWN;
        }
        digits.parse().map(Self).unwrap_or(Self::UNKNOWN)
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed error or warning from build output.
///
/// Fields are private; values are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    file: String,
    line: LineNumber,
    severity: Severity,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        file: impl Into<String>,
        line: LineNumber,
        severity: Severity,
    ) -> Self {
        Self {
            message: message.into(),
            file: file.into(),
            line,
            severity,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// File name as it appeared in the output (usually relative).
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn line(&self) -> LineNumber {
        self.line
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file,
            self.line,
            self.severity.label(),
            self.message
        )
    }
}

// ============================================================================
// Build events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Typed notification emitted by a build session, in delivery order.
///
/// Per run: `StateChanged(Building)`, one `CommandEcho`, interleaved `Output`
/// (and `Diagnostic` right after the stderr chunk it was parsed from), then
/// exactly one terminal `StateChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    StateChanged(BuildState),
    CommandEcho(String),
    Output { stream: OutputStream, chunk: String },
    Diagnostic(Diagnostic),
}
