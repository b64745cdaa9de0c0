//! Diagnostic line grammars.
//!
//! Two shapes are recognized, tried in order:
//!
//! ```text
//! <file>(<line>[,<col>...]): <message>     msbuild, csc, mcs
//! <file>:<line>[:<col>]: <message>         gcc, clang, rustc short format, go
//! ```
//!
//! Anything else is ordinary transcript text.

use std::sync::{Arc, LazyLock};

use natty_types::{Diagnostic, LineNumber, strip_escapes};
use regex::Regex;

use crate::severity::{KeywordSeverity, SeverityRule};

static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<file>[^\s()]+)\((?P<line>\d+)(?:,\s*\d+)*\)\s*:\s*(?P<message>.*\S)\s*$")
        .expect("PAREN_RE regex should compile")
});

static COLON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<file>[A-Za-z]:[\\/][^\s:]+|[^\s:]+):(?P<line>\d+)(?::\d+)?:\s*(?P<message>.*\S)\s*$",
    )
    .expect("COLON_RE regex should compile")
});

/// Stateless parser from one output line to an optional diagnostic.
///
/// Cloning is cheap; the severity rule is shared.
#[derive(Clone)]
pub struct DiagnosticParser {
    rule: Arc<dyn SeverityRule>,
}

impl std::fmt::Debug for DiagnosticParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticParser").finish_non_exhaustive()
    }
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticParser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rule(KeywordSeverity)
    }

    #[must_use]
    pub fn with_rule(rule: impl SeverityRule + 'static) -> Self {
        Self {
            rule: Arc::new(rule),
        }
    }

    /// Parse one line of captured output.
    ///
    /// Escape sequences and the trailing newline are ignored. Returns `None`
    /// for lines matching neither grammar; never fails otherwise.
    #[must_use]
    pub fn parse(&self, line: &str) -> Option<Diagnostic> {
        let clean = strip_escapes(line);
        let text = clean.trim_end_matches(['\r', '\n']);

        let caps = PAREN_RE
            .captures(text)
            .or_else(|| COLON_RE.captures(text))?;

        let file = &caps["file"];
        let message = &caps["message"];
        let line = LineNumber::from_digits(&caps["line"]);
        let severity = self.rule.classify(message);

        tracing::trace!(file, %line, severity = severity.label(), "Parsed diagnostic");
        Some(Diagnostic::new(message, file, line, severity))
    }
}

/// Parse with the default keyword severity rule.
#[must_use]
pub fn parse_line(line: &str) -> Option<Diagnostic> {
    static DEFAULT: LazyLock<DiagnosticParser> = LazyLock::new(DiagnosticParser::new);
    DEFAULT.parse(line)
}
