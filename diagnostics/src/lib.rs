//! Build-output diagnostics: line parsing and per-run accumulation.
//!
//! [`DiagnosticParser`] turns one line of captured stderr into an optional
//! [`Diagnostic`](natty_types::Diagnostic); [`DiagnosticStore`] keeps the
//! ordered list for the current run.

mod parser;
mod severity;
mod store;

pub use parser::{DiagnosticParser, parse_line};
pub use severity::{KeywordSeverity, SeverityRule};
pub use store::DiagnosticStore;
