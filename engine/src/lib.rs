//! Core engine for Natty - build session state machine and orchestration.
//!
//! This crate contains the build session, documents and the `App` state the
//! UI renders, without TUI dependencies.

mod app;
mod config;
mod document;
mod process;
mod session;
mod targets;

pub use app::{App, EVENT_BUDGET, Focus, LineKind, TranscriptLine};
pub use config::{
    ConfigError, DEFAULT_BUILD_COMMAND, DOCUMENT_FILE_NAME, DocumentConfig, NattyConfig,
    config_path, default_editor, expand_env_vars,
};
pub use document::{Document, DocumentError};
pub use process::{BuildCommand, Shell, exit_code, kill_process_tree};
pub use session::{BuildError, BuildEvents, BuildSession, SPAWN_FAILURE_EXIT_CODE};
pub use targets::{discover_targets, find_makefile, parse_makefile_targets};

// Re-export the domain crates for the UI and binary.
pub use natty_diagnostics::{DiagnosticParser, parse_line};
pub use natty_navigate::{NavigateError, Navigator, Selection};
pub use natty_types::{
    BuildEvent, BuildState, Diagnostic, LineNumber, OutputStream, Severity, StatusSummary,
    StatusTone,
};
