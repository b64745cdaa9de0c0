//! Natty CLI - Binary entry point and terminal session management.
//!
//! # Architecture
//!
//! The CLI bridges [`natty_engine`] (build state) and [`natty_tui`] (rendering),
//! providing RAII-based terminal management with guaranteed cleanup.
//!
//! ```text
//! main() -> Document::open(dir) -> TerminalSession::new() -> run_app() -> App + TUI
//!        \-> headless::{build, targets, open}
//! ```
//!
//! # Event Loop
//!
//! The full-screen mode uses a fixed 16ms render cadence:
//!
//! 1. Wait for frame tick
//! 2. Drain input queue (non-blocking via [`natty_tui::InputPump`])
//! 3. Apply build output and editor launches (`app.tick()`)
//! 4. Render frame, ringing the bell if the app asked for it
//! 5. Check for quit

mod headless;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::{
    fs::{self, OpenOptions},
    io::{Stdout, Write, stdout},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use natty_engine::{App, Document, NattyConfig};
use natty_tui::{InputPump, UiOptions, draw, handle_events, ring_bell};

#[derive(Parser, Debug)]
#[command(name = "natty", version, about = "Run builds and jump to the errors they report.")]
struct Cli {
    /// Project directory holding the Makefile and optional natty.toml.
    #[arg(short = 'C', long = "doc", default_value = ".", global = true)]
    doc: PathBuf,

    /// Use the terminal's named colors instead of the truecolor palette.
    #[arg(long)]
    high_contrast: bool,

    /// Draw markers and spinners with ASCII only.
    #[arg(long)]
    ascii: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Build without the TUI, streaming output and exiting with the build's status.
    Build {
        /// Target to build instead of the document's default.
        target: Option<String>,
    },
    /// List the targets the document presents.
    Targets,
    /// Open the first source reference found in TEXT in the configured editor.
    Open { text: String },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_natty_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // If we can't open a log file, prefer "no logs" over corrupting the TUI
    // or the headless build output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_natty_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in natty_log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn natty_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.natty/logs/natty.log
    if let Some(config_path) = NattyConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("natty.log"));
    }

    // Fallback: ./.natty/logs/natty.log
    candidates.push(PathBuf::from(".natty").join("logs").join("natty.log"));

    candidates
}

/// Raw mode plus the alternate screen, restored on drop even after panics
/// or early returns.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(out)) {
            Ok(t) => t,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(stdout(), LeaveAlternateScreen);
                return Err(err.into());
            }
        };

        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Command::Build { target }) => headless::build(&cli.doc, target.as_deref()).await,
        Some(Command::Targets) => headless::targets(&cli.doc),
        Some(Command::Open { text }) => headless::open(&cli.doc, &text),
        None => {
            let options = UiOptions {
                high_contrast: cli.high_contrast,
                ascii_only: cli.ascii,
            };
            run_tui(&cli.doc, options).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_tui(dir: &Path, options: UiOptions) -> Result<()> {
    let (document, events) =
        Document::open(dir).with_context(|| format!("failed to open {}", dir.display()))?;
    let mut app = App::new(document, events);

    let result = {
        let mut session = TerminalSession::new()?;
        run_app(&mut session.terminal, &mut app, options).await
    };
    if let Err(err) = &result {
        tracing::error!("{err:?}");
    }
    result
}

const FRAME_DURATION: Duration = Duration::from_millis(16);

async fn run_app<B>(terminal: &mut Terminal<B>, app: &mut App, options: UiOptions) -> Result<()>
where
    B: Backend + Write,
    B::Error: Send + Sync + 'static,
{
    let mut input = InputPump::new();
    let mut frames = tokio::time::interval(FRAME_DURATION);
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: Result<()> = loop {
        frames.tick().await;

        // Non-blocking input (drain queue only)
        let quit_now = match handle_events(app, &mut input) {
            Ok(q) => q,
            Err(e) => break Err(e),
        };
        if quit_now {
            break Ok(());
        }

        app.tick();

        if let Err(e) = terminal.draw(|frame| draw(frame, app, options)) {
            break Err(e.into());
        }

        if app.take_bell()
            && let Err(e) = ring_bell(terminal.backend_mut())
        {
            break Err(e.into());
        }
    };

    input.shutdown().await;
    result
}
