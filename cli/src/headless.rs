//! Subcommands that run without the terminal UI.

use std::{
    io::{Write, stderr, stdout},
    path::Path,
    process::ExitCode,
};

use anyhow::{Context, Result};

use natty_engine::{
    BuildEvent, BuildEvents, BuildState, Document, DocumentError, NavigateError, OutputStream,
};

/// Exit status reported when the build was interrupted.
const CANCELED_EXIT_CODE: u8 = 130;

fn open_document(dir: &Path) -> Result<(Document, BuildEvents)> {
    Document::open(dir).with_context(|| format!("failed to open {}", dir.display()))
}

/// Run one build, echoing its output, and exit with its status.
///
/// Ctrl-C cancels the build instead of killing natty, so the process group
/// is torn down and the summary still prints.
pub async fn build(dir: &Path, target: Option<&str>) -> Result<ExitCode> {
    let (mut document, mut events) = open_document(dir)?;
    if let Some(target) = target {
        document.select_target(target)?;
    }

    match document.build() {
        // The failure was already reported as build output.
        Ok(()) | Err(DocumentError::Build(_)) => {}
        Err(err) => return Err(err.into()),
    }

    loop {
        echo_events(&mut events)?;
        if !document.state().is_building() {
            break;
        }
        let interrupted = tokio::select! {
            () = document.session_mut().process_next() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            tracing::info!("Interrupted; canceling build");
            document.cancel();
        }
    }
    echo_events(&mut events)?;

    let mut err = stderr().lock();
    for diagnostic in document.diagnostics() {
        writeln!(
            err,
            "{}:{}: {}",
            diagnostic.file(),
            diagnostic.line(),
            diagnostic.message()
        )?;
    }
    writeln!(err, "natty: {}", document.status().text())?;

    Ok(match document.state() {
        BuildState::Built(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        BuildState::Canceled => ExitCode::from(CANCELED_EXIT_CODE),
        BuildState::Idle | BuildState::Building => ExitCode::FAILURE,
    })
}

fn echo_events(events: &mut BuildEvents) -> Result<()> {
    let mut out = stdout().lock();
    let mut err = stderr().lock();
    while let Ok(event) = events.try_recv() {
        match event {
            BuildEvent::CommandEcho(line) => write!(out, "$ {line}")?,
            BuildEvent::Output {
                stream: OutputStream::Stdout,
                chunk,
            } => write!(out, "{chunk}")?,
            BuildEvent::Output {
                stream: OutputStream::Stderr,
                chunk,
            } => write!(err, "{chunk}")?,
            BuildEvent::StateChanged(_) | BuildEvent::Diagnostic(_) => {}
        }
    }
    out.flush()?;
    Ok(())
}

/// Print the presented targets, marking the default.
pub fn targets(dir: &Path) -> Result<ExitCode> {
    let (document, _events) = open_document(dir)?;
    let mut out = stdout().lock();
    for name in document.targets() {
        let marker = if document.target() == Some(name.as_str()) {
            '*'
        } else {
            ' '
        };
        writeln!(out, "{marker} {name}")?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Open the first resolvable reference in `text`.
pub fn open(dir: &Path, text: &str) -> Result<ExitCode> {
    let (document, _events) = open_document(dir)?;
    match document.navigator().open_line(text) {
        Ok(path) => {
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ NavigateError::NotFound { .. }) => {
            eprintln!("natty: {err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
