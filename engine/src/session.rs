//! Build session: owns the external build process and the state machine.
//!
//! The session is the single writer of [`BuildState`]. Process IO runs on
//! background tasks that only send [`ProcessEvent`]s tagged with a run id;
//! the owner applies them through [`BuildSession::poll_events`] or
//! [`BuildSession::process_next`]. Cancellation is applied synchronously, so
//! whichever of cancel and exit the owner sees first decides the outcome.
//! Events from a run that is no longer active are dropped.

use std::time::{Duration, Instant};

use natty_diagnostics::{DiagnosticParser, DiagnosticStore};
use natty_types::{BuildEvent, BuildState, Diagnostic, OutputStream, StatusSummary, summarize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::process::{BuildCommand, exit_code, kill_process_tree};

/// Exit code reported when the build command could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// How long to wait for output pipes after the process exits.
///
/// Grandchildren that inherited the pipes can keep them open indefinitely.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Receiving end of a session's [`BuildEvent`] stream.
pub type BuildEvents = mpsc::UnboundedReceiver<BuildEvent>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("couldn't start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
enum ProcessEventKind {
    Output { stream: OutputStream, chunk: String },
    Exited(i32),
}

#[derive(Debug)]
struct ProcessEvent {
    run_id: u64,
    kind: ProcessEventKind,
}

/// The run currently owned by the session.
///
/// Present exactly while the state is `Building` with a live process.
#[derive(Debug)]
struct ActiveRun {
    run_id: u64,
    kill: oneshot::Sender<()>,
}

#[derive(Debug)]
pub struct BuildSession {
    state: BuildState,
    diagnostics: DiagnosticStore,
    parser: DiagnosticParser,
    started_at: Option<Instant>,
    elapsed: Duration,
    exit_code: Option<i32>,
    active: Option<ActiveRun>,
    next_run_id: u64,
    process_tx: mpsc::UnboundedSender<ProcessEvent>,
    process_rx: mpsc::UnboundedReceiver<ProcessEvent>,
    events: mpsc::UnboundedSender<BuildEvent>,
}

impl BuildSession {
    #[must_use]
    pub fn new() -> (Self, BuildEvents) {
        Self::with_parser(DiagnosticParser::new())
    }

    #[must_use]
    pub fn with_parser(parser: DiagnosticParser) -> (Self, BuildEvents) {
        let (process_tx, process_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            state: BuildState::Idle,
            diagnostics: DiagnosticStore::new(),
            parser,
            started_at: None,
            elapsed: Duration::ZERO,
            exit_code: None,
            active: None,
            next_run_id: 0,
            process_tx,
            process_rx,
            events,
        };
        (session, events_rx)
    }

    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Diagnostics of the current or most recent run, in arrival order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.items()
    }

    /// Exit code of the last finished run; `None` before any run finished
    /// and after a cancellation.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Wall time of the current run so far, or of the last finished one.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at) {
            (BuildState::Building, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusSummary {
        summarize(self.state, self.diagnostics.items(), self.elapsed())
    }

    /// Start a run of `command`.
    ///
    /// A call while a run is in progress is ignored. When the command cannot
    /// be started the failure text is emitted as stderr output, the session
    /// settles in `Built(127)` and the error is returned.
    pub fn build(&mut self, command: &BuildCommand) -> Result<(), BuildError> {
        if self.state.is_building() {
            tracing::debug!("Ignoring build request while building");
            return Ok(());
        }

        self.next_run_id += 1;
        let run_id = self.next_run_id;
        self.started_at = Some(Instant::now());
        self.elapsed = Duration::ZERO;
        self.exit_code = None;
        self.transition(BuildState::Building);
        self.emit(BuildEvent::CommandEcho(format!("{}\n", command.line)));

        let mut child = match command.to_command().spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = BuildError::Spawn {
                    command: command.line.clone(),
                    source,
                };
                tracing::warn!(run_id, "{err}");
                self.emit(BuildEvent::Output {
                    stream: OutputStream::Stderr,
                    chunk: format!("{err}\n"),
                });
                self.finish(SPAWN_FAILURE_EXIT_CODE);
                return Err(err);
            }
        };
        tracing::info!(run_id, pid = ?child.id(), command = %command.line, "Build started");

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(read_lines(
                stdout,
                OutputStream::Stdout,
                run_id,
                self.process_tx.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(read_lines(
                stderr,
                OutputStream::Stderr,
                run_id,
                self.process_tx.clone(),
            )));
        }

        let (kill, kill_rx) = oneshot::channel();
        tokio::spawn(supervise(
            child,
            readers,
            kill_rx,
            run_id,
            self.process_tx.clone(),
        ));
        self.active = Some(ActiveRun { run_id, kill });
        Ok(())
    }

    /// Cancel the run in progress. Returns `false` when nothing was running.
    ///
    /// The session is `Canceled` when this returns; the process is killed in
    /// the background and its remaining events are ignored.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_building() {
            tracing::debug!(state = self.state.label(), "Ignoring cancel request");
            return false;
        }
        if let Some(run) = self.active.take() {
            tracing::info!(run_id = run.run_id, "Build canceled");
            let _ = run.kill.send(());
        }
        self.elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.diagnostics.clear();
        self.transition(BuildState::Canceled);
        true
    }

    /// Apply queued process events, up to `budget`.
    ///
    /// Non-blocking; returns the number of events taken off the queue,
    /// including discarded stale ones.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        let mut count = 0;
        while count < budget {
            match self.process_rx.try_recv() {
                Ok(event) => {
                    self.handle_process_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    /// Wait for the next process event and apply it.
    ///
    /// Pending forever while no process is producing events, so use it in a
    /// `select!` or only while building.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.process_rx.recv().await {
            self.handle_process_event(event);
        }
    }

    fn handle_process_event(&mut self, event: ProcessEvent) {
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|run| run.run_id == event.run_id);
        if !is_current {
            tracing::trace!(run_id = event.run_id, "Dropping event from finished run");
            return;
        }

        match event.kind {
            ProcessEventKind::Output { stream, chunk } => {
                let diagnostic = match stream {
                    OutputStream::Stderr => self.parser.parse(&chunk),
                    OutputStream::Stdout => None,
                };
                self.emit(BuildEvent::Output { stream, chunk });
                if let Some(diagnostic) = diagnostic {
                    self.diagnostics.push(diagnostic.clone());
                    self.emit(BuildEvent::Diagnostic(diagnostic));
                }
            }
            ProcessEventKind::Exited(code) => {
                self.active = None;
                tracing::info!(
                    run_id = event.run_id,
                    exit_code = code,
                    diagnostics = self.diagnostics.len(),
                    "Build finished"
                );
                self.finish(code);
            }
        }
    }

    fn finish(&mut self, code: i32) {
        self.elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.exit_code = Some(code);
        self.transition(BuildState::Built(code));
    }

    fn transition(&mut self, next: BuildState) {
        assert!(
            self.state.can_transition_to(next),
            "illegal build state transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "Build state changed");
        if next.is_building() {
            self.diagnostics.clear();
        }
        self.state = next;
        self.emit(BuildEvent::StateChanged(next));
    }

    fn emit(&self, event: BuildEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }
}

async fn read_lines<R>(
    reader: R,
    stream: OutputStream,
    run_id: u64,
    tx: mpsc::UnboundedSender<ProcessEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf).into_owned();
                let event = ProcessEvent {
                    run_id,
                    kind: ProcessEventKind::Output { stream, chunk },
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(run_id, ?stream, "Output read failed: {err}");
                break;
            }
        }
    }
}

/// Wait for the process (or a kill request), drain output, report the exit.
async fn supervise(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    mut kill_rx: oneshot::Receiver<()>,
    run_id: u64,
    tx: mpsc::UnboundedSender<ProcessEvent>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut kill_rx => {
            if let Err(err) = kill_process_tree(&mut child) {
                tracing::warn!(run_id, "Failed to kill build process: {err}");
            }
            child.wait().await
        }
    };

    let drain = async {
        for reader in readers {
            let _ = reader.await;
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        tracing::debug!(run_id, "Output still open after exit; not waiting further");
    }

    let code = match status {
        Ok(status) => exit_code(status),
        Err(err) => {
            tracing::warn!(run_id, "Failed to wait for build process: {err}");
            -1
        }
    };
    let _ = tx.send(ProcessEvent {
        run_id,
        kind: ProcessEventKind::Exited(code),
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::Shell;

    fn command(line: &str) -> BuildCommand {
        BuildCommand {
            line: line.to_string(),
            shell: Shell::platform(),
            cwd: std::env::temp_dir(),
            env: Vec::new(),
        }
    }

    async fn run_to_end(session: &mut BuildSession) {
        while session.state().is_building() {
            session.process_next().await;
        }
    }

    fn drain(events: &mut BuildEvents) -> Vec<BuildEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn states(events: &[BuildEvent]) -> Vec<BuildState> {
        events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::StateChanged(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (mut session, mut events) = BuildSession::new();
        session
            .build(&command("echo one; echo two; echo oops >&2"))
            .unwrap();
        run_to_end(&mut session).await;

        let events = drain(&mut events);
        assert_eq!(events[0], BuildEvent::StateChanged(BuildState::Building));
        assert_eq!(
            events[1],
            BuildEvent::CommandEcho("echo one; echo two; echo oops >&2\n".to_string())
        );
        assert_eq!(
            events.last(),
            Some(&BuildEvent::StateChanged(BuildState::Built(0)))
        );

        let stdout: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::Output {
                    stream: OutputStream::Stdout,
                    chunk,
                } => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, ["one\n", "two\n"]);
        assert!(events.contains(&BuildEvent::Output {
            stream: OutputStream::Stderr,
            chunk: "oops\n".to_string()
        }));
        assert_eq!(session.exit_code(), Some(0));
        assert!(session.status().text().starts_with("built in "));
    }

    #[tokio::test]
    async fn stderr_diagnostics_are_collected() {
        let (mut session, mut events) = BuildSession::new();
        let line = "echo 'foo.c(10): error: bad thing' >&2; \
                    echo 'bar.c:3: warning: meh' >&2; \
                    echo 'baz.c:4: error: only stdout'; exit 2";
        session.build(&command(line)).unwrap();
        run_to_end(&mut session).await;

        assert_eq!(session.state(), BuildState::Built(2));
        let files: Vec<&str> = session.diagnostics().iter().map(Diagnostic::file).collect();
        assert_eq!(files, ["foo.c", "bar.c"]);
        assert_eq!(session.status().text(), "1 errors, 1 warnings");

        let announced = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, BuildEvent::Diagnostic(_)))
            .count();
        assert_eq!(announced, 2);
    }

    #[tokio::test]
    async fn failing_build_without_diagnostics() {
        let (mut session, _events) = BuildSession::new();
        session.build(&command("exit 7")).unwrap();
        run_to_end(&mut session).await;
        assert_eq!(session.state(), BuildState::Built(7));
        assert_eq!(session.status().text(), "failed with exit code 7");
    }

    #[tokio::test]
    async fn cancel_settles_once_and_allows_rebuild() {
        let (mut session, mut events) = BuildSession::new();
        session
            .build(&command("echo 'a.c:1: error: x' >&2; sleep 30"))
            .unwrap();

        while session.diagnostics().is_empty() {
            session.process_next().await;
        }
        assert!(session.cancel());
        assert_eq!(session.state(), BuildState::Canceled);
        assert!(session.diagnostics().is_empty());
        assert_eq!(session.status().text(), "canceled");
        assert!(!session.cancel());

        // The killed process still reports its exit; it must not leak through.
        tokio::time::sleep(Duration::from_millis(200)).await;
        session.poll_events(usize::MAX);
        assert_eq!(session.state(), BuildState::Canceled);

        session.build(&command("true")).unwrap();
        run_to_end(&mut session).await;

        let observed = states(&drain(&mut events));
        assert_eq!(
            observed,
            [
                BuildState::Building,
                BuildState::Canceled,
                BuildState::Building,
                BuildState::Built(0),
            ]
        );
    }

    #[tokio::test]
    async fn cancel_wins_over_queued_exit() {
        let (mut session, mut events) = BuildSession::new();
        session.build(&command("true")).unwrap();

        // Let the process exit and its events queue up unprocessed.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(session.cancel());
        session.poll_events(usize::MAX);

        assert_eq!(session.state(), BuildState::Canceled);
        assert_eq!(session.exit_code(), None);
        assert_eq!(
            states(&drain(&mut events)),
            [BuildState::Building, BuildState::Canceled]
        );
    }

    #[tokio::test]
    async fn cancel_after_natural_exit_is_a_no_op() {
        let (mut session, mut events) = BuildSession::new();
        session.build(&command("true")).unwrap();
        run_to_end(&mut session).await;

        assert!(!session.cancel());
        assert_eq!(session.state(), BuildState::Built(0));
        assert_eq!(session.exit_code(), Some(0));
        assert_eq!(
            states(&drain(&mut events)),
            [BuildState::Building, BuildState::Built(0)]
        );
    }

    #[tokio::test]
    async fn mixed_build_and_cancel_keep_transitions_legal() {
        let (mut session, mut events) = BuildSession::new();
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..40 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            match (seed >> 16) % 5 {
                0 => session.build(&command("true")).unwrap(),
                1 => session.build(&command("echo 'a.c:1: error: x' >&2; sleep 30")).unwrap(),
                2 => {
                    session.cancel();
                }
                3 => {
                    session.poll_events(usize::MAX);
                }
                _ => tokio::time::sleep(Duration::from_millis(5)).await,
            }
        }
        session.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.poll_events(usize::MAX);
        assert!(!session.state().is_building());

        let observed = states(&drain(&mut events));
        assert!(!observed.is_empty());
        let mut previous = BuildState::Idle;
        for next in observed {
            assert!(
                previous.can_transition_to(next),
                "{previous:?} -> {next:?}"
            );
            previous = next;
        }
        assert_eq!(previous, session.state());
    }

    #[tokio::test]
    async fn spurious_build_while_building_is_ignored() {
        let (mut session, mut events) = BuildSession::new();
        session.build(&command("sleep 30")).unwrap();
        session.build(&command("echo second")).unwrap();
        assert!(session.cancel());

        let echoes = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, BuildEvent::CommandEcho(_)))
            .count();
        assert_eq!(echoes, 1);
    }

    #[tokio::test]
    async fn spawn_failure_settles_in_built() {
        let (mut session, mut events) = BuildSession::new();
        let mut cmd = command("true");
        cmd.shell.binary = "/nonexistent/natty-shell".into();

        let err = session.build(&cmd).unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
        assert_eq!(session.state(), BuildState::Built(SPAWN_FAILURE_EXIT_CODE));

        let events = drain(&mut events);
        assert!(events.iter().any(|e| matches!(
            e,
            BuildEvent::Output {
                stream: OutputStream::Stderr,
                ..
            }
        )));
        assert_eq!(
            states(&events),
            [BuildState::Building, BuildState::Built(SPAWN_FAILURE_EXIT_CODE)]
        );
    }

    #[tokio::test]
    async fn working_directory_and_env_are_applied() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut session, mut events) = BuildSession::new();
        let mut cmd = command("pwd; echo \"$NATTY_SESSION_TEST\"");
        cmd.cwd = tmp.path().to_path_buf();
        cmd.env = vec![("NATTY_SESSION_TEST".to_string(), "hello".to_string())];
        session.build(&cmd).unwrap();
        run_to_end(&mut session).await;

        let stdout: Vec<String> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                BuildEvent::Output {
                    stream: OutputStream::Stdout,
                    chunk,
                } => Some(chunk),
                _ => None,
            })
            .collect();
        let expected_dir = tmp.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(stdout[0].trim()).canonicalize().unwrap(),
            expected_dir
        );
        assert_eq!(stdout[1], "hello\n");
    }
}
