//! A build document: one project directory, its targets, and its session.

use std::path::{Path, PathBuf};

use natty_navigate::Navigator;
use natty_types::{BuildState, Diagnostic, StatusSummary, TargetSet, UnknownTargetError};
use thiserror::Error;

use crate::config::{ConfigError, DocumentConfig, NattyConfig, default_editor, merge_ignored};
use crate::process::{BuildCommand, Shell};
use crate::session::{BuildError, BuildEvents, BuildSession};
use crate::targets::discover_targets;

/// Placeholder in the build command replaced by the selected target.
const TARGET_PLACEHOLDER: &str = "{target}";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    UnknownTarget(#[from] UnknownTargetError),
    #[error("no build target selected")]
    NoTarget,
    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    command: String,
    shell: Shell,
    env: Vec<(String, String)>,
    ignored: String,
    targets: TargetSet,
    target: Option<String>,
    navigator: Navigator,
    session: BuildSession,
}

impl Document {
    /// Open the project in `dir` with the user's global preferences.
    pub fn open(dir: &Path) -> Result<(Self, BuildEvents), DocumentError> {
        let global = NattyConfig::load()?;
        Self::open_with(dir, global.as_ref())
    }

    /// Open the project in `dir` with explicit global preferences.
    pub fn open_with(
        dir: &Path,
        global: Option<&NattyConfig>,
    ) -> Result<(Self, BuildEvents), DocumentError> {
        if !dir.is_dir() {
            return Err(DocumentError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        let path = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let config = DocumentConfig::load(&path)?;

        let editor = config
            .editor_command()
            .or_else(|| global.and_then(NattyConfig::editor_command))
            .map_or_else(default_editor, str::to_string);
        let ignored = merge_ignored(
            global.and_then(NattyConfig::ignored_targets),
            config.ignored_targets(),
        );
        let all_targets = match config.targets() {
            Some(targets) => targets.to_vec(),
            None => discover_targets(&path),
        };
        let targets = TargetSet::new(all_targets, &ignored);
        let target = config
            .default_target()
            .filter(|t| targets.contains(t))
            .or_else(|| targets.next_after(None))
            .map(str::to_string);

        let (session, events) = BuildSession::new();
        tracing::info!(
            path = %path.display(),
            targets = targets.len(),
            selected = target.as_deref().unwrap_or(""),
            "Opened document"
        );

        let document = Self {
            navigator: Navigator::new(path.clone(), editor),
            command: config.command().to_string(),
            shell: Shell::from_config(global.and_then(|g| g.shell.as_ref())),
            env: config.expanded_env(),
            ignored,
            targets,
            target,
            path,
            session,
        };
        Ok((document, events))
    }

    /// The project directory; also the root for source resolution.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short display name: the project directory's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Presented targets, ignore set already applied.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        self.targets.names()
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn select_target(&mut self, name: &str) -> Result<(), UnknownTargetError> {
        self.targets.check(name)?;
        tracing::debug!(name, "Target selected");
        self.target = Some(name.to_string());
        Ok(())
    }

    /// Select the next target, wrapping around.
    pub fn next_target(&mut self) -> Option<&str> {
        let next = self.targets.next_after(self.target.as_deref())?.to_string();
        self.target = Some(next);
        self.target.as_deref()
    }

    /// Select the previous target, wrapping around.
    pub fn previous_target(&mut self) -> Option<&str> {
        let prev = self
            .targets
            .previous_before(self.target.as_deref())?
            .to_string();
        self.target = Some(prev);
        self.target.as_deref()
    }

    /// Space-separated names hidden from [`Document::targets`].
    #[must_use]
    pub fn ignored_targets(&self) -> &str {
        &self.ignored
    }

    /// Configured editor command template.
    #[must_use]
    pub fn editor(&self) -> &str {
        self.navigator.editor()
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// The command line the next build would run.
    pub fn command_line(&self) -> Result<String, DocumentError> {
        if !self.command.contains(TARGET_PLACEHOLDER) {
            return Ok(self.command.clone());
        }
        let target = self.target.as_deref().ok_or(DocumentError::NoTarget)?;
        Ok(self.command.replace(TARGET_PLACEHOLDER, target))
    }

    #[must_use]
    pub fn can_build(&self) -> bool {
        !self.session.state().is_building() && self.command_line().is_ok()
    }

    /// Build the selected target. Ignored while a build is running.
    pub fn build(&mut self) -> Result<(), DocumentError> {
        if self.session.state().is_building() {
            tracing::debug!("Build already running");
            return Ok(());
        }
        let command = BuildCommand {
            line: self.command_line()?,
            shell: self.shell.clone(),
            cwd: self.path.clone(),
            env: self.env.clone(),
        };
        self.session.build(&command)?;
        Ok(())
    }

    pub fn cancel(&mut self) -> bool {
        self.session.cancel()
    }

    #[must_use]
    pub fn state(&self) -> BuildState {
        self.session.state()
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.session.exit_code()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.session.diagnostics()
    }

    #[must_use]
    pub fn status(&self) -> StatusSummary {
        self.session.status()
    }

    #[must_use]
    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BuildSession {
        &mut self.session
    }
}
