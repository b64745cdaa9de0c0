//! Launching the configured external editor.
//!
//! The configured command is `"<program> <args>"`: the first space splits
//! the program from an argument template. The template is split into words
//! shell-style, then `{0}` (path) and `{1}` (line) are substituted in each
//! word, so a path containing spaces stays a single argument. `{{` and `}}`
//! produce literal braces.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use natty_types::LineNumber;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no editor command configured")]
    EmptyCommand,
    #[error("invalid editor argument template `{template}`: {reason}")]
    BadTemplate {
        template: String,
        reason: &'static str,
    },
    #[error("couldn't start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// A parsed editor command: program plus optional argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCommand {
    program: String,
    args_template: Option<String>,
}

impl EditorCommand {
    pub fn parse(configured: &str) -> Result<Self, LaunchError> {
        let configured = configured.trim();
        if configured.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        let (program, args_template) = match configured.split_once(' ') {
            Some((program, args)) => (program, Some(args.to_string())),
            None => (configured, None),
        };
        Ok(Self {
            program: program.to_string(),
            args_template,
        })
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for opening `path` at `line`.
    pub fn args(&self, path: &Path, line: LineNumber) -> Result<Vec<String>, LaunchError> {
        let Some(template) = self.args_template.as_deref() else {
            return Ok(Vec::new());
        };
        let words = shlex::split(template).ok_or_else(|| LaunchError::BadTemplate {
            template: template.to_string(),
            reason: "unbalanced quotes",
        })?;

        let path = path.to_string_lossy();
        let line = line.to_string();
        words
            .iter()
            .map(|word| {
                format_positional(word, &[path.as_ref(), line.as_str()]).map_err(|reason| {
                    LaunchError::BadTemplate {
                        template: template.to_string(),
                        reason,
                    }
                })
            })
            .collect()
    }
}

/// Substitute `{N}` placeholders, honouring `{{`/`}}` escapes.
fn format_positional(word: &str, values: &[&str]) -> Result<String, &'static str> {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => index.push(d),
                        Some(_) => return Err("placeholder must be {0} or {1}"),
                        None => return Err("unterminated placeholder"),
                    }
                }
                let value = index
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| values.get(i))
                    .ok_or("placeholder must be {0} or {1}")?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err("unmatched `}`"),
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Spawn the editor for `path` at `line` and return immediately.
///
/// The child gets null stdio and, on Unix, its own process group so terminal
/// signals aimed at us do not reach it. A detached thread reaps it.
pub fn launch(configured: &str, path: &Path, line: LineNumber) -> Result<(), LaunchError> {
    let editor = EditorCommand::parse(configured)?;
    let args = editor.args(path, line)?;

    let mut cmd = Command::new(editor.program());
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
        program: editor.program().to_string(),
        source,
    })?;
    tracing::info!(program = editor.program(), ?args, "Launched editor");

    let reaper = std::thread::Builder::new()
        .name("natty-editor-reaper".to_string())
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        tracing::debug!("Could not spawn editor reaper thread: {e}");
    }
    Ok(())
}
