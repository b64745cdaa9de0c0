//! Jumping from build output to source.
//!
//! Three independent pieces chained by [`Navigator`]: widen a selection to a
//! file reference, resolve the file name under a root directory, and launch
//! the configured editor at the referenced line.

mod launcher;
mod resolver;
mod selection;

use std::path::{Path, PathBuf};

pub use launcher::{EditorCommand, LaunchError, launch};
use natty_types::LineNumber;
pub use resolver::{is_excluded_dir, resolve, resolve_first};
pub use selection::{FileReference, Selection, expand, file_references, is_file_char};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavigateError {
    #[error("no file named `{file}` under {}", root.display())]
    NotFound { file: String, root: PathBuf },
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl NavigateError {
    /// Whether this is a resolution miss rather than an editor failure.
    ///
    /// Misses are signalled audibly only; launch failures carry a message.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Resolves file references under `root` and opens them with `editor`.
#[derive(Debug, Clone)]
pub struct Navigator {
    root: PathBuf,
    editor: String,
}

impl Navigator {
    pub fn new(root: impl Into<PathBuf>, editor: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            editor: editor.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn editor(&self) -> &str {
        &self.editor
    }

    #[must_use]
    pub fn locate(&self, file: &str) -> Option<PathBuf> {
        resolve(&self.root, file)
    }

    /// Resolve `file` and open it at `line`. Returns the opened path.
    pub fn open(&self, file: &str, line: LineNumber) -> Result<PathBuf, NavigateError> {
        let path = self.locate(file).ok_or_else(|| NavigateError::NotFound {
            file: file.to_string(),
            root: self.root.clone(),
        })?;
        launch(&self.editor, &path, line)?;
        Ok(path)
    }

    /// Expand `selection` inside `text` and open the reference under it.
    pub fn open_selection(
        &self,
        text: &str,
        selection: Selection,
    ) -> Result<PathBuf, NavigateError> {
        let reference = expand(text, selection);
        self.open(&reference.file, reference.line)
    }

    /// Open the first file reference in `text` that resolves.
    ///
    /// All references are resolved in a single walk of the root.
    pub fn open_line(&self, text: &str) -> Result<PathBuf, NavigateError> {
        let references: Vec<FileReference> = file_references(text).collect();
        let names: Vec<&str> = references.iter().map(|r| r.file.as_str()).collect();
        let found = resolve_first(&self.root, &names)
            .map(|(index, path)| (path, references[index].line));
        let Some((path, line)) = found else {
            return Err(NavigateError::NotFound {
                file: text.trim().to_string(),
                root: self.root.clone(),
            });
        };
        launch(&self.editor, &path, line)?;
        Ok(path)
    }
}
