//! Global and per-project configuration loaded from TOML.

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Name of the build document inside a project directory.
pub const DOCUMENT_FILE_NAME: &str = "natty.toml";

/// Build command used when the document does not configure one.
pub const DEFAULT_BUILD_COMMAND: &str = "make {target}";

/// Editor argument template used with `$VISUAL`/`$EDITOR` or the fallback `vi`.
const DEFAULT_EDITOR_ARGS: &str = "+{1} {0}";

/// Global preferences from `~/.natty/config.toml`.
///
/// ```toml
/// [editor]
/// command = "vim +{1} {0}"
///
/// [build]
/// ignored_targets = "clean distclean"
///
/// [shell]
/// binary = "/bin/bash"
/// args = ["-c"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct NattyConfig {
    pub editor: Option<EditorConfig>,
    pub build: Option<GlobalBuildConfig>,
    pub shell: Option<ShellConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EditorConfig {
    /// `"<program> <argument template>"`; `{0}` is the path, `{1}` the line.
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobalBuildConfig {
    /// Space-separated target names hidden from every document.
    pub ignored_targets: Option<String>,
}

/// Shell used to run build commands.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ShellConfig {
    /// Override shell binary (e.g. "/bin/bash", "pwsh").
    pub binary: Option<String>,
    /// Override shell args (e.g. `["-c"]` or `["/C"]`).
    pub args: Option<Vec<String>>,
}

/// A project's build document, `natty.toml`.
///
/// ```toml
/// [build]
/// command = "make {target}"
/// targets = ["all", "check", "install"]
/// default_target = "all"
/// ignored_targets = "install"
///
/// [editor]
/// command = "code --goto {0}:{1}"
///
/// [env]
/// CFLAGS = "-O0 -g"
/// PATH = "/opt/cross/bin:${PATH}"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DocumentConfig {
    pub build: Option<DocumentBuildConfig>,
    pub editor: Option<EditorConfig>,
    /// Extra environment for the build process. `${VAR}` is expanded.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentBuildConfig {
    /// Command line run through the shell; `{target}` is substituted.
    pub command: Option<String>,
    /// Explicit target list. When absent, targets are read from the Makefile.
    pub targets: Option<Vec<String>>,
    pub default_target: Option<String>,
    pub ignored_targets: Option<String>,
}

/// Expand `${VAR}` references from the process environment.
///
/// Unset variables expand to nothing; an unclosed `${` is kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &after[..end];
        if !name.is_empty()
            && let Ok(replacement) = env::var(name)
        {
            out.push_str(&replacement);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("Failed to read config at {:?}: {}", path, err);
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            })
        }
    }
}

impl NattyConfig {
    /// Load the global preferences. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        read_toml(path).map(Some)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn editor_command(&self) -> Option<&str> {
        self.editor.as_ref()?.command.as_deref()
    }

    #[must_use]
    pub fn ignored_targets(&self) -> Option<&str> {
        self.build.as_ref()?.ignored_targets.as_deref()
    }
}

impl DocumentConfig {
    /// Load `natty.toml` from `dir`; a missing file yields defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(DOCUMENT_FILE_NAME);
        if !path.exists() {
            tracing::debug!(dir = %dir.display(), "No build document; using defaults");
            return Ok(Self::default());
        }
        read_toml(&path)
    }

    #[must_use]
    pub fn command(&self) -> &str {
        self.build
            .as_ref()
            .and_then(|b| b.command.as_deref())
            .unwrap_or(DEFAULT_BUILD_COMMAND)
    }

    #[must_use]
    pub fn targets(&self) -> Option<&[String]> {
        self.build.as_ref()?.targets.as_deref()
    }

    #[must_use]
    pub fn default_target(&self) -> Option<&str> {
        self.build.as_ref()?.default_target.as_deref()
    }

    #[must_use]
    pub fn ignored_targets(&self) -> Option<&str> {
        self.build.as_ref()?.ignored_targets.as_deref()
    }

    #[must_use]
    pub fn editor_command(&self) -> Option<&str> {
        self.editor.as_ref()?.command.as_deref()
    }

    /// `[env]` with `${VAR}` references expanded, in key order.
    #[must_use]
    pub fn expanded_env(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .map(|(key, value)| (key.clone(), expand_env_vars(value)))
            .collect()
    }
}

/// Editor command when nothing is configured.
///
/// Uses the program named by `$VISUAL` or `$EDITOR`, else `vi`, with the
/// `+line path` convention most terminal editors accept.
#[must_use]
pub fn default_editor() -> String {
    let program = ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "vi".to_string());
    format!("{program} {DEFAULT_EDITOR_ARGS}")
}

/// Space-separated union of two ignore lists, first-seen order.
#[must_use]
pub fn merge_ignored(global: Option<&str>, document: Option<&str>) -> String {
    let mut names: Vec<&str> = Vec::new();
    for name in global
        .into_iter()
        .chain(document)
        .flat_map(str::split_whitespace)
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(" ")
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".natty").join("config.toml"))
}
