//! Target discovery from the project Makefile.

use std::fs;
use std::path::{Path, PathBuf};

/// Makefile names in GNU make's lookup order.
const MAKEFILE_NAMES: [&str; 3] = ["GNUmakefile", "makefile", "Makefile"];

/// First Makefile present in `dir`, in make's lookup order.
#[must_use]
pub fn find_makefile(dir: &Path) -> Option<PathBuf> {
    MAKEFILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Rule names declared in `dir`'s Makefile, first-seen order, no duplicates.
///
/// No Makefile, or an unreadable one, yields an empty list.
#[must_use]
pub fn discover_targets(dir: &Path) -> Vec<String> {
    let Some(path) = find_makefile(dir) else {
        return Vec::new();
    };
    match fs::read_to_string(&path) {
        Ok(content) => {
            let targets = parse_makefile_targets(&content);
            tracing::debug!(path = %path.display(), count = targets.len(), "Discovered targets");
            targets
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}", path.display());
            Vec::new()
        }
    }
}

/// Extract explicit rule names from Makefile text.
///
/// Only lines starting at column 0 count. Recipe lines, comments, variable
/// assignments (`=`, `:=`, `::=`, `?=`, `+=`, `!=`), special targets such as
/// `.PHONY`, and pattern rules containing `%` are skipped.
#[must_use]
pub fn parse_makefile_targets(content: &str) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for line in content.lines() {
        if line.starts_with(['\t', ' ', '#']) || line.is_empty() {
            continue;
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        let (head, rest) = line.split_at(colon);
        if head.contains('=') || rest.starts_with(":=") || rest.starts_with("::=") {
            continue;
        }
        for name in head.split_whitespace() {
            if name.starts_with('.') || name.contains('%') || name.contains('$') {
                continue;
            }
            if !targets.iter().any(|t| t == name) {
                targets.push(name.to_string());
            }
        }
    }
    targets
}
