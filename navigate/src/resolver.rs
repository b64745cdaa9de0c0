//! Resolving a bare file name from build output to a path on disk.
//!
//! The resolver first tries `root/file`, then every non-excluded directory
//! under `root` in depth-first order with children sorted by name, so the
//! result is reproducible for a fixed tree. Read-only; holds no state.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

/// Whether a directory (given relative to the resolver root) is skipped.
///
/// Excluded: any hidden component (`.git`, `.svn`, ...), any component
/// ending in `bin` (build output), any component ending in `.nib`
/// (Interface Builder bundles).
#[must_use]
pub fn is_excluded_dir(relative: &Path) -> bool {
    relative.components().any(|component| {
        let Component::Normal(name) = component else {
            return false;
        };
        let name = name.to_string_lossy();
        name.starts_with('.') || name.ends_with("bin") || name.ends_with(".nib")
    })
}

/// Find `file` under `root`.
///
/// Returns `None` for an empty name or when no candidate exists. Absolute
/// names are checked as-is without a walk.
#[must_use]
pub fn resolve(root: &Path, file: &str) -> Option<PathBuf> {
    resolve_first(root, &[file]).map(|(_, path)| path)
}

/// Resolve the earliest name in `files` that exists under `root`.
///
/// Equivalent to calling [`resolve`] on each name in turn, but the tree is
/// walked at most once. Returns the index of the winning name with its path.
#[must_use]
pub fn resolve_first(root: &Path, files: &[&str]) -> Option<(usize, PathBuf)> {
    let mut found: Vec<Option<PathBuf>> = files
        .iter()
        .map(|file| {
            let direct = root.join(file);
            (!file.trim().is_empty() && direct.is_file()).then_some(direct)
        })
        .collect();

    // Names after the first direct hit can no longer win.
    let limit = found.iter().position(Option::is_some).unwrap_or(files.len());
    let pending: Vec<usize> = (0..limit)
        .filter(|&i| !files[i].trim().is_empty() && !Path::new(files[i]).is_absolute())
        .collect();

    if let Some(&earliest) = pending.first() {
        for dir in search_dirs(root) {
            for &i in &pending {
                if found[i].is_none() {
                    let candidate = dir.join(files[i]);
                    if candidate.is_file() {
                        found[i] = Some(candidate);
                    }
                }
            }
            if found[earliest].is_some() {
                break;
            }
        }
    }

    let winner = found
        .into_iter()
        .enumerate()
        .find_map(|(i, path)| path.map(|path| (i, path)));
    match &winner {
        Some((i, path)) => {
            tracing::debug!(file = files[*i], path = %path.display(), "Resolved source file");
        }
        None => tracing::debug!(?files, root = %root.display(), "Source file not found"),
    }
    winner
}

/// Non-excluded directories strictly below `root`, depth-first, sorted by name.
fn search_dirs(root: &Path) -> impl Iterator<Item = PathBuf> {
    let filter_root = root.to_path_buf();
    WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return false;
            }
            let relative = entry
                .path()
                .strip_prefix(&filter_root)
                .unwrap_or(entry.path());
            !is_excluded_dir(relative)
        })
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => (entry.depth() > 0).then(|| entry.into_path()),
            Err(err) => {
                tracing::debug!("Skipping unreadable directory while resolving: {err}");
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "int main;\n").unwrap();
        path
    }

    #[test]
    fn first_resolvable_name_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let deep = touch(tmp.path(), "project/src/foo.c");
        touch(tmp.path(), "bar.c");

        assert_eq!(
            resolve_first(tmp.path(), &["In", "from", "foo.c", "bar.c"]),
            Some((2, deep))
        );
        assert_eq!(
            resolve_first(tmp.path(), &["bar.c", "foo.c"]),
            Some((0, tmp.path().join("bar.c")))
        );
        assert_eq!(resolve_first(tmp.path(), &["In", "", "nope.c"]), None);
        assert_eq!(resolve_first(tmp.path(), &[]), None);
    }

    #[test]
    fn direct_hit() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "foo.c");
        assert_eq!(resolve(tmp.path(), "foo.c"), Some(path));
    }

    #[test]
    fn found_in_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "project/src/foo.c");
        assert_eq!(resolve(tmp.path(), "foo.c"), Some(path));
    }

    #[test]
    fn relative_name_with_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "project/src/net/sock.c");
        assert_eq!(resolve(tmp.path(), "net/sock.c"), Some(path));
    }

    #[test]
    fn hidden_and_bin_directories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), ".git/foo.c");
        touch(tmp.path(), "project/bin/foo.c");
        touch(tmp.path(), "project/.cache/deep/foo.c");
        touch(tmp.path(), "ui/Main.nib/foo.c");
        assert_eq!(resolve(tmp.path(), "foo.c"), None);

        let path = touch(tmp.path(), "project/src/foo.c");
        assert_eq!(resolve(tmp.path(), "foo.c"), Some(path));
    }

    #[test]
    fn lexicographic_order_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "zeta/dup.c");
        let first = touch(tmp.path(), "alpha/inner/dup.c");
        touch(tmp.path(), "beta/dup.c");

        let once = resolve(tmp.path(), "dup.c");
        assert_eq!(once, Some(first));
        assert_eq!(resolve(tmp.path(), "dup.c"), once);
    }

    #[test]
    fn root_ancestors_do_not_exclude() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join(".hidden-workspace");
        let path = touch(&root, "src/foo.c");
        assert_eq!(resolve(&root, "foo.c"), Some(path));
    }

    #[test]
    fn empty_and_missing_names() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "src/foo.c");
        assert_eq!(resolve(tmp.path(), ""), None);
        assert_eq!(resolve(tmp.path(), "  "), None);
        assert_eq!(resolve(tmp.path(), "bar.c"), None);
        // a directory with the name is not a file
        assert_eq!(resolve(tmp.path(), "src"), None);
    }

    #[test]
    fn absolute_names() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "abs.c");
        let other = tempfile::tempdir().unwrap();
        assert_eq!(resolve(other.path(), path.to_str().unwrap()), Some(path.clone()));
        fs::remove_file(&path).unwrap();
        assert_eq!(resolve(other.path(), path.to_str().unwrap()), None);
    }

    #[test]
    fn exclusion_predicate() {
        assert!(is_excluded_dir(Path::new(".git")));
        assert!(is_excluded_dir(Path::new("project/bin")));
        assert!(is_excluded_dir(Path::new("project/bin/Debug")));
        assert!(is_excluded_dir(Path::new("project/objbin")));
        assert!(is_excluded_dir(Path::new("English.lproj/MainMenu.nib")));
        assert!(!is_excluded_dir(Path::new("")));
        assert!(!is_excluded_dir(Path::new("project/src")));
        assert!(!is_excluded_dir(Path::new("binaries")));
    }
}
