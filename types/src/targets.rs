//! Presented build targets.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown target: {name}")]
pub struct UnknownTargetError {
    pub name: String,
}

/// Ordered target names with the ignore set already removed.
///
/// Order of the source list is preserved; duplicates keep their first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    names: Vec<String>,
}

impl TargetSet {
    /// Build a set from all known names minus a space-separated ignore list.
    #[must_use]
    pub fn new<I, S>(all: I, ignored: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ignored: Vec<&str> = ignored.split_whitespace().collect();
        let mut names: Vec<String> = Vec::new();
        for name in all {
            let name = name.into();
            if name.is_empty() || ignored.contains(&name.as_str()) || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
        Self { names }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn check(&self, name: &str) -> Result<(), UnknownTargetError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(UnknownTargetError {
                name: name.to_string(),
            })
        }
    }

    /// Cycle forward from `current`; wraps around. `None` selects the first.
    #[must_use]
    pub fn next_after(&self, current: Option<&str>) -> Option<&str> {
        self.step(current, true)
    }

    /// Cycle backward from `current`; wraps around. `None` selects the last.
    #[must_use]
    pub fn previous_before(&self, current: Option<&str>) -> Option<&str> {
        self.step(current, false)
    }

    fn step(&self, current: Option<&str>, forward: bool) -> Option<&str> {
        let len = self.names.len();
        if len == 0 {
            return None;
        }
        let index = match current.and_then(|c| self.names.iter().position(|n| n == c)) {
            Some(pos) if forward => (pos + 1) % len,
            Some(pos) => (pos + len - 1) % len,
            None if forward => 0,
            None => len - 1,
        };
        self.names.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_set_removed_order_kept() {
        let set = TargetSet::new(["all", "clean", "check", "install"], "clean  install");
        assert_eq!(set.names(), ["all", "check"]);
    }

    #[test]
    fn duplicates_and_empty_names_dropped() {
        let set = TargetSet::new(["all", "", "all", "docs"], "");
        assert_eq!(set.names(), ["all", "docs"]);
    }

    #[test]
    fn check_rejects_ignored() {
        let set = TargetSet::new(["all", "clean"], "clean");
        assert!(set.check("all").is_ok());
        assert_eq!(
            set.check("clean"),
            Err(UnknownTargetError {
                name: "clean".to_string()
            })
        );
    }

    #[test]
    fn cycling_wraps() {
        let set = TargetSet::new(["a", "b", "c"], "");
        assert_eq!(set.next_after(None), Some("a"));
        assert_eq!(set.next_after(Some("c")), Some("a"));
        assert_eq!(set.previous_before(Some("a")), Some("c"));
        assert_eq!(set.previous_before(None), Some("c"));
        assert_eq!(set.next_after(Some("missing")), Some("a"));

        let pair = TargetSet::new(["x", "y"], "");
        assert_eq!(pair.previous_before(None), Some("y"));
    }

    #[test]
    fn empty_set_has_no_selection() {
        let set = TargetSet::new(Vec::<String>::new(), "");
        assert!(set.is_empty());
        assert_eq!(set.next_after(None), None);
    }
}
