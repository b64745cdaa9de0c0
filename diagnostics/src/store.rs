//! Accumulates the diagnostics of one build run in
//! arrival order.

use natty_types::Diagnostic;

#[derive(Debug, Clone, Default)]
pub struct DiagnosticStore {
    items: Vec<Diagnostic>,
}

impl DiagnosticStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn items(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use natty_types::{LineNumber, Severity};

    fn make_diag(severity: Severity, file: &str, line: u32) -> Diagnostic {
        Diagnostic::new("msg", file, LineNumber::new(line), severity)
    }

    #[test]
    fn test_empty_store() {
        let store = DiagnosticStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_push_keeps_arrival_order() {
        let mut store = DiagnosticStore::new();
        store.push(make_diag(Severity::Warning, "b.c", 9));
        store.push(make_diag(Severity::Error, "a.c", 1));

        assert_eq!(store.len(), 2);
        assert_eq!(store.items()[0].file(), "b.c");
        assert_eq!(store.items()[1].file(), "a.c");
    }

    #[test]
    fn test_clear() {
        let mut store = DiagnosticStore::new();
        store.push(make_diag(Severity::Error, "a.c", 1));
        store.clear();
        assert!(store.is_empty());
        assert!(store.items().is_empty());
    }
}
