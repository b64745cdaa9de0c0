//! Severity classification of parsed diagnostic messages.

use std::sync::LazyLock;

use natty_types::Severity;
use regex::Regex;

static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(error|warning)\b").expect("KEYWORD_RE regex should compile")
});

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(note|remark|help)\b").expect("ANNOTATION_RE regex should compile")
});

/// Decides whether a matched diagnostic message is an error or a warning.
///
/// Implemented for plain closures so callers can plug in toolchain-specific
/// rules without a new type.
pub trait SeverityRule: Send + Sync {
    fn classify(&self, message: &str) -> Severity;
}

impl<F> SeverityRule for F
where
    F: Fn(&str) -> Severity + Send + Sync,
{
    fn classify(&self, message: &str) -> Severity {
        self(message)
    }
}

/// Default rule: the first `error`/`warning` keyword in the message wins.
///
/// Messages opening with `note`, `remark` or `help` annotate a neighbouring
/// diagnostic and count as warnings. Messages naming neither keyword are
/// errors; a line only reaches this rule after matching a `file:line:`
/// grammar, and compilers that omit the keyword (older `mcs`, `javac`) do so
/// for errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSeverity;

impl SeverityRule for KeywordSeverity {
    fn classify(&self, message: &str) -> Severity {
        if ANNOTATION_RE.is_match(message) {
            return Severity::Warning;
        }
        match KEYWORD_RE.captures(message) {
            Some(caps) if caps[1].eq_ignore_ascii_case("warning") => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rule() {
        let rule = KeywordSeverity;
        assert_eq!(rule.classify("error: bad thing"), Severity::Error);
        assert_eq!(rule.classify("warning: unused"), Severity::Warning);
        assert_eq!(rule.classify("Warning CS0168: unused"), Severity::Warning);
        assert_eq!(rule.classify("expected ';'"), Severity::Error);
    }

    #[test]
    fn first_keyword_wins() {
        let rule = KeywordSeverity;
        assert_eq!(
            rule.classify("warning: treating error as recoverable"),
            Severity::Warning
        );
        assert_eq!(
            rule.classify("error: warnings being treated as errors"),
            Severity::Error
        );
    }

    #[test]
    fn annotations_are_not_errors() {
        let rule = KeywordSeverity;
        assert_eq!(rule.classify("note: 'x' declared here"), Severity::Warning);
        assert_eq!(
            rule.classify("note: previous error was here"),
            Severity::Warning
        );
        assert_eq!(rule.classify("remark: loop vectorized"), Severity::Warning);
        assert_eq!(rule.classify("help: remove this"), Severity::Warning);
        assert_eq!(rule.classify("unknown type; see help"), Severity::Error);
    }

    #[test]
    fn keyword_needs_word_boundary() {
        assert_eq!(KeywordSeverity.classify("warnings2errors"), Severity::Error);
    }

    #[test]
    fn closure_rule() {
        let rule = |msg: &str| {
            if msg.starts_with("W") {
                Severity::Warning
            } else {
                Severity::Error
            }
        };
        assert_eq!(rule.classify("W100 trailing space"), Severity::Warning);
        assert_eq!(rule.classify("E501 line too long"), Severity::Error);
    }
}
