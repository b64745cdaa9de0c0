//! Widening a text selection to the file reference around it.
//!
//! Offsets are byte offsets into the buffer. Offsets past the end or inside a
//! multi-byte character are clamped down to the nearest character boundary.

use natty_types::LineNumber;

/// A half-open byte range `start..end` in a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// An empty selection (a cursor) at `pos`.
    #[must_use]
    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The expanded selection plus the line number that trails it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub range: Selection,
    pub file: String,
    pub line: LineNumber,
}

/// Characters that may appear in a file reference.
#[must_use]
pub fn is_file_char(c: char) -> bool {
    !matches!(c, '\n' | '\r' | ' ' | ':' | '\'' | '"' | '(')
}

/// Widen `selection` to the longest run of file-like characters around it.
///
/// When the run is followed by `(` or `:` and then digits, those digits are
/// the line number; otherwise the line is [`LineNumber::UNKNOWN`].
#[must_use]
pub fn expand(text: &str, selection: Selection) -> FileReference {
    let mut start = floor_boundary(text, selection.start);
    let mut end = floor_boundary(text, selection.end).max(start);

    while let Some(c) = text[..start].chars().next_back() {
        if !is_file_char(c) {
            break;
        }
        start -= c.len_utf8();
    }
    while let Some(c) = text[end..].chars().next() {
        if !is_file_char(c) {
            break;
        }
        end += c.len_utf8();
    }

    FileReference {
        range: Selection { start, end },
        file: text[start..end].to_string(),
        line: trailing_line(&text[end..]),
    }
}

/// Every file-like token in `text`, left to right, each already expanded.
pub fn file_references(text: &str) -> impl Iterator<Item = FileReference> + '_ {
    let mut prev_is_file = false;
    text.char_indices().filter_map(move |(idx, c)| {
        let starts_run = is_file_char(c) && !prev_is_file;
        prev_is_file = is_file_char(c);
        starts_run.then(|| expand(text, Selection::caret(idx)))
    })
}

fn trailing_line(rest: &str) -> LineNumber {
    let Some(after) = rest.strip_prefix(['(', ':']) else {
        return LineNumber::UNKNOWN;
    };
    let digits_len = after.bytes().take_while(u8::is_ascii_digit).count();
    LineNumber::from_digits(&after[..digits_len])
}

fn floor_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}
