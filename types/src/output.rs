//! Escape-sequence stripping for captured build output.
//!
//! Compilers colourize diagnostics when they think they talk to a terminal
//! (`-fdiagnostics-color`, `CLICOLOR_FORCE`). Both the diagnostic grammars and
//! the transcript pane want plain text, so escape sequences and stray control
//! characters are removed before either sees a chunk.

use std::borrow::Cow;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{009b}';

#[derive(Clone, Copy)]
enum Scan {
    Text,
    /// Saw ESC, waiting for the introducer.
    Escape,
    /// ESC with a one-character argument (`ESC ( B` and friends).
    Charset,
    /// CSI parameters until a final byte in `0x40..=0x7e`.
    Csi,
    /// OSC/DCS/PM/APC payload until BEL or `ESC \`.
    String { saw_esc: bool },
}

/// Remove ANSI escape sequences and control characters other than
/// `\n`, `\t` and `\r`.
///
/// Returns `Cow::Borrowed` when the input is already clean.
#[must_use]
pub fn strip_escapes(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_unwanted) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut scan = Scan::Text;
    for c in input.chars() {
        scan = match scan {
            Scan::Text => match c {
                ESC => Scan::Escape,
                C1_CSI => Scan::Csi,
                c if is_unwanted(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Escape => match c {
                '[' => Scan::Csi,
                ']' | 'P' | '^' | '_' => Scan::String { saw_esc: false },
                '(' | ')' | '*' | '+' | '#' | ' ' => Scan::Charset,
                ESC => Scan::Escape,
                // Single-character commands (ESC 7, ESC c, ...) are dropped whole;
                // anything else is not an escape we know, so keep the character.
                '7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<' => {
                    Scan::Text
                }
                c if is_unwanted(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::Charset => Scan::Text,
            Scan::Csi => match c {
                '\x40'..='\x7e' => Scan::Text,
                '\x20'..='\x3f' => Scan::Csi,
                c if is_unwanted(c) => Scan::Text,
                c => {
                    out.push(c);
                    Scan::Text
                }
            },
            Scan::String { saw_esc } => match c {
                BEL => Scan::Text,
                '\\' if saw_esc => Scan::Text,
                ESC => Scan::String { saw_esc: true },
                _ => Scan::String { saw_esc: false },
            },
        };
    }
    Cow::Owned(out)
}

fn is_unwanted(c: char) -> bool {
    let c0 = c <= '\x1f' && !matches!(c, '\n' | '\t' | '\r');
    let c1 = ('\u{0080}'..='\u{009f}').contains(&c);
    c0 || c1 || c == '\x7f'
}
