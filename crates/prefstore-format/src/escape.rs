//! Escaping for names, group segments and values.
//!
//! Every piece of user text that lands in a preferences file goes through
//! [`escape`] so that a line can always be split back into its parts, and
//! [`unescape`] reverses it exactly.

use std::fmt::Write as _;

/// Where an escaped string is going to be written.
///
/// The context decides which extra characters are special.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Entry name, the left side of `name=value`.
    Name,
    /// Entry value, the right side of `name=value`.
    Value,
    /// One segment of a `[group/path]` header.
    Segment,
}

/// Characters that start a non-entry line and must not appear unescaped at
/// the beginning of a name.
const LINE_MARKERS: [char; 4] = [';', '#', '[', '+'];

/// Escape `text` as a list of atoms.
///
/// An atom is either a single plain character or one complete escape
/// sequence. Writers that split long values across continuation lines cut
/// only between atoms, so a chunk boundary never lands inside an escape.
pub fn escape_atoms(text: &str, ctx: Context) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let leading = chars.iter().take_while(|c| **c == ' ').count();
    let trailing = if leading == chars.len() {
        0
    } else {
        chars.iter().rev().take_while(|c| **c == ' ').count()
    };

    let mut atoms = Vec::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        let edge = i < leading || i >= chars.len() - trailing;
        let atom = match c {
            '\\' => "\\\\".to_string(),
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\t' => "\\t".to_string(),
            '=' => "\\=".to_string(),
            ' ' if edge => "\\s".to_string(),
            ']' | '/' if ctx == Context::Segment => format!("\\{c}"),
            c if i == 0 && ctx == Context::Name && LINE_MARKERS.contains(&c) => {
                format!("\\{c}")
            }
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let mut s = String::with_capacity(4);
                // Infallible for String.
                let _ = write!(s, "\\{:03o}", c as u32);
                s
            }
            c => c.to_string(),
        };
        atoms.push(atom);
    }
    atoms
}

/// Escape `text` for the given context.
///
/// # Example
///
/// ```
/// use prefstore_format::escape::{escape, Context};
///
/// assert_eq!(escape("line1\nline2=3", Context::Value), "line1\\nline2\\=3");
/// assert_eq!(escape(" padded ", Context::Value), "\\spadded\\s");
/// ```
pub fn escape(text: &str, ctx: Context) -> String {
    escape_atoms(text, ctx).concat()
}

/// Reverse [`escape`].
///
/// Unknown escapes yield the escaped character itself and a lone trailing
/// backslash is kept, so hand-edited files never fail to decode.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            's' => out.push(' '),
            '0'..='3' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(&d @ '0'..='7') => {
                            digits.push(d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&digits, 8)
                    .ok()
                    .filter(|_| digits.len() == 3)
                    .and_then(char::from_u32);
                match code {
                    Some(decoded) => out.push(decoded),
                    // Short octal run: keep what was written.
                    None => out.push_str(&digits),
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Byte offset of the first unescaped occurrence of `needle` in `text`.
pub fn find_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
}

/// Split `text` on every unescaped `sep`, leaving the escapes in place.
pub fn split_unescaped(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(i) = find_unescaped(rest, sep) {
        parts.push(&rest[..i]);
        rest = &rest[i + sep.len_utf8()..];
    }
    parts.push(rest);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escape("hello world", Context::Value), "hello world");
        assert_eq!(unescape("hello world"), "hello world");
    }

    #[test]
    fn newline_and_equals_are_escaped() {
        let escaped = escape("line1\nline2=3", Context::Value);
        assert!(!escaped.contains('\n'));
        assert_eq!(find_unescaped(&escaped, '='), None);
        assert_eq!(unescape(&escaped), "line1\nline2=3");
    }

    #[test]
    fn only_edge_spaces_are_escaped() {
        assert_eq!(escape("  a b  ", Context::Value), "\\s\\sa b\\s\\s");
        assert_eq!(escape("   ", Context::Value), "\\s\\s\\s");
    }

    #[test]
    fn name_markers_escaped_only_at_start() {
        assert_eq!(escape(";x", Context::Name), "\\;x");
        assert_eq!(escape("x;", Context::Name), "x;");
        assert_eq!(escape(";x", Context::Value), ";x");
    }

    #[test]
    fn segment_escapes_brackets_and_slashes() {
        assert_eq!(escape("a]b/c", Context::Segment), "a\\]b\\/c");
        assert_eq!(unescape("a\\]b\\/c"), "a]b/c");
    }

    #[test]
    fn control_bytes_use_octal() {
        assert_eq!(escape("\u{1}\u{7f}", Context::Value), "\\001\\177");
        assert_eq!(unescape("\\001\\177"), "\u{1}\u{7f}");
    }

    #[test]
    fn forgiving_decode() {
        assert_eq!(unescape("trailing\\"), "trailing\\");
        assert_eq!(unescape("\\q"), "q");
        assert_eq!(unescape("\\1x"), "1x");
        assert_eq!(unescape("\\12"), "12");
    }

    #[test]
    fn split_respects_escapes() {
        assert_eq!(split_unescaped("a/b\\/c/d", '/'), vec!["a", "b\\/c", "d"]);
        assert_eq!(find_unescaped("a\\=b=c", '='), Some(4));
    }

    proptest! {
        #[test]
        fn unescape_reverses_escape(s in any::<String>()) {
            for ctx in [Context::Name, Context::Value, Context::Segment] {
                prop_assert_eq!(unescape(&escape(&s, ctx)), s.clone());
            }
        }

        #[test]
        fn escaped_text_is_single_line(s in any::<String>()) {
            let escaped = escape(&s, Context::Value);
            prop_assert!(!escaped.contains('\n'));
            prop_assert!(!escaped.contains('\r'));
            prop_assert_eq!(find_unescaped(&escaped, '='), None);
        }
    }
}
