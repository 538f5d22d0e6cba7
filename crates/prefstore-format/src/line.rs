//! Line grammar of a preferences file.
//!
//! A file is read one line at a time; each line is classified on its own
//! and the store decides what to do with it. Writers use the `write_*`
//! helpers so that everything they produce classifies back the same way.

use std::io::{self, Write};

use crate::escape::{self, Context};

/// Maximum characters of an escaped value kept on the `name=value` line.
pub const FIRST_CHUNK: usize = 64;

/// Maximum characters of an escaped value per continuation line.
pub const CONTINUATION_CHUNK: usize = 80;

/// One classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace-only line.
    Blank,
    /// `;` or `#` comment, kept verbatim without its line terminator.
    Comment(&'a str),
    /// `[a/b]` group header, as unescaped path segments. The root is `[]`
    /// or `[/]` and yields no segments.
    Group(Vec<String>),
    /// `+text`: more of the previous entry's value, already unescaped.
    Continuation(String),
    /// `name=value`, both unescaped.
    Entry {
        /// Entry name.
        name: String,
        /// Entry value (first chunk only when continuations follow).
        value: String,
    },
    /// Anything else. Readers skip these.
    Malformed(&'a str),
}

/// Classify a single line. The line terminator may or may not be present.
///
/// # Example
///
/// ```
/// use prefstore_format::line::{parse_line, Line};
///
/// assert_eq!(
///     parse_line("  width=800\n"),
///     Line::Entry { name: "width".into(), value: "800".into() },
/// );
/// assert_eq!(parse_line("[Window/Panel]"), Line::Group(vec!["Window".into(), "Panel".into()]));
/// ```
pub fn parse_line(raw: &str) -> Line<'_> {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let body = line.trim_start_matches([' ', '\t']);

    let Some(first) = body.chars().next() else {
        return Line::Blank;
    };

    match first {
        ';' | '#' => Line::Comment(line),
        '[' => parse_group(&body[1..]).map_or(Line::Malformed(line), Line::Group),
        '+' => Line::Continuation(escape::unescape(&body[1..])),
        _ => match escape::find_unescaped(body, '=') {
            Some(0) | None => {
                if body.trim().is_empty() {
                    Line::Blank
                } else {
                    Line::Malformed(line)
                }
            }
            Some(eq) => Line::Entry {
                name: escape::unescape(&body[..eq]),
                value: escape::unescape(&body[eq + 1..]),
            },
        },
    }
}

fn parse_group(rest: &str) -> Option<Vec<String>> {
    let close = escape::find_unescaped(rest, ']')?;
    let segments = escape::split_unescaped(&rest[..close], '/')
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(escape::unescape)
        .collect();
    Some(segments)
}

/// Write a `[a/b]` header for the given path segments.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn write_group<W, S>(out: &mut W, segments: &[S]) -> io::Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    let path: Vec<String> = segments
        .iter()
        .map(|s| escape::escape(s.as_ref(), Context::Segment))
        .collect();
    writeln!(out, "[{}]", path.join("/"))
}

/// Write one entry, splitting long values over `+` continuation lines.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn write_entry<W: Write>(out: &mut W, name: &str, value: &str) -> io::Result<()> {
    write!(out, "{}=", escape::escape(name, Context::Name))?;

    let mut budget = FIRST_CHUNK;
    let mut used = 0;
    for atom in escape::escape_atoms(value, Context::Value) {
        let width = atom.chars().count();
        if used > 0 && used + width > budget {
            write!(out, "\n+")?;
            budget = CONTINUATION_CHUNK;
            used = 0;
        }
        out.write_all(atom.as_bytes())?;
        used += width;
    }
    writeln!(out)
}

/// Write a comment line back exactly as it was read.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn write_comment<W: Write>(out: &mut W, comment: &str) -> io::Result<()> {
    writeln!(out, "{comment}")
}
