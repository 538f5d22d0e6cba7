//! On-disk text format for prefstore files.
//!
//! This crate knows nothing about trees or files on disk. It classifies
//! lines, escapes and unescapes text, and turns numbers into text and back.

pub mod escape;
pub mod line;
pub mod number;

// Re-exports
pub use line::{Line, parse_line};
pub use number::FormatError;

/// First line of every file written by prefstore.
pub const FORMAT_MAGIC: &str = "; prefstore preferences file format 1.0";

/// Prefix of the second header line.
pub const VENDOR_PREFIX: &str = "; vendor: ";

/// Prefix of the third header line.
pub const APPLICATION_PREFIX: &str = "; application: ";

/// The three comment lines written at the top of every file.
pub fn file_header(vendor: &str, application: &str) -> [String; 3] {
    [
        FORMAT_MAGIC.to_string(),
        format!("{VENDOR_PREFIX}{vendor}"),
        format!("{APPLICATION_PREFIX}{application}"),
    ]
}

/// Whether `line` is header line number `index` (0-based) as produced by
/// [`file_header`]. Readers drop these; writers regenerate them.
pub fn is_header_line(index: usize, line: &str) -> bool {
    let line = line.trim_end_matches(['\r', '\n']);
    match index {
        0 => line == FORMAT_MAGIC,
        1 => line.starts_with(VENDOR_PREFIX),
        2 => line.starts_with(APPLICATION_PREFIX),
        _ => false,
    }
}
