//! Procedurally built entry and group names.

use std::fmt;
use std::ops::Deref;

/// An owned entry or group name built on the fly.
///
/// Derefs to `&str`, so it can be passed anywhere a key is expected.
///
/// # Example
///
/// ```
/// use prefstore::Name;
///
/// let files = ["a.txt", "b.txt"];
/// let prefs = prefstore::Preferences::in_memory("Acme", "Widgets");
/// for (i, file) in files.iter().enumerate() {
///     prefs.set(&Name::new(format_args!("File{i}")), file).unwrap();
/// }
/// assert_eq!(prefs.get(&Name::new(format_args!("File{}", 1)), ""), "b.txt");
/// assert_eq!(&*Name::index(7), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    /// Build a name from format arguments.
    pub fn new(args: fmt::Arguments<'_>) -> Self {
        Self(args.to_string())
    }

    /// The decimal representation of `n`.
    pub fn index(n: u32) -> Self {
        Self(n.to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

/// A fresh random (version 4) UUID in uppercase hex,
/// e.g. `0C1A3B4E-5F60-4718-8A9B-ACBDCEDF0011`.
pub fn new_uuid() -> String {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex = hex::encode_upper(bytes);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
