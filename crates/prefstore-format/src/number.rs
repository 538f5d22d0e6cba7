//! Text representation of numeric values.
//!
//! Values are stored as text; these helpers are the only place numbers are
//! turned into text and back.

use thiserror::Error;

/// A stored value could not be read as the requested type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Not a base-10 integer that fits in 64 bits.
    #[error("Invalid integer: '{0}'")]
    InvalidInteger(String),

    /// Not a floating point number.
    #[error("Invalid floating point number: '{0}'")]
    InvalidFloat(String),
}

/// Shortest text that parses back to exactly `value`.
pub fn format_double(value: f64) -> String {
    value.to_string()
}

/// Shortest text that parses back to exactly `value`.
pub fn format_float(value: f32) -> String {
    value.to_string()
}

/// Largest precision [`format_general`] honours. An `f64` never needs more
/// than 17 significant digits to round-trip.
pub const MAX_PRECISION: usize = 64;

/// Format like C's `%.*g`: `precision` significant digits, fixed or
/// exponent notation depending on magnitude, trailing zeros removed.
///
/// A precision of zero is treated as one, as C does; anything above
/// [`MAX_PRECISION`] is treated as [`MAX_PRECISION`].
///
/// # Example
///
/// ```
/// use prefstore_format::number::format_general;
///
/// assert_eq!(format_general(1.23456, 3), "1.23");
/// assert_eq!(format_general(1234567.0, 3), "1.23e+06");
/// assert_eq!(format_general(0.0001, 2), "0.0001");
/// ```
pub fn format_general(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.clamp(1, MAX_PRECISION);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let limit = i32::try_from(precision).unwrap_or(i32::MAX);

    if exponent < -4 || exponent >= limit {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = usize::try_from(limit - 1 - exponent).unwrap_or(0);
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Parse a stored integer. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`FormatError::InvalidInteger`] if the text is not an integer.
pub fn parse_int(text: &str) -> Result<i64, FormatError> {
    text.trim()
        .parse()
        .map_err(|_| FormatError::InvalidInteger(text.to_string()))
}

/// Parse a stored double. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`FormatError::InvalidFloat`] if the text is not a number.
pub fn parse_double(text: &str) -> Result<f64, FormatError> {
    text.trim()
        .parse()
        .map_err(|_| FormatError::InvalidFloat(text.to_string()))
}

/// Parse a stored float. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`FormatError::InvalidFloat`] if the text is not a number.
pub fn parse_float(text: &str) -> Result<f32, FormatError> {
    text.trim()
        .parse()
        .map_err(|_| FormatError::InvalidFloat(text.to_string()))
}
