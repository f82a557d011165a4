//! Destination phone number normalization.
//!
//! Numbers are normalized before any transport call or row insert so that a
//! malformed destination never produces a communication record.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid phone number format")]
pub struct PhoneFormatError;

const MIN_DIGITS: usize = 10;

/// Normalize a destination number to E.164-ish form.
///
/// Numbers already carrying a `+` keep their country code; bare numbers are
/// assumed to be North American and get a `+1` prefix unless they already
/// start with a leading `1`.
///
/// # Errors
/// Fails when fewer than ten digits remain after stripping formatting.
pub fn normalize(raw: &str) -> Result<String, PhoneFormatError> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();

    if digits.len() < MIN_DIGITS {
        return Err(PhoneFormatError);
    }

    if trimmed.starts_with('+') {
        return Ok(format!("+{digits}"));
    }

    if digits.starts_with('1') {
        Ok(format!("+{digits}"))
    } else {
        Ok(format!("+1{digits}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_ten_digits_get_us_prefix() {
        assert_eq!(normalize("5551234567").as_deref(), Ok("+15551234567"));
    }

    #[test]
    fn already_prefixed_is_unchanged() {
        assert_eq!(normalize("+15551234567").as_deref(), Ok("+15551234567"));
    }

    #[test]
    fn leading_one_gets_bare_plus() {
        assert_eq!(normalize("15551234567").as_deref(), Ok("+15551234567"));
    }

    #[test]
    fn formatting_characters_are_stripped() {
        assert_eq!(normalize("(555) 123-4567").as_deref(), Ok("+15551234567"));
        assert_eq!(normalize("+1 (555) 123-4567").as_deref(), Ok("+15551234567"));
    }

    #[test]
    fn international_numbers_keep_country_code() {
        assert_eq!(normalize("+44 20 7946 0958").as_deref(), Ok("+442079460958"));
    }

    #[test]
    fn too_short_is_rejected() {
        assert_eq!(normalize("123"), Err(PhoneFormatError));
        assert_eq!(normalize("+1 555"), Err(PhoneFormatError));
        assert_eq!(normalize(""), Err(PhoneFormatError));
    }
}
