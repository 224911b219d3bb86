use regex::Regex;
use std::sync::LazyLock;

use super::TelephonyError;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{6,14}$").expect("E.164 pattern is valid"));

/// Normalize a user-entered number to E.164.
///
/// Spaces, dashes, dots and parentheses are removed; the result must start
/// with `+` and a country code.
pub fn normalize_phone_number(input: &str) -> Result<String, TelephonyError> {
    let normalized: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if E164.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(TelephonyError::InvalidPhoneNumber(input.trim().to_string()))
    }
}
