//! Identifier validation for caller-supplied ids.

use crate::error::AppError;
use regex::Regex;

/// Letters, digits, `_`, `-` and `.`, starting with a letter or digit, at most 128 chars.
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$";

pub fn validate_identifier(id: &str) -> Result<(), AppError> {
    let re = Regex::new(IDENTIFIER_PATTERN)
        .map_err(|_| AppError::MalformedInput("invalid identifier pattern".into()))?;
    if !re.is_match(id) {
        return Err(AppError::MalformedInput(format!(
            "id '{}' must be 1-128 letters, digits, '_', '-' or '.'",
            id
        )));
    }
    Ok(())
}
