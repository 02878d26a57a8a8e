//! SQL identifier syntax.

use std::sync::OnceLock;

use regex::Regex;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

/// Returns whether `name` is a valid unquoted SQL identifier: a letter
/// or underscore followed by letters, digits, or underscores.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let re = IDENTIFIER
        .get_or_init(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));
    re.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("Order2"));
        assert!(is_valid_identifier("PK_T"));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1st"));
        assert!(!is_valid_identifier("with space"));
        assert!(!is_valid_identifier("semi;colon"));
        assert!(!is_valid_identifier("quo\"ted"));
    }
}
