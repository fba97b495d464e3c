//! Field rules shared by request payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

pub const MAX_NAME_LEN: usize = 100;

/// A letter, then any mix of letters, digits and whitespace
static DISPLAY_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\p{L}[\p{L}\p{N}\s]*$").unwrap_or_else(|e| panic!("invalid name pattern: {e}"))
});

static CREDENTIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap_or_else(|e| panic!("invalid credential pattern: {e}"))
});

pub fn is_display_name(value: &str) -> bool {
    value.chars().count() <= MAX_NAME_LEN && DISPLAY_NAME_RE.is_match(value)
}

/// Item and customer names
pub fn validate_display_name(value: &str) -> Result<(), ValidationError> {
    if is_display_name(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("display_name");
    err.message = Some(
        "Must start with a letter, contain only letters, numbers and spaces, and be at most 100 characters"
            .into(),
    );
    Err(err)
}

/// Usernames and passwords share one character set
pub fn validate_credential_charset(value: &str) -> Result<(), ValidationError> {
    if CREDENTIAL_RE.is_match(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("charset");
    err.message = Some("Only letters, numbers, underscores and hyphens are allowed".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Pallet Jack")]
    #[case("Acme Corp")]
    #[case("Forklift 3000")]
    #[case("Étagère")]
    fn accepts_names(#[case] name: &str) {
        assert!(is_display_name(name));
    }

    #[rstest]
    #[case("")]
    #[case("3M Tape")]
    #[case(" Leading space")]
    #[case("Acme, Inc.")]
    #[case("Robert'); DROP TABLE")]
    fn rejects_names(#[case] name: &str) {
        assert!(!is_display_name(name));
    }

    #[test]
    fn enforces_length_limit() {
        assert!(is_display_name(&"a".repeat(100)));
        assert!(!is_display_name(&"a".repeat(101)));
    }

    #[test]
    fn credential_charset() {
        assert!(validate_credential_charset("warehouse_admin-1").is_ok());
        assert!(validate_credential_charset("bad name").is_err());
        assert!(validate_credential_charset("p@ss").is_err());
    }

    proptest! {
        #[test]
        fn letter_then_alphanumerics_is_accepted(name in "[A-Za-z][A-Za-z0-9 ]{0,99}") {
            prop_assert!(is_display_name(&name));
        }

        #[test]
        fn punctuation_is_rejected(prefix in "[A-Za-z]{1,10}", punct in "[!@#$%^&*(),.;:'\"]") {
            let name = format!("{prefix}{punct}");
            prop_assert!(!is_display_name(&name));
        }
    }
}
