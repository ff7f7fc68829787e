//! Dotted key identifiers (`common.welcome`, `settings.profile.title`).

use crate::error::{CoreError, CoreResult};

/// Maximum key length in bytes.
pub const MAX_KEY_LENGTH: usize = 255;

/// Check that `key` is a usable dotted identifier.
///
/// Rejects empty keys, keys longer than [`MAX_KEY_LENGTH`], empty segments
/// (`a..b`, `.a`, `a.`) and surrounding whitespace.
pub fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() {
        return Err(CoreError::ValidationError("Key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CoreError::ValidationError(format!(
            "Key exceeds {MAX_KEY_LENGTH} bytes: {key}"
        )));
    }
    if key.trim() != key {
        return Err(CoreError::ValidationError(format!(
            "Key has leading or trailing whitespace: '{key}'"
        )));
    }
    if key.split('.').any(str::is_empty) {
        return Err(CoreError::ValidationError(format!(
            "Key has an empty segment: {key}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_nested_keys() {
        assert!(validate_key("common.welcome").is_ok());
        assert!(validate_key("title").is_ok());
    }

    #[test]
    fn rejects_malformed_keys() {
        for bad in ["", ".a", "a.", "a..b", " a", "a "] {
            assert!(
                matches!(validate_key(bad), Err(CoreError::ValidationError(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_key(&"k".repeat(MAX_KEY_LENGTH + 1)).is_err());
    }
}
