//! Log sanitization utilities
//!
//! Prompts and completions can be large and may carry customer copy; API keys must
//! never be printed. Everything written to debug/error logs passes through here.

/// Maximum number of bytes to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Number of trailing characters of a secret left visible.
const SECRET_VISIBLE_SUFFIX: usize = 4;

/// MSRV-compatible replacement for `str::floor_char_boundary` (stable since 1.91.0).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Strings within the limit are returned unchanged; longer ones are cut at a char
/// boundary and suffixed with the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Mask an API key, keeping only its last few characters.
pub fn redact_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= SECRET_VISIBLE_SUFFIX * 2 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - SECRET_VISIBLE_SUFFIX).collect();
    format!("****{tail}")
}
