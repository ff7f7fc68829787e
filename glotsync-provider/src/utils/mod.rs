//! Utility modules.

/// Log sanitization helpers so prompts and keys never land in logs whole.
pub mod log_sanitizer;
