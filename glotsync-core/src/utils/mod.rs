//! Shared helpers

pub mod datetime;
pub mod key_path;
pub mod placeholder;
