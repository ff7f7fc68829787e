pub mod glossary_rule;
pub mod key_reference;
pub mod language;
pub mod namespace;
pub mod project;
pub mod translation_key;
pub mod translation_value;
pub mod usage_counter;
pub mod workspace;
