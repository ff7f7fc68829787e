//! Interpolation placeholder checks for translated strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// `{{name}}`, `{name}`, `{0}`, `%s`, `%d`, `%1$s`, `${name}`
static PLACEHOLDER_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*[\w.-]+\s*\}\}|\$\{[^}]+\}|\{[\w.-]+\}|%(?:\d+\$)?[sdif@]").ok()
});

/// Count every placeholder token in `text`.
pub fn placeholder_counts(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    if let Some(re) = PLACEHOLDER_REGEX.as_ref() {
        for m in re.find_iter(text) {
            let token: String = m.as_str().chars().filter(|c| !c.is_whitespace()).collect();
            *counts.entry(token).or_insert(0) += 1;
        }
    }
    counts
}

/// Placeholders present in `source` that `translated` dropped, with the missing count.
///
/// Reordering is fine; extra placeholders in the translation are ignored.
pub fn missing_placeholders(source: &str, translated: &str) -> Vec<String> {
    let expected = placeholder_counts(source);
    let actual = placeholder_counts(translated);

    expected
        .iter()
        .filter_map(|(token, count)| {
            let found = actual.get(token).copied().unwrap_or_default();
            (found < *count).then(|| format!("{token} (missing {})", count - found))
        })
        .collect()
}
