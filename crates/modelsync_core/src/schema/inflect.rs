//! English inflection helpers for entity and table names.
//!
//! Covers the regular forms used by entity naming: `y` -> `ies`,
//! sibilant `es`, `f`/`fe` -> `ves`, and a short irregular list.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

static PLURAL_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)([^aeiouy])y$", "${1}ies"),
        (r"(?i)(x|ch|ss|sh|z)$", "${1}es"),
        (r"(?i)([^f])fe$", "${1}ves"),
        (r"(?i)([lr])f$", "${1}ves"),
        (r"(?i)s$", "s"),
        (r"$", "s"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid plural rule"), replacement))
    .collect()
});

static SINGULAR_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)([^aeiouy])ies$", "${1}y"),
        (r"(?i)(x|ch|ss|sh|z)es$", "${1}"),
        (r"(?i)([lr])ves$", "${1}f"),
        (r"(?i)ives$", "ife"),
        (r"(?i)ss$", "ss"),
        (r"(?i)s$", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid singular rule"), replacement))
    .collect()
});

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "series", "species", "news"];

/// Returns the plural form of a lowercase singular word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return (*plural).to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }
    apply_first(&PLURAL_RULES, word)
}

/// Returns the singular form of a lowercase word; singular input is unchanged.
pub fn singularize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == word) {
        return (*singular).to_string();
    }
    if IRREGULAR.iter().any(|(singular, _)| *singular == word) {
        return word.to_string();
    }
    apply_first(&SINGULAR_RULES, word)
}

/// Returns whether `value` can be used unescaped as a table or column name.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

fn apply_first(rules: &[(Regex, &'static str)], word: &str) -> String {
    for (pattern, replacement) in rules {
        if pattern.is_match(word) {
            return pattern.replace(word, *replacement).into_owned();
        }
    }
    word.to_string()
}
