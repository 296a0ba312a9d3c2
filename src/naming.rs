//! Identifier normalization: table names to entity names and back.
//!
//! Tables travel on the wire as plural snake_case (`order_items`); the IR
//! carries the semantic singular PascalCase entity (`OrderItem`). Inflection
//! checks an irregular-form table first and applies English suffix rules
//! after, falling back to the `inflector` crate for anything the rules do
//! not cover.

use inflector::Inflector;

/// Irregular singular/plural pairs. These override every suffix rule, and an
/// external pluralizer must agree on them.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("mouse", "mice"),
];

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Pluralize a word: irregulars first, suffix rules second, inflector last.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }

    // consonant-y -> -ies
    if let Some(stem) = lower.strip_suffix('y') {
        if let Some(prev) = stem.chars().last() {
            if !is_vowel(prev) {
                return format!("{}ies", stem);
            }
        }
    }
    // -fe -> -ves, -f -> -ves
    if let Some(stem) = lower.strip_suffix("fe") {
        return format!("{}ves", stem);
    }
    if let Some(stem) = lower.strip_suffix('f') {
        return format!("{}ves", stem);
    }
    // sibilant endings -> -es
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh")
    {
        return format!("{}es", lower);
    }

    lower.to_plural()
}

/// Singularize a word: the reverse of [`pluralize`], deterministic but not
/// necessarily a true inverse for constructed inputs.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }

    if let Some(stem) = lower.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = lower.strip_suffix("ves") {
        return format!("{}f", stem);
    }
    if let Some(stem) = lower.strip_suffix("es") {
        if stem.ends_with('s') || stem.ends_with('x') || stem.ends_with("ch") || stem.ends_with("sh")
        {
            return stem.to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return lower[..lower.len() - 1].to_string();
    }

    lower.to_singular()
}

/// `users` -> `User`, `order_items` -> `OrderItem`.
pub fn table_to_entity(table: &str) -> String {
    singularize(&table.to_lowercase()).to_pascal_case()
}

/// `User` -> `users`, `OrderItem` -> `order_items`.
pub fn entity_to_table(entity: &str) -> String {
    pluralize(&entity.to_snake_case())
}
