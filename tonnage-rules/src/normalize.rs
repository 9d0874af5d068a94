//! Text normalization shared by product names, product codes and pattern
//! tokens.
//!
//! Both sides of every comparison go through the same function, so the
//! variants "25 KG", "25KG", "25 kgs" and "25  Kilos" all collapse to
//! `25KG` and a single pattern token covers them.
//!
//! Steps:
//! 1. Unicode decomposition with combining marks dropped (`AZÚCAR` -> `AZUCAR`)
//! 2. Uppercase
//! 3. Whitespace runs collapsed to one space
//! 4. A number followed by a unit token is glued to it (`25 KG` -> `25KG`,
//!    `1. KG` -> `1KG`), and unit aliases are folded (`KGS` -> `KG`,
//!    `LIBRAS` -> `LB`, `GRS` -> `GR`). Folding only happens in numeric
//!    context so free words are left alone.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Unit aliases and their canonical spelling.
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("KG", "KG"),
    ("KGS", "KG"),
    ("KILO", "KG"),
    ("KILOS", "KG"),
    ("KILOGRAMO", "KG"),
    ("KILOGRAMOS", "KG"),
    ("KILOGRAM", "KG"),
    ("KILOGRAMS", "KG"),
    ("LB", "LB"),
    ("LBS", "LB"),
    ("LIBRA", "LB"),
    ("LIBRAS", "LB"),
    ("POUND", "LB"),
    ("POUNDS", "LB"),
    ("G", "GR"),
    ("GR", "GR"),
    ("GRS", "GR"),
    ("GRAMO", "GR"),
    ("GRAMOS", "GR"),
    ("GRAM", "GR"),
    ("GRAMS", "GR"),
    ("TON", "TON"),
    ("TONS", "TON"),
    ("TONELADA", "TON"),
    ("TONELADAS", "TON"),
];

/// Normalize free text for pattern matching.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase();

    let words: Vec<&str> = folded.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let word = words[i];
        match split_number(word) {
            Some((number, "")) => {
                if let Some(unit) = words.get(i + 1).and_then(|next| canonical_unit(next)) {
                    out.push(format!("{}{}", number, unit));
                    i += 2;
                    continue;
                }
                out.push(number);
            }
            Some((number, suffix)) => match canonical_unit(suffix) {
                Some(unit) => out.push(format!("{}{}", number, unit)),
                None => out.push(word.to_string()),
            },
            None => out.push(word.to_string()),
        }
        i += 1;
    }

    out.join(" ")
}

/// Normalize a product code: accents dropped, uppercase, no whitespace.
pub fn normalize_code(code: &str) -> String {
    code.nfd()
        .filter(|c| !is_combining_mark(*c) && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Substring search that respects numeric boundaries.
///
/// A token that starts with a digit only matches where it is not preceded
/// by a digit or decimal point, and a token that ends with a digit only
/// matches where it is not followed by one. `5KG` therefore does not match
/// inside `25KG`, and `SACO 25` does not match `SACO 250`. Alphabetic
/// edges match anywhere, like a SQL `LIKE '%token%'`.
pub fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let leading_digit = token.starts_with(|c: char| c.is_ascii_digit());
    let trailing_digit = token.ends_with(|c: char| c.is_ascii_digit());

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(token) {
        let start = from + offset;
        let end = start + token.len();

        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        let lead_ok = !leading_digit || !before.is_some_and(is_numeric_char);
        let tail_ok = !trailing_digit || !after.is_some_and(is_numeric_char);
        if lead_ok && tail_ok {
            return true;
        }

        // Advance by one character so overlapping occurrences are still seen.
        let step = haystack[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }
    false
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn canonical_unit(token: &str) -> Option<&'static str> {
    let token = token.trim_end_matches('.');
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| *canonical)
}

/// Split a word into a leading number and the remaining suffix.
///
/// The number must start with a digit. Decimal commas become points and a
/// trailing point is dropped (`1.` -> `1`).
fn split_number(word: &str) -> Option<(String, &str)> {
    if !word.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let split_at = word
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(word.len());
    let (number, suffix) = word.split_at(split_at);
    let number = number.replace(',', ".");
    let number = number.trim_end_matches('.').to_string();
    Some((number, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_spacing_variants_collapse() {
        assert_eq!(normalize_text("Sugar 25 KG bag"), "SUGAR 25KG BAG");
        assert_eq!(normalize_text("SUGAR 25KG BAG"), "SUGAR 25KG BAG");
        assert_eq!(normalize_text("sugar   25 kgs  bag"), "SUGAR 25KG BAG");
        assert_eq!(normalize_text("AZUCAR 1. KG"), "AZUCAR 1KG");
    }

    #[test]
    fn accents_are_stripped() {
        assert_eq!(normalize_text("AZÚCAR ESTÁNDAR"), "AZUCAR ESTANDAR");
        assert_eq!(normalize_code("señ1600"), "SEN1600");
    }

    #[test]
    fn pound_aliases_fold() {
        assert_eq!(normalize_text("REFINADA 50 LIBRAS"), "REFINADA 50LB");
        assert_eq!(normalize_text("REFINADA 2 LBS"), "REFINADA 2LB");
        assert_eq!(normalize_text("REFINADA 907 GRS"), "REFINADA 907GR");
    }

    #[test]
    fn free_words_are_not_folded() {
        // "KILOS" only folds next to a number.
        assert_eq!(normalize_text("KILOS DE AZUCAR"), "KILOS DE AZUCAR");
        assert_eq!(normalize_text("SACO 25"), "SACO 25");
    }

    #[test]
    fn decimal_comma_becomes_point() {
        assert_eq!(normalize_text("MIX 0,5 KG"), "MIX 0.5KG");
    }

    #[test]
    fn numeric_tokens_respect_boundaries() {
        assert!(contains_token("SUGAR 25KG BAG", "25KG"));
        assert!(!contains_token("SUGAR 25KG BAG", "5KG"));
        assert!(!contains_token("SACO 250", "SACO 25"));
        assert!(contains_token("SACO 25 REFINADA", "SACO 25"));
        assert!(!contains_token("MIX 10.5KG", "0.5KG"));
        assert!(contains_token("225KG Y 25KG", "25KG"));
    }

    #[test]
    fn alphabetic_tokens_match_as_substrings() {
        assert!(contains_token("AZUCAR PULVERIZADA", "PULVER"));
        assert!(!contains_token("AZUCAR", ""));
    }
}
