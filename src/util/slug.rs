use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("slug pattern is valid"));

/// Turn a display name into a stable id: lowercased, with every run of
/// characters that are not letters or digits collapsed into a single dash.
/// Returns an empty string if the name has no letters or digits.
pub fn slugify(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    NON_WORD.replace_all(&lower, "-").trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Reasoning"), "reasoning");
        assert_eq!(slugify("  Verbal Ability  "), "verbal-ability");
        assert_eq!(slugify("Data Interpretation & Logic!"), "data-interpretation-logic");
        assert_eq!(slugify("C++ / Rust"), "c-rust");
        assert_eq!(slugify("Café 2024"), "café-2024");
        assert_eq!(slugify("!!!"), "");
    }
}
