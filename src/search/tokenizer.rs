use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is valid"));

/// Splits analyzed free text into lowercase terms with their frequencies.
/// Single-character terms are dropped.
pub fn analyze_text(text: &str) -> HashMap<String, usize> {
    let mut terms = HashMap::new();
    for term in tokenize_query(text) {
        *terms.entry(term).or_insert(0) += 1;
    }
    terms
}

/// Splits a query into lowercase terms, preserving order and duplicates.
pub fn tokenize_query(query: &str) -> Vec<String> {
    WORD.find_iter(&query.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| word.chars().count() > 1)
        .collect()
}
