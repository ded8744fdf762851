/// Lowercase `text` and split it on runs of non-alphanumeric characters.
///
/// Alphanumeric follows Unicode, so accented and CJK letters stay inside
/// tokens. No stemming or stop-word removal is applied.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(tokenize("Hello, World! it's 2024"), vec!["hello", "world", "it", "s", "2024"]);
    }

    #[test]
    fn keeps_unicode_letters() {
        assert_eq!(tokenize("Café—naïve 東京"), vec!["café", "naïve", "東京"]);
    }

    #[test]
    fn empty_and_symbol_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ...!!  ").is_empty());
    }
}
