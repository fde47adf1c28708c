use crate::normalize::normalize_word;

/// Shortest normalized length allowed to count as a containment match.
pub const MIN_PARTIAL_MATCH_LEN: usize = 3;

/// Returns true when two words should be treated as the same concept.
///
/// Both sides are normalized first. Equal keys match; otherwise one key must
/// contain the other and the shorter key must be at least
/// [`MIN_PARTIAL_MATCH_LEN`] characters long, so `"a"` never matches `"danger"`.
///
/// The relation is symmetric but not transitive.
pub fn is_match(player_word: &str, reference_word: &str) -> bool {
    keys_match(&normalize_word(player_word), &normalize_word(reference_word))
}

fn keys_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }

    if a.contains(b) || b.contains(a) {
        let shorter = a.chars().count().min(b.chars().count());
        return shorter >= MIN_PARTIAL_MATCH_LEN;
    }

    false
}

/// Returns the player words that match at least one reference word.
///
/// Order and duplicates of `player_words` are preserved. An empty reference
/// list always yields an empty result.
pub fn find_matches<P, R>(player_words: &[P], reference_words: &[R]) -> Vec<P>
where
    P: AsRef<str> + Clone,
    R: AsRef<str>,
{
    ReferenceSet::new(reference_words).matches(player_words)
}

/// Reference words normalized once, for repeated lookups during a scoring pass.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    keys: Vec<String>,
}

impl ReferenceSet {
    pub fn new<R: AsRef<str>>(reference_words: &[R]) -> Self {
        Self {
            keys: reference_words
                .iter()
                .map(|w| normalize_word(w.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True if `word` matches any reference word.
    pub fn contains(&self, word: &str) -> bool {
        self.position(word).is_some()
    }

    /// Index of the first reference word matching `word`.
    pub fn position(&self, word: &str) -> Option<usize> {
        let key = normalize_word(word);
        self.keys.iter().position(|reference| keys_match(&key, reference))
    }

    pub fn matches<P: AsRef<str> + Clone>(&self, player_words: &[P]) -> Vec<P> {
        if self.is_empty() {
            return Vec::new();
        }

        player_words
            .iter()
            .filter(|w| self.contains(w.as_ref()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_after_normalization() {
        assert!(is_match("risque", "risques"));
        assert!(is_match("Physiques", "physique"));
        assert!(is_match("bienetre", "bien-être"));
    }

    #[test]
    fn test_containment_match() {
        assert!(is_match("danger", "dangereux"));
        assert!(is_match("dangereux", "danger"));
    }

    #[test]
    fn test_short_containment_rejected() {
        assert!(!is_match("a", "danger"));
        assert!(!is_match("an", "danger"));
        assert!(is_match("dan", "danger"));
    }

    #[test]
    fn test_unrelated_words() {
        assert!(!is_match("bruit", "danger"));
        assert!(!is_match("", "danger"));
    }

    #[test]
    fn test_empty_words_match_each_other() {
        assert!(is_match("", "  "));
    }

    #[test]
    fn test_not_transitive() {
        assert!(is_match("protection", "tect"));
        assert!(is_match("tect", "tectonique"));
        assert!(!is_match("protection", "tectonique"));
    }

    #[test]
    fn test_find_matches_basic() {
        let player = ["danger", "fatigue", "bruit"];
        let reference = ["danger", "nocif"];
        assert_eq!(find_matches(&player, &reference), vec!["danger"]);
    }

    #[test]
    fn test_find_matches_preserves_order_and_duplicates() {
        let player = vec![
            "bruit".to_string(),
            "Danger".to_string(),
            "danger".to_string(),
        ];
        let reference = ["bruits", "danger"];
        assert_eq!(find_matches(&player, &reference), player);
    }

    #[test]
    fn test_find_matches_empty_reference() {
        let reference: [&str; 0] = [];
        assert!(find_matches(&["danger"], &reference).is_empty());
    }

    #[test]
    fn test_reference_set_agrees_with_is_match() {
        let reference = ["bien-être", "EPI", "ligne de vie"];
        let set = ReferenceSet::new(&reference);
        for word in ["bienetre", "epis", "lignes de vie", "vie", "filet"] {
            let expected = reference.iter().any(|r| is_match(word, r));
            assert_eq!(set.contains(word), expected, "word: {}", word);
        }
    }
}
