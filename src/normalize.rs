//! Canonical comparison keys for player words.
//!
//! A normalized word is only ever used to compare two words. It is never stored
//! or shown to a player.

use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block, stripped after NFD decomposition.
const COMBINING_MARKS: std::ops::RangeInclusive<char> = '\u{0300}'..='\u{036f}';

/// Normalize a word for comparison.
///
/// Applies, in order:
/// 1. Lowercase
/// 2. Trim surrounding whitespace
/// 3. NFD decomposition, then strip combining diacritical marks (`é` -> `e`)
/// 4. Naive plural fold: drop a trailing `s` not preceded by `s`, then a trailing
///    `x` not preceded by `x`
/// 5. Remove every hyphen and whitespace character
///
/// Steps 4 and 5 are repeated until nothing changes, so `"bus-"` and `"asx"`
/// settle on the same key a second pass would produce.
pub fn normalize_word(word: &str) -> String {
    let stripped: String = word
        .to_lowercase()
        .trim()
        .nfd()
        .filter(|c| !COMBINING_MARKS.contains(c))
        .collect();

    let mut current = stripped;
    loop {
        let next = remove_separators(&fold_plural(&current));
        if next == current {
            return next;
        }
        current = next;
    }
}

fn fold_plural(word: &str) -> String {
    let folded = drop_trailing(word, 's');
    drop_trailing(&folded, 'x')
}

/// Drops a trailing `marker` when the character before it is something else.
fn drop_trailing(word: &str, marker: char) -> String {
    let mut chars = word.chars().rev();
    match (chars.next(), chars.next()) {
        (Some(last), Some(before)) if last == marker && before != marker => {
            let mut out = word.to_string();
            out.pop();
            out
        }
        _ => word.to_string(),
    }
}

fn remove_separators(word: &str) -> String {
    word.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}
