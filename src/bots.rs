use rand::Rng;

/// Plausible words any player might type, whatever the keyword.
pub const FILLER_WORDS: &[&str] = &["travail", "sécurité", "protection", "formation", "règles", "équipe"];

const EXPECTED_WORD_CHANCE: f64 = 0.6;
const ECHO_CHANCE: f64 = 0.3;
const FILLER_CHANCE: f64 = 0.2;
const MIN_WORDS: usize = 3;
const MAX_WORDS: usize = 7;

/// Generates a simulated opponent's answer for a round.
///
/// Draws from the expected words, echoes some of the human's words, and adds
/// filler, then keeps a random-length prefix of the deduplicated list.
pub fn generate_bot_words<R, E, H>(expected_words: &[E], human_words: &[H], rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
    E: AsRef<str>,
    H: AsRef<str>,
{
    let mut words: Vec<String> = Vec::new();
    let mut push = |word: &str| {
        if !words.iter().any(|w| w == word) {
            words.push(word.to_string());
        }
    };

    for word in expected_words {
        if rng.gen_bool(EXPECTED_WORD_CHANCE) {
            push(word.as_ref());
        }
    }
    for word in human_words {
        if rng.gen_bool(ECHO_CHANCE) {
            push(word.as_ref());
        }
    }
    for &word in FILLER_WORDS {
        if rng.gen_bool(FILLER_CHANCE) {
            push(word);
        }
    }

    let limit = rng.gen_range(MIN_WORDS..=MAX_WORDS);
    words.truncate(limit);
    words
}
