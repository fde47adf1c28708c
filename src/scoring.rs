use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    matcher::{ReferenceSet, is_match},
    normalize::normalize_word,
    session::{PlayerId, RoundSubmissions},
};

/// Minimum number of distinct players a class needs to count as common.
pub const COMMON_WORD_MIN_PLAYERS: usize = 2;

/// Outcome of scoring one player against a curated expected-word list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoloRound {
    pub matched: Vec<String>,
    pub score: usize,
}

/// Solo and creative scoring: one point per player word matching an expected word.
pub fn score_solo<P, E>(player_words: &[P], expected_words: &[E]) -> SoloRound
where
    P: AsRef<str>,
    E: AsRef<str>,
{
    let reference = ReferenceSet::new(expected_words);
    let matched: Vec<String> = player_words
        .iter()
        .map(|w| w.as_ref())
        .filter(|w| reference.contains(w))
        .map(str::to_string)
        .collect();

    debug!(
        matched = matched.len(),
        submitted = player_words.len(),
        "solo round scored"
    );

    SoloRound {
        score: matched.len(),
        matched,
    }
}

/// A group of words judged equivalent to the word that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordClass {
    representative: String,
    contributors: Vec<PlayerId>,
    members: usize,
}

impl WordClass {
    pub fn representative(&self) -> &str {
        &self.representative
    }

    /// Distinct players who landed at least one word in this class.
    pub fn player_count(&self) -> usize {
        self.contributors.len()
    }

    /// Total words absorbed, including repeats from the same player.
    pub fn members(&self) -> usize {
        self.members
    }

    pub fn is_common(&self) -> bool {
        self.player_count() >= COMMON_WORD_MIN_PLAYERS
    }
}

/// Greedy clustering of a round's words into equivalence classes.
///
/// A word joins the first class (in creation order) whose representative it
/// matches. It is never compared against the other members, so two members of
/// the same class may not match each other. Classes are not a transitive
/// closure of the match relation.
#[derive(Debug, Clone, Default)]
pub struct CommonWordTable {
    classes: Vec<WordClass>,
}

impl CommonWordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_submissions(submissions: &RoundSubmissions) -> Self {
        let mut table = Self::new();
        for (player, words) in submissions.iter() {
            for word in words {
                table.insert(player, word);
            }
        }
        table
    }

    /// Adds one submitted word. Blank words are ignored.
    pub fn insert(&mut self, player: &str, word: &str) {
        let surface = word.trim().to_lowercase();
        if normalize_word(&surface).is_empty() {
            return;
        }

        match self
            .classes
            .iter_mut()
            .find(|class| is_match(&surface, &class.representative))
        {
            Some(class) => {
                class.members += 1;
                if !class.contributors.iter().any(|p| p == player) {
                    class.contributors.push(player.to_string());
                }
            }
            None => self.classes.push(WordClass {
                representative: surface,
                contributors: vec![player.to_string()],
                members: 1,
            }),
        }
    }

    pub fn classes(&self) -> &[WordClass] {
        &self.classes
    }

    /// Representatives of classes shared by at least two players, in creation order.
    pub fn common_words(&self) -> Vec<String> {
        self.classes
            .iter()
            .filter(|class| class.is_common())
            .map(|class| class.representative.clone())
            .collect()
    }
}

/// Outcome of a multiplayer round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplayerRound {
    pub common_words: Vec<String>,
    pub scores: BTreeMap<PlayerId, usize>,
}

/// Multiplayer scoring: one point per common class the player's words match.
///
/// Every registered player gets an entry, even with no words.
pub fn score_multiplayer(submissions: &RoundSubmissions) -> MultiplayerRound {
    let table = CommonWordTable::from_submissions(submissions);
    let common_words = table.common_words();

    let scores = submissions
        .iter()
        .map(|(player, words)| {
            (
                player.to_string(),
                count_classes_hit(words, &common_words),
            )
        })
        .collect();

    debug!(
        classes = table.classes().len(),
        common = common_words.len(),
        "multiplayer round scored"
    );

    MultiplayerRound {
        common_words,
        scores,
    }
}

/// Number of common classes matched by at least one of `words`.
///
/// A single word may hit several classes whose representatives do not match
/// each other, so the result is bounded by the number of common classes but
/// not by the word count.
fn count_classes_hit(words: &[String], common_words: &[String]) -> usize {
    common_words
        .iter()
        .filter(|common| words.iter().any(|word| is_match(word, common)))
        .count()
}

/// Running per-player totals across a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    totals: BTreeMap<PlayerId, usize>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `player` has an entry, starting at zero.
    pub fn register(&mut self, player: &str) {
        self.totals.entry(player.to_string()).or_insert(0);
    }

    pub fn add_round(&mut self, round_scores: &BTreeMap<PlayerId, usize>) {
        for (player, score) in round_scores {
            *self.totals.entry(player.clone()).or_insert(0) += score;
        }
    }

    pub fn total(&self, player: &str) -> usize {
        self.totals.get(player).copied().unwrap_or(0)
    }

    pub fn totals(&self) -> &BTreeMap<PlayerId, usize> {
        &self.totals
    }

    /// Players sorted by total, highest first. Ties keep player id order.
    pub fn ranking(&self) -> Vec<(PlayerId, usize)> {
        let mut ranked: Vec<(PlayerId, usize)> = self
            .totals
            .iter()
            .map(|(player, total)| (player.clone(), *total))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}
