//! Game configuration, round submissions and the per-session round history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    catalog::{DEFAULT_THEME, KeywordCard},
    scoring::{ScoreBoard, score_multiplayer, score_solo},
};

pub type PlayerId = String;

/// How rounds are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// One player against the curated expected words.
    Solo,
    /// Points for words shared with other players.
    Multiplayer,
    /// Solo scoring against user-defined keywords.
    Creative,
}

impl GameMode {
    /// True when rounds are scored against expected words rather than other players.
    pub fn scores_against_expected(self) -> bool {
        matches!(self, GameMode::Solo | GameMode::Creative)
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "solo" => Some(GameMode::Solo),
            "multiplayer" => Some(GameMode::Multiplayer),
            "creative" => Some(GameMode::Creative),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GameMode::Solo => "solo",
            GameMode::Multiplayer => "multiplayer",
            GameMode::Creative => "creative",
        };
        write!(f, "{}", s)
    }
}

/// When definitions and expected words are shown. Display only, never affects scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RevealPolicy {
    AfterRound,
    EndGame,
}

impl std::fmt::Display for RevealPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RevealPolicy::AfterRound => "after-round",
            RevealPolicy::EndGame => "end-game",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub mode: GameMode,
    pub theme: String,
    /// Seconds per round; 0 means untimed.
    pub time_limit: u64,
    pub number_of_rounds: usize,
    pub show_answers: RevealPolicy,
    pub max_players: Option<usize>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Solo,
            theme: DEFAULT_THEME.to_string(),
            time_limit: 60,
            number_of_rounds: 5,
            show_answers: RevealPolicy::AfterRound,
            max_players: None,
        }
    }
}

impl GameConfig {
    /// Creative games cannot play more rounds than there are custom keywords.
    pub fn capped_to_pool(mut self, pool_size: usize) -> Self {
        if self.mode == GameMode::Creative {
            self.number_of_rounds = self.number_of_rounds.min(pool_size);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub is_host: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_host: false,
        }
    }

    pub fn host(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            is_host: true,
            ..Self::new(id, name)
        }
    }
}

/// Words one player entered during a round, deduplicated case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerWords {
    words: Vec<String>,
}

impl PlayerWords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trimmed word. Blank input and case-insensitive repeats are rejected.
    pub fn add(&mut self, raw: &str) -> bool {
        let word = raw.trim();
        if word.is_empty() {
            return false;
        }

        let lower = word.to_lowercase();
        if self.words.iter().any(|w| w.to_lowercase() == lower) {
            return false;
        }

        self.words.push(word.to_string());
        true
    }

    pub fn remove(&mut self, word: &str) -> bool {
        let before = self.words.len();
        self.words.retain(|w| w != word);
        self.words.len() != before
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Every player's words for one round, in registration order.
///
/// Editable while open; frozen once [`RoundSubmissions::close`] is called.
#[derive(Debug, Clone, Default)]
pub struct RoundSubmissions {
    entries: Vec<(PlayerId, PlayerWords)>,
    closed: bool,
}

impl RoundSubmissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, player: &str) {
        if self.entry(player).is_none() {
            self.entries.push((player.to_string(), PlayerWords::new()));
        }
    }

    pub fn add_word(&mut self, player: &str, word: &str) -> bool {
        if self.rejects_edit(player) {
            return false;
        }
        self.register(player);
        self.entry_mut(player).is_some_and(|words| words.add(word))
    }

    pub fn remove_word(&mut self, player: &str, word: &str) -> bool {
        if self.rejects_edit(player) {
            return false;
        }
        self.entry_mut(player).is_some_and(|words| words.remove(word))
    }

    /// Replaces a player's words, applying the same rules as [`Self::add_word`].
    pub fn set_words<I, S>(&mut self, player: &str, words: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.rejects_edit(player) {
            return false;
        }
        self.register(player);

        let mut fresh = PlayerWords::new();
        for word in words {
            fresh.add(word.as_ref());
        }
        if let Some(existing) = self.entry_mut(player) {
            *existing = fresh;
        }
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// A player's words, empty when the player never submitted.
    pub fn words(&self, player: &str) -> &[String] {
        self.entry(player).map(PlayerWords::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(player, words)| (player.as_str(), words.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn rejects_edit(&self, player: &str) -> bool {
        if self.closed {
            warn!(player, "ignoring edit to a closed round");
        }
        self.closed
    }

    fn entry(&self, player: &str) -> Option<&PlayerWords> {
        self.entries
            .iter()
            .find(|(id, _)| id == player)
            .map(|(_, words)| words)
    }

    fn entry_mut(&mut self, player: &str) -> Option<&mut PlayerWords> {
        self.entries
            .iter_mut()
            .find(|(id, _)| id == player)
            .map(|(_, words)| words)
    }
}

/// Frozen outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    round: usize,
    keyword: String,
    definition: String,
    expected_words: Vec<String>,
    player_answers: BTreeMap<PlayerId, Vec<String>>,
    common_words: Vec<String>,
    scores: BTreeMap<PlayerId, usize>,
    completed_at: DateTime<Utc>,
}

impl RoundResult {
    /// Scores a closed round according to `mode`.
    pub fn score(
        mode: GameMode,
        round: usize,
        card: &KeywordCard,
        submissions: &RoundSubmissions,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let player_answers: BTreeMap<PlayerId, Vec<String>> = submissions
            .iter()
            .map(|(player, words)| (player.to_string(), words.to_vec()))
            .collect();

        let (common_words, scores) = if mode.scores_against_expected() {
            let mut matched: Vec<String> = Vec::new();
            let mut scores = BTreeMap::new();
            for (player, words) in submissions.iter() {
                let solo = score_solo(words, &card.expected_words);
                for word in solo.matched {
                    if !matched.contains(&word) {
                        matched.push(word);
                    }
                }
                scores.insert(player.to_string(), solo.score);
            }
            (matched, scores)
        } else {
            let outcome = score_multiplayer(submissions);
            (outcome.common_words, outcome.scores)
        };

        Self {
            round,
            keyword: card.keyword.clone(),
            definition: card.definition.clone(),
            expected_words: card.expected_words.clone(),
            player_answers,
            common_words,
            scores,
            completed_at,
        }
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn expected_words(&self) -> &[String] {
        &self.expected_words
    }

    pub fn player_answers(&self) -> &BTreeMap<PlayerId, Vec<String>> {
        &self.player_answers
    }

    /// Matched words (solo/creative) or words shared by several players (multiplayer).
    pub fn common_words(&self) -> &[String] {
        &self.common_words
    }

    pub fn scores(&self) -> &BTreeMap<PlayerId, usize> {
        &self.scores
    }

    pub fn score_of(&self, player: &str) -> usize {
        self.scores.get(player).copied().unwrap_or(0)
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// The round currently accepting words.
#[derive(Debug, Clone)]
pub struct ActiveRound {
    pub number: usize,
    pub card: KeywordCard,
    pub submissions: RoundSubmissions,
}

/// A game from first round to final ranking.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: String,
    config: GameConfig,
    players: Vec<Player>,
    scores: ScoreBoard,
    history: Vec<RoundResult>,
    active: Option<ActiveRound>,
}

impl GameSession {
    pub fn new(id: impl Into<String>, config: GameConfig) -> Self {
        Self {
            id: id.into(),
            config,
            players: Vec::new(),
            scores: ScoreBoard::new(),
            history: Vec::new(),
            active: None,
        }
    }

    /// Adds a player unless the id is taken or the table is full.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.players.iter().any(|p| p.id == player.id) {
            return false;
        }
        if let Some(max) = self.config.max_players {
            if self.players.len() >= max {
                warn!(player = %player.id, max, "session is full");
                return false;
            }
        }

        self.scores.register(&player.id);
        self.players.push(player);
        true
    }

    /// Opens the next round. An unfinished active round is discarded.
    pub fn begin_round(&mut self, card: KeywordCard) -> &mut ActiveRound {
        if let Some(previous) = self.active.take() {
            warn!(round = previous.number, "discarding unfinished round");
        }

        let number = self.history.len() + 1;
        info!(round = number, keyword = %card.keyword, "round started");

        let mut submissions = RoundSubmissions::new();
        for player in &self.players {
            submissions.register(&player.id);
        }

        self.active.insert(ActiveRound {
            number,
            card,
            submissions,
        })
    }

    pub fn active_round(&self) -> Option<&ActiveRound> {
        self.active.as_ref()
    }

    pub fn active_round_mut(&mut self) -> Option<&mut ActiveRound> {
        self.active.as_mut()
    }

    pub fn submit_word(&mut self, player: &str, word: &str) -> bool {
        self.active
            .as_mut()
            .is_some_and(|round| round.submissions.add_word(player, word))
    }

    pub fn remove_word(&mut self, player: &str, word: &str) -> bool {
        self.active
            .as_mut()
            .is_some_and(|round| round.submissions.remove_word(player, word))
    }

    /// Closes and scores the active round, returning its frozen result.
    pub fn finish_round(&mut self) -> Option<&RoundResult> {
        self.finish_round_at(Utc::now())
    }

    pub fn finish_round_at(&mut self, completed_at: DateTime<Utc>) -> Option<&RoundResult> {
        let mut round = self.active.take()?;
        round.submissions.close();

        let result = RoundResult::score(
            self.config.mode,
            round.number,
            &round.card,
            &round.submissions,
            completed_at,
        );
        self.scores.add_round(result.scores());

        info!(
            round = result.round(),
            keyword = result.keyword(),
            common = result.common_words().len(),
            "round finished"
        );

        self.history.push(result);
        self.history.last()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn history(&self) -> &[RoundResult] {
        &self.history
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    pub fn total_score(&self, player: &str) -> usize {
        self.scores.total(player)
    }

    pub fn current_round(&self) -> usize {
        self.active
            .as_ref()
            .map(|round| round.number)
            .unwrap_or(self.history.len())
    }

    pub fn is_finished(&self) -> bool {
        self.active.is_none() && self.history.len() >= self.config.number_of_rounds
    }

    /// Players ordered by total score, highest first; ties keep join order.
    pub fn ranking(&self) -> Vec<(&Player, usize)> {
        let mut ranked: Vec<(&Player, usize)> = self
            .players
            .iter()
            .map(|p| (p, self.scores.total(&p.id)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(keyword: &str, expected: &[&str]) -> KeywordCard {
        KeywordCard {
            keyword: keyword.to_string(),
            definition: format!("definition of {}", keyword),
            expected_words: expected.iter().map(|w| w.to_string()).collect(),
        }
    }

    fn config(mode: GameMode, rounds: usize) -> GameConfig {
        GameConfig {
            mode,
            number_of_rounds: rounds,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_player_words_dedupe_case_insensitive() {
        let mut words = PlayerWords::new();
        assert!(words.add("  Danger "));
        assert!(!words.add("danger"));
        assert!(!words.add("DANGER"));
        assert!(!words.add("   "));
        assert!(words.add("bruit"));
        assert_eq!(words.as_slice(), &["Danger".to_string(), "bruit".to_string()]);
    }

    #[test]
    fn test_player_words_remove() {
        let mut words = PlayerWords::new();
        words.add("danger");
        assert!(!words.remove("bruit"));
        assert!(words.remove("danger"));
        assert!(words.is_empty());
    }

    #[test]
    fn test_closed_submissions_are_frozen() {
        let mut subs = RoundSubmissions::new();
        subs.add_word("p1", "danger");
        subs.close();
        assert!(!subs.add_word("p1", "bruit"));
        assert!(!subs.remove_word("p1", "danger"));
        assert!(!subs.set_words("p1", ["x"]));
        assert_eq!(subs.words("p1"), &["danger".to_string()]);
    }

    #[test]
    fn test_set_words_replaces_and_dedupes() {
        let mut subs = RoundSubmissions::new();
        subs.add_word("p1", "danger");
        assert!(subs.set_words("p1", ["bruit", "Bruit", "stress"]));
        assert_eq!(subs.words("p1"), &["bruit".to_string(), "stress".to_string()]);
        assert!(subs.words("nobody").is_empty());
    }

    #[test]
    fn test_game_mode_round_trip_strings() {
        for mode in [GameMode::Solo, GameMode::Multiplayer, GameMode::Creative] {
            assert_eq!(GameMode::from_string(&mode.to_string()), Some(mode));
        }
        assert_eq!(GameMode::from_string("versus"), None);
    }

    #[test]
    fn test_creative_rounds_capped_to_pool() {
        let capped = config(GameMode::Creative, 10).capped_to_pool(3);
        assert_eq!(capped.number_of_rounds, 3);
        let solo = config(GameMode::Solo, 10).capped_to_pool(3);
        assert_eq!(solo.number_of_rounds, 10);
    }

    #[test]
    fn test_solo_session_flow() {
        let mut session = GameSession::new("solo-1", config(GameMode::Solo, 1));
        session.add_player(Player::host("me", "Moi"));

        session.begin_round(card("Santé", &["bien-être", "physique", "mental", "social"]));
        assert!(session.submit_word("me", "bienetre"));
        assert!(session.submit_word("me", "Physiques"));
        assert!(session.submit_word("me", "social"));
        assert!(session.submit_word("me", "fatigue"));
        assert!(!session.is_finished());

        let result = session.finish_round().cloned().expect("round was active");
        assert_eq!(result.round(), 1);
        assert_eq!(result.score_of("me"), 3);
        assert_eq!(result.common_words(), &["bienetre", "Physiques", "social"]);
        assert_eq!(result.expected_words().len(), 4);
        assert_eq!(session.total_score("me"), 3);
        assert!(session.is_finished());
        assert!(!session.submit_word("me", "late"));
    }

    #[test]
    fn test_multiplayer_session_accumulates_totals() {
        let mut session = GameSession::new("room", config(GameMode::Multiplayer, 2));
        for id in ["p1", "p2", "p3"] {
            session.add_player(Player::new(id, id.to_uppercase()));
        }

        session.begin_round(card("Danger", &[]));
        session.submit_word("p1", "danger");
        session.submit_word("p1", "fatigue");
        session.submit_word("p2", "danger");
        session.submit_word("p2", "stress");
        session.submit_word("p3", "bruit");
        let first = session.finish_round().cloned().expect("round was active");
        assert_eq!(first.common_words(), &["danger"]);
        assert_eq!(first.score_of("p3"), 0);

        session.begin_round(card("Risque", &[]));
        session.submit_word("p2", "bruit");
        session.submit_word("p3", "bruits");
        session.finish_round();

        assert_eq!(session.total_score("p1"), 1);
        assert_eq!(session.total_score("p2"), 2);
        assert_eq!(session.total_score("p3"), 1);
        assert_eq!(session.ranking()[0].0.id, "p2");
        assert!(session.is_finished());
    }

    #[test]
    fn test_max_players_enforced() {
        let mut cfg = config(GameMode::Multiplayer, 1);
        cfg.max_players = Some(2);
        let mut session = GameSession::new("room", cfg);
        assert!(session.add_player(Player::new("a", "A")));
        assert!(!session.add_player(Player::new("a", "A again")));
        assert!(session.add_player(Player::new("b", "B")));
        assert!(!session.add_player(Player::new("c", "C")));
        assert_eq!(session.players().len(), 2);
    }

    #[test]
    fn test_finish_without_active_round() {
        let mut session = GameSession::new("s", GameConfig::default());
        assert!(session.finish_round().is_none());
        assert_eq!(session.current_round(), 0);
    }

    #[test]
    fn test_round_result_serializes() {
        let mut subs = RoundSubmissions::new();
        subs.add_word("me", "danger");
        subs.close();
        let result = RoundResult::score(
            GameMode::Solo,
            1,
            &card("Danger", &["danger"]),
            &subs,
            Utc::now(),
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: RoundResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
