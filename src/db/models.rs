use chrono::{DateTime, Utc};
use rand::Rng;

use crate::{
    catalog::KeywordCard,
    session::{GameConfig, Player},
};

const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const ROOM_CODE_LEN: usize = 6;

/// Short uppercase code players type to join a room.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// A player on a room's roster with their running total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    pub player: Player,
    pub score: usize,
}

/// Represents a room record in the database
#[derive(Debug, Clone)]
pub struct GameRoom {
    pub id: String,
    pub config: GameConfig,
    pub players: Vec<RoomPlayer>,
    pub current_round: usize,
    /// Keyword of the round in progress, if one was started
    pub current_keyword: Option<KeywordCard>,
    pub game_finished: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One player's words for one round of a room
#[derive(Debug, Clone)]
pub struct PlayerAnswer {
    pub room_id: String,
    pub player_id: String,
    pub player_name: String,
    pub round: usize,
    pub words: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Helper function to serialize a word list to JSON
pub fn serialize_words(words: &[String]) -> String {
    serde_json::to_string(words).unwrap_or_else(|_| "[]".to_string())
}

/// Helper function to deserialize a word list from JSON
pub fn deserialize_words(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Parse a stored RFC 3339 timestamp, falling back to now
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
