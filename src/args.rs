use clap::Parser;
use std::path::PathBuf;

use crate::{
    catalog::DEFAULT_THEME,
    session::{GameConfig, GameMode, RevealPolicy},
};

const TIME_LIMITS: [u64; 4] = [0, 30, 60, 90];

#[derive(Parser, Debug)]
#[command(name = "mots-en-tete", about = "Associe un maximum de mots au mot-clé affiché")]
pub struct Args {
    /// Game mode
    #[arg(long, value_enum, default_value_t = GameMode::Solo)]
    pub mode: GameMode,

    /// Catalog theme (unknown themes use "all")
    #[arg(long, default_value = DEFAULT_THEME)]
    pub theme: String,

    /// Seconds per round: 30, 60 or 90 (0 for untimed)
    #[arg(long, default_value_t = 60, value_parser = parse_time_limit)]
    pub time_limit: u64,

    /// Number of rounds
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub rounds: u64,

    /// When to reveal definitions and expected words
    #[arg(long, value_enum, default_value_t = RevealPolicy::AfterRound)]
    pub show_answers: RevealPolicy,

    /// Simulated opponents in multiplayer mode
    #[arg(long, default_value_t = 3)]
    pub bots: usize,

    /// Your player name
    #[arg(long, default_value = "Joueur")]
    pub name: String,

    /// Seed for keyword and bot randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON catalog replacing the built-in keywords
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// JSON list of custom keywords for creative mode
    #[arg(long)]
    pub custom: Option<PathBuf>,

    /// Write the final results as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Persist the room, answers and results to SQLite
    #[arg(long)]
    pub db: bool,

    /// Database file (defaults to the platform data directory)
    #[arg(long, requires = "db")]
    pub db_path: Option<PathBuf>,
}

impl Args {
    pub fn game_config(&self) -> GameConfig {
        let max_players = match self.mode {
            GameMode::Multiplayer => Some(self.bots + 1),
            GameMode::Solo | GameMode::Creative => Some(1),
        };

        GameConfig {
            mode: self.mode,
            theme: self.theme.clone(),
            time_limit: self.time_limit,
            number_of_rounds: self.rounds as usize,
            show_answers: self.show_answers,
            max_players,
        }
    }
}

fn parse_time_limit(value: &str) -> Result<u64, String> {
    let seconds: u64 = value
        .parse()
        .map_err(|_| format!("invalid number of seconds: {}", value))?;
    if TIME_LIMITS.contains(&seconds) {
        Ok(seconds)
    } else {
        Err(format!("time limit must be one of {:?}", TIME_LIMITS))
    }
}
