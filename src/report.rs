//! Human-readable and tabular summaries of a finished game.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::{fs::File, io, path::Path};
use tracing::info;

use crate::session::{GameMode, GameSession, Player};

/// Rating shown for a solo score ratio.
pub fn solo_rating(percentage: u32) -> &'static str {
    match percentage {
        80.. => "Expert en santé au travail !",
        60..=79 => "Très bonne maîtrise !",
        40..=59 => "Bon niveau, continue !",
        _ => "Bon début, la pratique rend parfait !",
    }
}

/// Score and best possible score across all rounds for one player.
fn solo_totals(session: &GameSession, player: &str) -> (usize, usize) {
    session.history().iter().fold((0, 0), |(score, max), round| {
        (
            score + round.score_of(player),
            max + round.expected_words().len(),
        )
    })
}

fn percentage(score: usize, max: usize) -> u32 {
    if max == 0 {
        return 0;
    }
    ((score as f64 / max as f64) * 100.0).round() as u32
}

/// The player solo and creative reports are written for.
fn solo_player(session: &GameSession) -> Option<&Player> {
    session.players().first()
}

/// Text summary suitable for sharing.
pub fn share_text(session: &GameSession, generated_at: NaiveDateTime) -> String {
    let config = session.config();
    let mut lines = vec![
        "C'EST QUOI LA DÉFINITION ? - Résultats".to_string(),
        format!(
            "{} à {}",
            generated_at.format("%d/%m/%Y"),
            generated_at.format("%H:%M")
        ),
        String::new(),
    ];

    match config.mode {
        GameMode::Solo | GameMode::Creative => {
            let (score, max) = solo_player(session)
                .map(|p| solo_totals(session, &p.id))
                .unwrap_or((0, 0));
            let pct = percentage(score, max);

            lines.push(format!("Mode {}", config.mode));
            lines.push(format!("Score: {}/{} ({}%)", score, max, pct));
            lines.push(solo_rating(pct).to_string());
            lines.push(format!("Thème: {}", config.theme));
            lines.push(format!("{} manches jouées", session.history().len()));
            lines.push(format!("{}s par manche", config.time_limit));
            lines.push(String::new());

            lines.push("DÉTAIL DES MANCHES:".to_string());
            if let Some(player) = solo_player(session) {
                lines.extend(session.history().iter().map(|round| {
                    format!(
                        "{}. {}: {}/{}",
                        round.round(),
                        round.keyword(),
                        round.score_of(&player.id),
                        round.expected_words().len()
                    )
                }));
            }
        }
        GameMode::Multiplayer => {
            let ranking = session.ranking();
            lines.push(format!("Mode Multijoueur ({} joueurs)", session.players().len()));
            if let Some((winner, score)) = ranking.first() {
                lines.push(format!("Gagnant: {} ({} pts)", winner.name, score));
            }
            lines.push(format!("Thème: {}", config.theme));
            lines.push(format!("{} manches", session.history().len()));
            lines.push(String::new());

            lines.push("CLASSEMENT:".to_string());
            lines.extend(
                ranking
                    .iter()
                    .enumerate()
                    .map(|(index, (player, score))| {
                        format!("{}. {}: {} pts", index + 1, player.name, score)
                    }),
            );
        }
    }

    lines.push(String::new());
    lines.push("Joue aussi sur Mots en Tête !".to_string());
    lines.join("\n")
}

/// Writes the session as CSV sections: game settings, then per-round detail.
pub fn write_csv<W: io::Write>(
    session: &GameSession,
    generated_at: NaiveDateTime,
    writer: W,
) -> Result<()> {
    let config = session.config();
    let mut csv = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record([
        "Date",
        "Heure",
        "Mode",
        "Thème",
        "Temps par manche",
        "Nombre de manches",
    ])?;
    csv.write_record([
        generated_at.format("%Y-%m-%d").to_string(),
        generated_at.format("%H:%M").to_string(),
        config.mode.to_string(),
        config.theme.clone(),
        format!("{}s", config.time_limit),
        session.history().len().to_string(),
    ])?;

    match config.mode {
        GameMode::Solo | GameMode::Creative => {
            csv.write_record([
                "Manche",
                "Mot-clé",
                "Définition",
                "Mots trouvés",
                "Mots corrects",
                "Score",
                "Mots attendus",
            ])?;
            let player = solo_player(session).map(|p| p.id.as_str()).unwrap_or("");
            for round in session.history() {
                let submitted = round.player_answers().get(player).map_or(0, Vec::len);
                csv.write_record([
                    round.round().to_string(),
                    round.keyword().to_string(),
                    round.definition().to_string(),
                    submitted.to_string(),
                    round.common_words().len().to_string(),
                    round.score_of(player).to_string(),
                    round.expected_words().join(", "),
                ])?;
            }
        }
        GameMode::Multiplayer => {
            csv.write_record(["Joueur", "Score final"])?;
            for (player, score) in session.ranking() {
                csv.write_record([player.name.clone(), score.to_string()])?;
            }

            csv.write_record(["Manche", "Mot-clé", "Définition", "Mots communs"])?;
            for round in session.history() {
                csv.write_record([
                    round.round().to_string(),
                    round.keyword().to_string(),
                    round.definition().to_string(),
                    round.common_words().join(", "),
                ])?;
            }
        }
    }

    csv.flush().context("failed to flush CSV output")?;
    Ok(())
}

pub fn export_csv(session: &GameSession, generated_at: NaiveDateTime, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(session, generated_at, file)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "results exported");
    Ok(())
}
