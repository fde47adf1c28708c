use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::{
    models::{PlayerAnswer, deserialize_words, parse_timestamp, serialize_words, to_count},
    rooms::load_players,
};
use crate::session::{Player, RoundSubmissions};

/// Insert or replace a player's words for a round
pub async fn save_answers(
    pool: &SqlitePool,
    room_id: &str,
    player: &Player,
    round: usize,
    words: &[String],
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let round = round as i64;
    let words_json = serialize_words(words);

    sqlx::query(
        r#"
        INSERT INTO player_answers (room_id, player_id, player_name, round, words, submitted_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (room_id, player_id, round)
        DO UPDATE SET words = excluded.words, submitted_at = excluded.submitted_at
        "#,
    )
    .bind(room_id)
    .bind(&player.id)
    .bind(&player.name)
    .bind(round)
    .bind(&words_json)
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to save answers")?;

    debug!(room = room_id, player = %player.id, round, words = words.len(), "answers saved");
    Ok(())
}

/// All answers submitted for a round, oldest first
pub async fn load_answers(pool: &SqlitePool, room_id: &str, round: usize) -> Result<Vec<PlayerAnswer>> {
    let rows: Vec<(String, String, String, i64, String, String)> = sqlx::query_as(
        r#"
        SELECT room_id, player_id, player_name, round, words, submitted_at
        FROM player_answers
        WHERE room_id = ? AND round = ?
        ORDER BY submitted_at ASC, id ASC
        "#,
    )
    .bind(room_id)
    .bind(round as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(room_id, player_id, player_name, round, words, submitted_at)| PlayerAnswer {
                room_id,
                player_id,
                player_name,
                round: to_count(round),
                words: deserialize_words(&words),
                submitted_at: parse_timestamp(&submitted_at),
            },
        )
        .collect())
}

/// Build a round's submissions: every roster player in join order, with their saved words
pub async fn load_submissions(pool: &SqlitePool, room_id: &str, round: usize) -> Result<RoundSubmissions> {
    let mut submissions = RoundSubmissions::new();

    for member in load_players(pool, room_id).await? {
        submissions.register(&member.player.id);
    }

    for answer in load_answers(pool, room_id, round).await? {
        submissions.set_words(&answer.player_id, &answer.words);
    }

    Ok(submissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{rooms::create_room, test_support::temp_pool},
        session::GameConfig,
    };

    #[tokio::test]
    async fn test_save_answers_upserts() {
        let (_dir, pool) = temp_pool().await;
        let host = Player::host("p1", "Alice");
        create_room(&pool, "ROOM03", &GameConfig::default(), &host).await.unwrap();

        save_answers(&pool, "ROOM03", &host, 1, &["danger".to_string()]).await.unwrap();
        save_answers(&pool, "ROOM03", &host, 1, &["bruit".to_string(), "gaz".to_string()])
            .await
            .unwrap();
        save_answers(&pool, "ROOM03", &host, 2, &["chute".to_string()]).await.unwrap();

        let round_one = load_answers(&pool, "ROOM03", 1).await.unwrap();
        assert_eq!(round_one.len(), 1);
        assert_eq!(round_one[0].words, vec!["bruit", "gaz"]);
        assert_eq!(round_one[0].player_name, "Alice");
    }

    #[tokio::test]
    async fn test_load_submissions_includes_silent_players() {
        let (_dir, pool) = temp_pool().await;
        let host = Player::host("p1", "Alice");
        create_room(&pool, "ROOM04", &GameConfig::default(), &host).await.unwrap();
        crate::db::rooms::add_player(&pool, "ROOM04", &Player::new("p2", "Bob"))
            .await
            .unwrap();

        save_answers(&pool, "ROOM04", &host, 1, &["Danger".to_string(), "danger".to_string()])
            .await
            .unwrap();

        let submissions = load_submissions(&pool, "ROOM04", 1).await.unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions.words("p1"), &["Danger".to_string()]);
        assert!(submissions.words("p2").is_empty());
    }
}
