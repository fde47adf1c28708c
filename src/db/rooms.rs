use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{
    GameRoom, RoomPlayer, deserialize_words, parse_timestamp, serialize_words, to_count,
};
use crate::{
    catalog::KeywordCard,
    session::{GameConfig, Player, RoundResult},
};

/// Create a new room with its host as the first player
pub async fn create_room(
    pool: &SqlitePool,
    room_id: &str,
    config: &GameConfig,
    host: &Player,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let config_json = serde_json::to_string(config).context("Failed to serialize room config")?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO game_rooms (id, config, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(room_id)
    .bind(&config_json)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("Failed to create room {}", room_id))?;

    insert_player(&mut tx, room_id, host, &now).await?;

    tx.commit().await?;
    info!(room = room_id, host = %host.id, "room created");
    Ok(())
}

async fn insert_player(
    conn: &mut sqlx::SqliteConnection,
    room_id: &str,
    player: &Player,
    joined_at: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO room_players (room_id, player_id, name, is_host, joined_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(room_id)
    .bind(&player.id)
    .bind(&player.name)
    .bind(player.is_host)
    .bind(joined_at)
    .execute(conn)
    .await
    .context("Failed to add player")?;

    Ok(result.rows_affected() > 0)
}

/// Add a player to a room. Returns false if the player is already in or the room is full.
pub async fn add_player(pool: &SqlitePool, room_id: &str, player: &Player) -> Result<bool> {
    let room = load_room(pool, room_id).await?;

    if let Some(max) = room.config.max_players {
        if room.players.len() >= max {
            warn!(room = room_id, max, "room is full");
            return Ok(false);
        }
    }

    let now = Utc::now().to_rfc3339();
    let mut conn = pool.acquire().await?;
    let added = insert_player(&mut conn, room_id, player, &now).await?;
    if added {
        touch(pool, room_id).await?;
    }
    Ok(added)
}

/// Load a room and its roster
pub async fn load_room(pool: &SqlitePool, room_id: &str) -> Result<GameRoom> {
    let row: Option<(String, String, i64, String, String, String, bool, String, String)> =
        sqlx::query_as(
            r#"
            SELECT id, config, current_round, current_keyword, current_definition,
                   expected_words, game_finished, created_at, updated_at
            FROM game_rooms
            WHERE id = ?
            "#,
        )
        .bind(room_id)
        .fetch_optional(pool)
        .await?;

    let (
        id,
        config_json,
        current_round,
        keyword,
        definition,
        expected_json,
        game_finished,
        created_at,
        updated_at,
    ) = row.ok_or_else(|| anyhow!("Room {} not found", room_id))?;

    let config: GameConfig = serde_json::from_str(&config_json)
        .with_context(|| format!("Corrupt config for room {}", room_id))?;

    let current_keyword = (!keyword.is_empty()).then(|| KeywordCard {
        keyword,
        definition,
        expected_words: deserialize_words(&expected_json),
    });

    Ok(GameRoom {
        id,
        config,
        players: load_players(pool, room_id).await?,
        current_round: to_count(current_round),
        current_keyword,
        game_finished,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Roster in join order
pub async fn load_players(pool: &SqlitePool, room_id: &str) -> Result<Vec<RoomPlayer>> {
    let rows: Vec<(String, String, bool, i64)> = sqlx::query_as(
        r#"
        SELECT player_id, name, is_host, score
        FROM room_players
        WHERE room_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, is_host, score)| RoomPlayer {
            player: Player { id, name, is_host },
            score: to_count(score),
        })
        .collect())
}

/// Point the room at a new round and its keyword
pub async fn start_round(
    pool: &SqlitePool,
    room_id: &str,
    round: usize,
    card: &KeywordCard,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let round = round as i64;
    let expected_json = serialize_words(&card.expected_words);

    let result = sqlx::query(
        r#"
        UPDATE game_rooms
        SET current_round = ?, current_keyword = ?, current_definition = ?,
            expected_words = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(round)
    .bind(&card.keyword)
    .bind(&card.definition)
    .bind(&expected_json)
    .bind(&now)
    .bind(room_id)
    .execute(pool)
    .await
    .context("Failed to start round")?;

    if result.rows_affected() == 0 {
        return Err(anyhow!("Room {} not found", room_id));
    }

    info!(room = room_id, round, keyword = %card.keyword, "room round started");
    Ok(())
}

/// Store a scored round and add its scores to the roster totals.
///
/// Returns false without touching totals if the round was already recorded.
pub async fn record_round(pool: &SqlitePool, room_id: &str, result: &RoundResult) -> Result<bool> {
    let round = result.round() as i64;
    let result_json = serde_json::to_string(result).context("Failed to serialize round result")?;

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO round_results (room_id, round, result)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(room_id)
    .bind(round)
    .bind(&result_json)
    .execute(&mut *tx)
    .await
    .context("Failed to record round result")?;

    if inserted.rows_affected() == 0 {
        warn!(room = room_id, round, "round already recorded");
        return Ok(false);
    }

    for (player_id, score) in result.scores() {
        sqlx::query(
            r#"
            UPDATE room_players
            SET score = score + ?
            WHERE room_id = ? AND player_id = ?
            "#,
        )
        .bind(*score as i64)
        .bind(room_id)
        .bind(player_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update player score")?;
    }

    tx.commit().await?;
    touch(pool, room_id).await?;
    Ok(true)
}

/// All recorded rounds of a room, in round order
pub async fn load_round_results(pool: &SqlitePool, room_id: &str) -> Result<Vec<RoundResult>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT result
        FROM round_results
        WHERE room_id = ?
        ORDER BY round ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|(json,)| serde_json::from_str(json).context("Corrupt round result"))
        .collect()
}

/// Mark the game as over
pub async fn finish_room(pool: &SqlitePool, room_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE game_rooms
        SET game_finished = 1, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&now)
    .bind(room_id)
    .execute(pool)
    .await
    .context("Failed to finish room")?;

    Ok(())
}

async fn touch(pool: &SqlitePool, room_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE game_rooms SET updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(room_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            answers::{load_submissions, save_answers},
            test_support::temp_pool,
        },
        session::GameMode,
    };

    fn multiplayer_config(max_players: Option<usize>) -> GameConfig {
        GameConfig {
            mode: GameMode::Multiplayer,
            max_players,
            ..GameConfig::default()
        }
    }

    fn card() -> KeywordCard {
        KeywordCard {
            keyword: "Danger".to_string(),
            definition: "Source potentielle de dommage.".to_string(),
            expected_words: vec!["dommage".to_string(), "nocif".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_load_room() {
        let (_dir, pool) = temp_pool().await;
        create_room(&pool, "ABC123", &multiplayer_config(None), &Player::host("h", "Hôte"))
            .await
            .unwrap();

        let room = load_room(&pool, "ABC123").await.unwrap();
        assert_eq!(room.config.mode, GameMode::Multiplayer);
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].player.is_host);
        assert!(room.current_keyword.is_none());
        assert!(!room.game_finished);
    }

    #[tokio::test]
    async fn test_missing_room() {
        let (_dir, pool) = temp_pool().await;
        let err = load_room(&pool, "NOPE00").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(start_round(&pool, "NOPE00", 1, &card()).await.is_err());
    }

    #[tokio::test]
    async fn test_add_player_respects_capacity() {
        let (_dir, pool) = temp_pool().await;
        create_room(&pool, "ROOM01", &multiplayer_config(Some(2)), &Player::host("h", "Hôte"))
            .await
            .unwrap();

        assert!(add_player(&pool, "ROOM01", &Player::new("p2", "Bob")).await.unwrap());
        assert!(!add_player(&pool, "ROOM01", &Player::new("p2", "Bob")).await.unwrap());
        assert!(!add_player(&pool, "ROOM01", &Player::new("p3", "Chloé")).await.unwrap());

        let players = load_players(&pool, "ROOM01").await.unwrap();
        let ids: Vec<&str> = players.iter().map(|p| p.player.id.as_str()).collect();
        assert_eq!(ids, vec!["h", "p2"]);
    }

    #[tokio::test]
    async fn test_round_lifecycle() {
        let (_dir, pool) = temp_pool().await;
        create_room(&pool, "ROOM02", &multiplayer_config(None), &Player::host("p1", "Alice"))
            .await
            .unwrap();
        add_player(&pool, "ROOM02", &Player::new("p2", "Bob")).await.unwrap();
        add_player(&pool, "ROOM02", &Player::new("p3", "Chloé")).await.unwrap();

        start_round(&pool, "ROOM02", 1, &card()).await.unwrap();
        let room = load_room(&pool, "ROOM02").await.unwrap();
        assert_eq!(room.current_round, 1);
        assert_eq!(room.current_keyword, Some(card()));

        let words = |w: &[&str]| w.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        save_answers(&pool, "ROOM02", &Player::new("p1", "Alice"), 1, &words(&["danger", "fatigue"]))
            .await
            .unwrap();
        save_answers(&pool, "ROOM02", &Player::new("p2", "Bob"), 1, &words(&["danger", "stress"]))
            .await
            .unwrap();
        save_answers(&pool, "ROOM02", &Player::new("p3", "Chloé"), 1, &words(&["bruit"]))
            .await
            .unwrap();

        let mut submissions = load_submissions(&pool, "ROOM02", 1).await.unwrap();
        submissions.close();
        let result = RoundResult::score(GameMode::Multiplayer, 1, &card(), &submissions, Utc::now());
        assert_eq!(result.common_words(), &["danger"]);

        assert!(record_round(&pool, "ROOM02", &result).await.unwrap());
        assert!(!record_round(&pool, "ROOM02", &result).await.unwrap());

        let players = load_players(&pool, "ROOM02").await.unwrap();
        let scores: Vec<usize> = players.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![1, 1, 0]);

        let history = load_round_results(&pool, "ROOM02").await.unwrap();
        assert_eq!(history, vec![result]);

        finish_room(&pool, "ROOM02").await.unwrap();
        assert!(load_room(&pool, "ROOM02").await.unwrap().game_finished);
    }
}
