use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use sqlx::SqlitePool;
use std::{
    io::{self, Write},
    time::Duration,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

use mots_en_tete::{
    args::Args,
    bots::generate_bot_words,
    catalog::{Catalog, CustomPool, KeywordCard, KeywordPicker},
    db::{self, answers::save_answers, models::generate_room_code, rooms},
    logging::{default_log_dir, init_tracing},
    report::{export_csv, share_text},
    session::{GameMode, GameSession, Player, PlayerId, RevealPolicy, RoundResult},
};

const HUMAN_ID: &str = "host";

type InputLines = Lines<BufReader<Stdin>>;

/// Where round keywords come from.
enum KeywordSource<'a> {
    Catalog {
        catalog: &'a Catalog,
        picker: KeywordPicker,
    },
    Custom(CustomPool),
}

impl KeywordSource<'_> {
    fn next(&mut self, rng: &mut StdRng) -> Option<KeywordCard> {
        match self {
            KeywordSource::Catalog { catalog, picker } => picker.next(catalog, rng),
            KeywordSource::Custom(pool) => pool.next(rng),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(&default_log_dir()?)?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let loaded;
    let catalog: &Catalog = match &args.catalog {
        Some(path) => {
            loaded = Catalog::from_json_file(path)?;
            &loaded
        }
        None => Catalog::builtin(),
    };

    let mut config = args.game_config();
    let mut source = match config.mode {
        GameMode::Creative => {
            let path = args
                .custom
                .as_deref()
                .context("creative mode needs --custom FILE")?;
            let pool = CustomPool::from_json_file(path)?;
            if pool.is_empty() {
                bail!("no usable keyword in {}", path.display());
            }
            config = config.capped_to_pool(pool.len());
            KeywordSource::Custom(pool)
        }
        GameMode::Solo | GameMode::Multiplayer => {
            if !catalog.theme_names().any(|t| t == config.theme) {
                warn!(theme = %config.theme, "unknown theme, playing every keyword");
            }
            KeywordSource::Catalog {
                catalog,
                picker: KeywordPicker::new(config.theme.clone()),
            }
        }
    };

    let mut session = GameSession::new(generate_room_code(&mut rng), config);
    session.add_player(Player::host(HUMAN_ID, args.name.trim()));
    if session.config().mode == GameMode::Multiplayer {
        for i in 1..=args.bots {
            session.add_player(Player::new(format!("bot-{i}"), format!("Bot {i}")));
        }
    }
    info!(room = session.id(), mode = %session.config().mode, players = session.players().len(), "game created");

    let pool = if args.db {
        Some(open_room(&args, &session).await?)
    } else {
        None
    };

    print_intro(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while !session.is_finished() {
        let Some(card) = source.next(&mut rng) else {
            warn!("keyword source exhausted");
            break;
        };

        let number = session.begin_round(card.clone()).number;
        if let Some(pool) = &pool {
            rooms::start_round(pool, session.id(), number, &card).await?;
        }
        print_round_intro(&session, &card);

        let input_open = collect_words(&mut session, &mut lines).await?;
        if session.config().mode == GameMode::Multiplayer {
            play_bots(&mut session, &mut rng);
        }

        if session.finish_round().is_none() {
            bail!("round {} was not active", number);
        }
        let result = session
            .history()
            .last()
            .context("finished round missing from history")?;

        if let Some(pool) = &pool {
            persist_round(pool, &session, result).await?;
        }
        print_round_result(&session, result);

        if !input_open {
            info!(round = number, "input closed, ending game early");
            break;
        }
    }

    print_final(&session);

    let text = share_text(&session, Local::now().naive_local());
    println!("\n{text}");

    if let Some(path) = &args.csv {
        export_csv(&session, Local::now().naive_local(), path)?;
        println!("Résultats exportés : {}", path.display());
    }

    if let Some(pool) = &pool {
        rooms::finish_room(pool, session.id()).await?;
        println!("Partie enregistrée sous le code {}", session.id());
    }

    Ok(())
}

async fn open_room(args: &Args, session: &GameSession) -> Result<SqlitePool> {
    let path = match &args.db_path {
        Some(path) => path.clone(),
        None => db::default_db_path()?,
    };
    let pool = db::create_pool(&path).await?;

    let mut players = session.players().iter();
    let host = players.next().context("session has no host")?;
    rooms::create_room(&pool, session.id(), session.config(), host).await?;
    for player in players {
        rooms::add_player(&pool, session.id(), player).await?;
    }

    Ok(pool)
}

async fn persist_round(pool: &SqlitePool, session: &GameSession, result: &RoundResult) -> Result<()> {
    for player in session.players() {
        let words = result
            .player_answers()
            .get(&player.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        save_answers(pool, session.id(), player, result.round(), words).await?;
    }

    if !rooms::record_round(pool, session.id(), result).await? {
        warn!(round = result.round(), "round already recorded");
    }
    Ok(())
}

/// Reads the human's words until an empty line, the deadline, or end of input.
///
/// Returns false once stdin is closed.
async fn collect_words(session: &mut GameSession, lines: &mut InputLines) -> Result<bool> {
    let time_limit = session.config().time_limit;
    let deadline = (time_limit > 0)
        .then(|| tokio::time::Instant::now() + Duration::from_secs(time_limit));

    loop {
        print!("mot> ");
        io::stdout().flush()?;

        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, lines.next_line()).await {
                Ok(line) => line?,
                Err(_) => {
                    println!("\nTemps écoulé !");
                    return Ok(true);
                }
            },
            None => lines.next_line().await?,
        };

        let Some(line) = next else {
            println!();
            return Ok(false);
        };

        let input = line.trim();
        if input.is_empty() {
            return Ok(true);
        }

        if let Some(word) = input.strip_prefix('-') {
            if session.remove_word(HUMAN_ID, word.trim()) {
                println!("  retiré : {}", word.trim());
            } else {
                println!("  « {} » n'est pas dans ta liste", word.trim());
            }
            continue;
        }

        if session.submit_word(HUMAN_ID, input) {
            let count = session
                .active_round()
                .map(|round| round.submissions.words(HUMAN_ID).len())
                .unwrap_or(0);
            println!("  ✓ {input} ({count})");
        } else {
            println!("  déjà saisi");
        }
    }
}

/// Fills every simulated player's answer for the active round.
fn play_bots(session: &mut GameSession, rng: &mut StdRng) {
    let Some(round) = session.active_round_mut() else {
        return;
    };

    let human_words = round.submissions.words(HUMAN_ID).to_vec();
    let bots: Vec<PlayerId> = round
        .submissions
        .iter()
        .map(|(id, _)| id.to_string())
        .filter(|id| id != HUMAN_ID)
        .collect();

    for bot in bots {
        let words = generate_bot_words(&round.card.expected_words, &human_words, rng);
        round.submissions.set_words(&bot, &words);
    }
}

fn print_intro(session: &GameSession) {
    let config = session.config();
    println!("C'EST QUOI LA DÉFINITION ?");
    println!(
        "Mode {} | thème {} | {} manches | {}",
        config.mode,
        config.theme,
        config.number_of_rounds,
        match config.time_limit {
            0 => "sans limite".to_string(),
            secs => format!("{secs}s par manche"),
        }
    );
    println!("Un mot par ligne, « -mot » pour retirer, ligne vide pour valider.");
}

fn print_round_intro(session: &GameSession, card: &KeywordCard) {
    println!(
        "\n=== Manche {}/{} : {} ===",
        session.current_round(),
        session.config().number_of_rounds,
        card.keyword
    );
}

fn print_round_result(session: &GameSession, result: &RoundResult) {
    let mode = session.config().mode;

    if mode.scores_against_expected() {
        println!(
            "Mots trouvés : {}/{}",
            result.score_of(HUMAN_ID),
            result.expected_words().len()
        );
        if !result.common_words().is_empty() {
            println!("  {}", result.common_words().join(", "));
        }
    } else {
        if result.common_words().is_empty() {
            println!("Aucun mot en commun.");
        } else {
            println!("Mots en commun : {}", result.common_words().join(", "));
        }
        for player in session.players() {
            println!(
                "  {:<12} +{}  {}",
                player.name,
                result.score_of(&player.id),
                result
                    .player_answers()
                    .get(&player.id)
                    .map(|words| words.join(", "))
                    .unwrap_or_default()
            );
        }
    }

    if session.config().show_answers == RevealPolicy::AfterRound {
        print_reveal(result);
    }
}

fn print_reveal(result: &RoundResult) {
    if !result.definition().is_empty() {
        println!("Définition de {} : {}", result.keyword(), result.definition());
    }
    if !result.expected_words().is_empty() {
        println!("Mots attendus : {}", result.expected_words().join(", "));
    }
}

fn print_final(session: &GameSession) {
    println!("\n=== Classement ===");
    for (rank, (player, score)) in session.ranking().into_iter().enumerate() {
        println!("{}. {} : {} pts", rank + 1, player.name, score);
    }

    if session.config().show_answers == RevealPolicy::EndGame {
        println!("\n=== Réponses ===");
        for result in session.history() {
            println!("\nManche {}", result.round());
            print_reveal(result);
        }
    }
}
