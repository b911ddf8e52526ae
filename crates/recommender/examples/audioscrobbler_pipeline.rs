//! End-to-end run over the Audioscrobbler sample files
//!
//! Loads the artist catalog, alias table and play counts, prints the heaviest
//! listeners, sweeps factor ranks on a 40/40/20 split and prints the sample
//! user's top artists. Configuration comes from the environment (see
//! `artist_rec::config`). Ctrl-C cancels training.
//!
//! Run with:
//! ```bash
//! ARTIST_REC_USER_ARTIST_DATA=user_artist_data_small.txt \
//!     cargo run -p artist-rec --example audioscrobbler_pipeline
//! ```

use anyhow::{Context, Result};
use artist_rec::loader::{open, read_alias_table, read_interactions, read_item_catalog};
use artist_rec::{
    recommend_with_names, select_best_with_cancellation, top_users_by_play_count, PipelineConfig,
};
use artist_rec_core::{
    cancel_on_ctrl_c, init_logging, load_dotenv, CancellationToken, ConfigLoader, LogConfig,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    init_logging(&LogConfig::from_env()?)?;

    let config = PipelineConfig::from_env()?;
    config.validate()?;

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(token.clone()));

    tokio::task::spawn_blocking(move || run(config, token))
        .await
        .context("Pipeline task panicked")?
}

fn run(config: PipelineConfig, token: CancellationToken) -> Result<()> {
    let (catalog, _) = read_item_catalog(open(&config.artist_data)?, "artist_data")
        .context("Failed to load artist data")?;
    let (aliases, _) = read_alias_table(open(&config.artist_alias)?, "artist_alias")
        .context("Failed to load artist aliases")?;
    let (raw, _) = read_interactions(open(&config.user_artist_data)?, "user_artist_data")
        .context("Failed to load play counts")?;

    let interactions = raw.map_aliases(&aliases);
    info!(
        interactions = interactions.len(),
        users = interactions.users().len(),
        artists = interactions.items().len(),
        "Loaded play counts"
    );

    for stats in top_users_by_play_count(&interactions, 3) {
        println!(
            "User {} has a total play count of {} and a mean play count of {:.0}",
            stats.user_id, stats.total_plays, stats.mean_plays
        );
    }

    let splits = interactions.random_split(&config.split_weights, config.split_seed)?;
    let [train, validation, test] = splits.as_slice() else {
        anyhow::bail!("expected three splits, got {}", splits.len());
    };
    info!(
        train = train.len(),
        validation = validation.len(),
        test = test.len(),
        "Split play counts"
    );

    let outcome = select_best_with_cancellation(train, validation, test, &config.selection, &token)?;

    for (rank, score) in &outcome.validation_scores {
        println!("The model score for rank {} is {}", rank, score);
    }
    println!(
        "Chosen rank {} (best on validation: {}), test score {}",
        outcome.chosen_rank, outcome.best_validation_rank, outcome.test_score
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "chosen_rank": outcome.chosen_rank,
            "best_validation_rank": outcome.best_validation_rank,
            "validation_scores": outcome.validation_scores,
            "test_score": outcome.test_score,
        }))?
    );

    let recommendations = recommend_with_names(
        &outcome.model,
        &catalog,
        config.sample_user,
        config.sample_count,
    );
    if recommendations.is_empty() {
        println!("User {} has no recommendations", config.sample_user);
    }
    for (idx, (_, name)) in recommendations.iter().enumerate() {
        println!("Artist {}: {}", idx, name);
    }

    Ok(())
}
