//! Artist recommendations from implicit play counts
//!
//! Learns latent user and artist factors from `(user, artist, play count)`
//! triples with implicit-feedback ALS, ranks unseen artists per user and
//! scores models by how well their top-X recommendations overlap a held-out
//! split.
//!
//! ```no_run
//! use artist_rec::{
//!     interactions::{Interaction, Interactions},
//!     model_selection::{select_best, SelectionConfig},
//! };
//!
//! # fn main() -> artist_rec_core::Result<()> {
//! let data: Interactions = vec![Interaction::new(1, 10, 42)].into();
//! let splits = data.random_split(&[40.0, 40.0, 20.0], 13)?;
//! let outcome = select_best(&splits[0], &splits[1], &splits[2], &SelectionConfig::default())?;
//! println!("rank {} scores {}", outcome.chosen_rank, outcome.test_score);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod evaluation;
pub mod interactions;
pub mod loader;
pub mod matrix_factorization;
pub mod model_selection;
pub mod ranker;
pub mod stats;

/// Alias for user ids as they appear in the input
pub type UserId = u64;
/// Alias for item (artist) ids as they appear in the input
pub type ItemId = u64;

// Re-export key types
pub use catalog::{AliasTable, DisplayName, ItemCatalog};
pub use config::PipelineConfig;
pub use evaluation::{evaluate, evaluate_detailed, EvaluationReport, MissingUserPolicy};
pub use interactions::{Interaction, Interactions};
pub use matrix_factorization::{
    train, train_with_cancellation, ALSConfig, ConfidenceMatrix, FactorModel,
    RegularizationScaling,
};
pub use model_selection::{
    select_best, select_best_with_cancellation, SelectionConfig, SelectionOutcome,
    SelectionStrategy,
};
pub use ranker::{predict, recommend, recommend_with_names, top_n, ScoredItem};
pub use stats::{top_users_by_play_count, UserPlayStats};
