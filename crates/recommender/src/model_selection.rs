//! Rank selection by validation score
//!
//! Trains one model per candidate rank on the training split, scores each on
//! the validation split and reports the chosen model's score on the test split.

use crate::evaluation::{evaluate_detailed, MissingUserPolicy};
use crate::interactions::Interactions;
use crate::matrix_factorization::{train_with_cancellation, ALSConfig, FactorModel};
use crate::ItemId;
use artist_rec_core::{CancellationToken, RecommenderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// How the final rank is chosen after the validation sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Highest validation score, ties to the lower rank
    #[default]
    BestValidation,
    /// Always use this rank, whatever the sweep found
    FixedRank(usize),
}

impl FromStr for SelectionStrategy {
    type Err = RecommenderError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("best") {
            return Ok(SelectionStrategy::BestValidation);
        }
        if let Some(rank) = s.strip_prefix("fixed:") {
            let rank = rank.trim().parse::<usize>().map_err(|e| {
                RecommenderError::invalid_config(format!("invalid fixed rank '{}': {}", rank, e), "selection")
            })?;
            return Ok(SelectionStrategy::FixedRank(rank));
        }
        Err(RecommenderError::invalid_config(
            format!("unknown selection strategy '{}' (expected 'best' or 'fixed:<rank>')", s),
            "selection",
        ))
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionStrategy::BestValidation => f.write_str("best"),
            SelectionStrategy::FixedRank(rank) => write!(f, "fixed:{}", rank),
        }
    }
}

/// Inputs to a rank sweep besides the data
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Ranks to try, in order
    pub candidate_ranks: Vec<usize>,
    /// Template for every training run; its `rank` is overridden
    pub training: ALSConfig,
    pub strategy: SelectionStrategy,
    pub missing_users: MissingUserPolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            candidate_ranks: vec![2, 10, 20],
            training: ALSConfig::default(),
            strategy: SelectionStrategy::BestValidation,
            missing_users: MissingUserPolicy::Exclude,
        }
    }
}

/// Result of a rank sweep
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    /// Rank of `model`
    pub chosen_rank: usize,
    /// Rank with the highest validation score
    pub best_validation_rank: usize,
    pub model: FactorModel,
    pub validation_scores: BTreeMap<usize, f64>,
    pub test_score: f64,
}

/// Sweep ranks and report the chosen model's test score
///
/// The item universe for every evaluation is the set of items in the three
/// splits together.
pub fn select_best(
    training: &Interactions,
    validation: &Interactions,
    test: &Interactions,
    config: &SelectionConfig,
) -> Result<SelectionOutcome> {
    select_best_with_cancellation(training, validation, test, config, &CancellationToken::new())
}

pub fn select_best_with_cancellation(
    training: &Interactions,
    validation: &Interactions,
    test: &Interactions,
    config: &SelectionConfig,
    token: &CancellationToken,
) -> Result<SelectionOutcome> {
    if config.candidate_ranks.is_empty() {
        return Err(RecommenderError::invalid_config(
            "candidate_ranks must not be empty",
            "candidate_ranks",
        ));
    }

    let universe = item_universe([training, validation, test]);

    let mut validation_scores = BTreeMap::new();
    let mut trained: BTreeMap<usize, FactorModel> = BTreeMap::new();
    let mut best: Option<(usize, f64)> = None;

    for &rank in &config.candidate_ranks {
        let model = train_with_cancellation(
            training,
            &config.training.clone().with_rank(rank),
            token,
        )?;
        let report = evaluate_detailed(
            &model,
            validation,
            training,
            &universe,
            config.missing_users,
        )?;

        info!(rank, score = report.score, "Validation score");
        validation_scores.insert(rank, report.score);

        let improves = match best {
            None => true,
            Some((best_rank, best_score)) => {
                report.score > best_score || (report.score == best_score && rank < best_rank)
            }
        };
        if improves {
            best = Some((rank, report.score));
        }
        trained.insert(rank, model);
    }

    let (best_validation_rank, _) = best.ok_or_else(|| {
        RecommenderError::invalid_config("candidate_ranks must not be empty", "candidate_ranks")
    })?;

    let chosen_rank = match config.strategy {
        SelectionStrategy::BestValidation => best_validation_rank,
        SelectionStrategy::FixedRank(rank) => {
            if rank != best_validation_rank {
                warn!(
                    fixed_rank = rank,
                    best_validation_rank, "Fixed rank overrides the best validation rank"
                );
            }
            rank
        }
    };

    let model = match trained.remove(&chosen_rank) {
        Some(model) => model,
        None => train_with_cancellation(
            training,
            &config.training.clone().with_rank(chosen_rank),
            token,
        )?,
    };

    let test_score = evaluate_detailed(&model, test, training, &universe, config.missing_users)?.score;

    info!(chosen_rank, test_score, "Model selection complete");

    Ok(SelectionOutcome {
        chosen_rank,
        best_validation_rank,
        model,
        validation_scores,
        test_score,
    })
}

/// Distinct items across several interaction sets, ascending
pub fn item_universe<'a>(sets: impl IntoIterator<Item = &'a Interactions>) -> Vec<ItemId> {
    let mut items: Vec<ItemId> = sets
        .into_iter()
        .flat_map(|set| set.iter().map(|x| x.item_id))
        .collect();
    items.sort_unstable();
    items.dedup();
    items
}
