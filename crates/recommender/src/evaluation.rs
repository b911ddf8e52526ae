//! Top-X overlap evaluation
//!
//! For each held-out user with `X` distinct held-out items, the model ranks
//! every item of the universe the user did not already interact with in
//! training, and the score is the fraction of the top `X` that appear in the
//! held-out items. The overall score is the mean over users.

use crate::interactions::Interactions;
use crate::matrix_factorization::FactorModel;
use crate::ranker::top_n;
use crate::{ItemId, UserId};
use artist_rec_core::{RecommenderError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Treatment of held-out users the model produces no ranking for
///
/// A user gets no ranking when the model has no factors for them (they were
/// absent from training) or when none of their candidates has item factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingUserPolicy {
    /// Leave the user out of the mean
    #[default]
    Exclude,
    /// Count the user with a score of zero
    ScoreZero,
}

/// Detailed evaluation outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Mean per-user overlap, in `[0, 1]`
    pub score: f64,
    pub users_scored: usize,
    pub users_skipped: usize,
    pub per_user: BTreeMap<UserId, f64>,
}

/// Mean top-X overlap with users the model cannot rank excluded
pub fn evaluate(
    model: &FactorModel,
    held_out: &Interactions,
    training: &Interactions,
    item_universe: &[ItemId],
) -> Result<f64> {
    evaluate_detailed(
        model,
        held_out,
        training,
        item_universe,
        MissingUserPolicy::Exclude,
    )
    .map(|report| report.score)
}

/// Mean top-X overlap plus per-user detail
///
/// # Errors
///
/// `EmptyDataset` if `held_out` is empty, or if every held-out user was
/// excluded under [`MissingUserPolicy::Exclude`].
pub fn evaluate_detailed(
    model: &FactorModel,
    held_out: &Interactions,
    training: &Interactions,
    item_universe: &[ItemId],
    policy: MissingUserPolicy,
) -> Result<EvaluationReport> {
    if held_out.is_empty() {
        return Err(RecommenderError::empty("held-out set"));
    }

    let truth = held_out.items_by_user();
    let seen = training.items_by_user();
    let universe: BTreeSet<ItemId> = item_universe.iter().copied().collect();
    let no_items = BTreeSet::new();

    let users: Vec<(&UserId, &BTreeSet<ItemId>)> = truth.iter().collect();
    let outcomes: Vec<(UserId, Option<f64>)> = users
        .par_iter()
        .map(|&(&user, true_items)| {
            let seen_items = seen.get(&user).unwrap_or(&no_items);
            (user, score_user(model, user, true_items, seen_items, &universe))
        })
        .collect();

    let mut per_user = BTreeMap::new();
    let mut users_skipped = 0;
    for (user, outcome) in outcomes {
        match (outcome, policy) {
            (Some(score), _) => {
                per_user.insert(user, score);
            }
            (None, MissingUserPolicy::ScoreZero) => {
                per_user.insert(user, 0.0);
            }
            (None, MissingUserPolicy::Exclude) => {
                debug!(user, "No ranking for held-out user, excluding");
                users_skipped += 1;
            }
        }
    }

    if per_user.is_empty() {
        return Err(RecommenderError::empty(
            "held-out set has no user the model can rank",
        ));
    }

    let score = per_user.values().sum::<f64>() / per_user.len() as f64;

    info!(
        score,
        users_scored = per_user.len(),
        users_skipped,
        "Evaluation complete"
    );

    Ok(EvaluationReport {
        score,
        users_scored: per_user.len(),
        users_skipped,
        per_user,
    })
}

/// `|topX ∩ truth| / X`, or `None` when the model ranks nothing for the user
fn score_user(
    model: &FactorModel,
    user: UserId,
    true_items: &BTreeSet<ItemId>,
    seen_items: &BTreeSet<ItemId>,
    universe: &BTreeSet<ItemId>,
) -> Option<f64> {
    let x = true_items.len();
    if x == 0 {
        return None;
    }

    let candidates = universe.difference(seen_items).copied();
    let top = top_n(model, user, candidates, x);
    if top.is_empty() {
        return None;
    }

    let hits = top.iter().filter(|&item| true_items.contains(item)).count();
    Some(hits as f64 / x as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::Interaction;
    use ndarray::arr2;

    const A: ItemId = 1;
    const B: ItemId = 2;
    const C: ItemId = 3;
    const D: ItemId = 4;

    /// Users 1 and 2; user 1 prefers C over D, user 2 prefers D
    fn scenario_model() -> FactorModel {
        FactorModel::from_factors(
            vec![1, 2],
            vec![A, B, C, D],
            arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            arr2(&[[0.9, 0.1], [0.8, 0.2], [0.7, 0.0], [0.1, 0.9]]),
        )
        .unwrap()
    }

    fn training() -> Interactions {
        vec![
            Interaction::new(1, A, 10),
            Interaction::new(1, B, 1),
            Interaction::new(2, A, 5),
            Interaction::new(2, C, 3),
        ]
        .into()
    }

    #[test]
    fn test_seen_items_are_excluded_from_candidates() {
        let held_out: Interactions = vec![Interaction::new(1, C, 2)].into();
        let score = evaluate(&scenario_model(), &held_out, &training(), &[A, B, C, D]).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_zero_when_truth_not_in_universe() {
        let held_out: Interactions = vec![Interaction::new(1, C, 2)].into();
        let score = evaluate(&scenario_model(), &held_out, &training(), &[A, B, D]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_partial_overlap_is_averaged() {
        // User 1: candidates {C, D}, X = 2, both true -> 1.0
        // User 2: candidates {B, D}, X = 1, truth {B}, top1 = {D} -> 0.0
        let held_out: Interactions = vec![
            Interaction::new(1, C, 2),
            Interaction::new(1, D, 1),
            Interaction::new(2, B, 4),
        ]
        .into();

        let report = evaluate_detailed(
            &scenario_model(),
            &held_out,
            &training(),
            &[A, B, C, D],
            MissingUserPolicy::Exclude,
        )
        .unwrap();

        assert_eq!(report.per_user[&1], 1.0);
        assert_eq!(report.per_user[&2], 0.0);
        assert!((report.score - 0.5).abs() < 1e-12);
        assert_eq!(report.users_scored, 2);
    }

    #[test]
    fn test_unknown_user_policy() {
        let held_out: Interactions = vec![
            Interaction::new(1, C, 2),
            Interaction::new(99, D, 1),
        ]
        .into();

        let excluded = evaluate_detailed(
            &scenario_model(),
            &held_out,
            &training(),
            &[A, B, C, D],
            MissingUserPolicy::Exclude,
        )
        .unwrap();
        assert_eq!(excluded.users_skipped, 1);
        assert!((excluded.score - 1.0).abs() < 1e-12);

        let zeroed = evaluate_detailed(
            &scenario_model(),
            &held_out,
            &training(),
            &[A, B, C, D],
            MissingUserPolicy::ScoreZero,
        )
        .unwrap();
        assert_eq!(zeroed.users_skipped, 0);
        assert!((zeroed.score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_held_out_is_an_error() {
        let err = evaluate(&scenario_model(), &Interactions::new(), &training(), &[A]).unwrap_err();
        assert!(matches!(err, RecommenderError::EmptyDataset { .. }));
    }

    #[test]
    fn test_all_users_excluded_is_an_error() {
        let held_out: Interactions = vec![Interaction::new(99, D, 1)].into();
        assert!(evaluate(&scenario_model(), &held_out, &training(), &[A, B, C, D]).is_err());
    }

    #[test]
    fn test_duplicate_held_out_records_count_once() {
        let held_out: Interactions = vec![
            Interaction::new(1, C, 2),
            Interaction::new(1, C, 5),
        ]
        .into();
        let score = evaluate(&scenario_model(), &held_out, &training(), &[A, B, C, D, D]).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }
}
