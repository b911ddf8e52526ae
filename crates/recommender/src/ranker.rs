//! Scoring and top-N ranking over a trained factor model

use crate::catalog::{DisplayName, ItemCatalog};
use crate::matrix_factorization::FactorModel;
use crate::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Predicted affinity for one `(user, item)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub user: UserId,
    pub item: ItemId,
    pub score: f32,
}

/// Score every pair; pairs with a user or item unknown to the model are dropped
pub fn predict(model: &FactorModel, pairs: &[(UserId, ItemId)]) -> Vec<ScoredItem> {
    pairs
        .iter()
        .filter_map(|&(user, item)| {
            model
                .predict(user, item)
                .map(|score| ScoredItem { user, item, score })
        })
        .collect()
}

/// Highest score first, ties by ascending item id; non-finite scores rank last
fn by_score_desc(a: &(ItemId, f32), b: &(ItemId, f32)) -> Ordering {
    sortable(b.1)
        .total_cmp(&sortable(a.1))
        .then_with(|| a.0.cmp(&b.0))
}

fn sortable(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// The `n` best candidates for `user`, best first
///
/// Candidates the model has no factors for are skipped, as are all
/// candidates when the user is unknown. Equal scores are ordered by
/// ascending item id so the result is fully deterministic.
pub fn top_n(
    model: &FactorModel,
    user: UserId,
    candidates: impl IntoIterator<Item = ItemId>,
    n: usize,
) -> Vec<ItemId> {
    scored_top_n(model, user, candidates, n)
        .into_iter()
        .map(|(item, _)| item)
        .collect()
}

/// Like [`top_n`] but keeps the scores
pub fn scored_top_n(
    model: &FactorModel,
    user: UserId,
    candidates: impl IntoIterator<Item = ItemId>,
    n: usize,
) -> Vec<(ItemId, f32)> {
    let Some(user_vector) = model.user_vector(user) else {
        return Vec::new();
    };
    if n == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(ItemId, f32)> = candidates
        .into_iter()
        .filter_map(|item| {
            model
                .item_vector(item)
                .map(|item_vector| (item, user_vector.dot(&item_vector)))
        })
        .collect();

    if scored.len() > n {
        scored.select_nth_unstable_by(n - 1, by_score_desc);
        scored.truncate(n);
    }
    scored.sort_unstable_by(by_score_desc);
    scored
}

/// Top `n` over every item in the model, seen items included
pub fn recommend(model: &FactorModel, user: UserId, n: usize) -> Vec<ItemId> {
    top_n(model, user, model.item_ids().iter().copied(), n)
}

/// [`recommend`] with catalog names attached
pub fn recommend_with_names(
    model: &FactorModel,
    catalog: &ItemCatalog,
    user: UserId,
    n: usize,
) -> Vec<(ItemId, DisplayName)> {
    recommend(model, user, n)
        .into_iter()
        .map(|item| (item, catalog.display_name(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    /// One user with factor [1, 0]; item scores equal their first factor
    fn fixed_model(item_scores: &[(ItemId, f32)]) -> FactorModel {
        let item_ids: Vec<ItemId> = item_scores.iter().map(|(id, _)| *id).collect();
        let mut items = ndarray::Array2::<f32>::zeros((item_scores.len(), 2));
        for (row, (_, score)) in item_scores.iter().enumerate() {
            items[[row, 0]] = *score;
        }
        FactorModel::from_factors(vec![1], item_ids, arr2(&[[1.0, 0.0]]), items).unwrap()
    }

    #[test]
    fn test_top_n_orders_by_score() {
        let model = fixed_model(&[(10, 0.2), (11, 0.9), (12, 0.5)]);
        assert_eq!(top_n(&model, 1, vec![10, 11, 12], 2), vec![11, 12]);
        assert_eq!(top_n(&model, 1, vec![10, 11, 12], 10), vec![11, 12, 10]);
    }

    #[test]
    fn test_top_n_breaks_ties_by_item_id() {
        let model = fixed_model(&[(30, 0.5), (10, 0.5), (20, 0.5), (40, 0.1)]);
        assert_eq!(top_n(&model, 1, vec![40, 30, 20, 10], 3), vec![10, 20, 30]);
    }

    #[test]
    fn test_top_n_skips_unknowns() {
        let model = fixed_model(&[(10, 0.2)]);
        assert_eq!(top_n(&model, 1, vec![99, 10], 2), vec![10]);
        assert!(top_n(&model, 2, vec![10], 2).is_empty());
        assert!(top_n(&model, 1, vec![10], 0).is_empty());
    }

    #[test]
    fn test_nan_scores_rank_last() {
        let model = fixed_model(&[(10, f32::NAN), (11, -5.0)]);
        assert_eq!(top_n(&model, 1, vec![10, 11], 2), vec![11, 10]);
    }

    #[test]
    fn test_predict_drops_unknown_pairs() {
        let model = fixed_model(&[(10, 0.25)]);
        let scored = predict(&model, &[(1, 10), (1, 11), (2, 10)]);
        assert_eq!(
            scored,
            vec![ScoredItem {
                user: 1,
                item: 10,
                score: 0.25
            }]
        );
    }

    #[test]
    fn test_recommend_with_names() {
        let model = fixed_model(&[(10, 0.1), (11, 0.7)]);
        let catalog: ItemCatalog = vec![(11, "Portishead".to_string())].into_iter().collect();

        let named = recommend_with_names(&model, &catalog, 1, 2);
        assert_eq!(
            named,
            vec![
                (11, DisplayName::Known("Portishead".to_string())),
                (10, DisplayName::Unknown(10)),
            ]
        );
    }
}
