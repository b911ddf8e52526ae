//! Interaction store
//!
//! Holds cleaned `(user, item, count)` triples and partitions them into
//! disjoint train/validation/test subsets with seeded per-record assignment.

use crate::catalog::AliasTable;
use crate::{ItemId, UserId};
use artist_rec_core::{RecommenderError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A single implicit-feedback observation (e.g. an artist play count)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub count: u64,
}

impl Interaction {
    pub fn new(user_id: UserId, item_id: ItemId, count: u64) -> Self {
        Self {
            user_id,
            item_id,
            count,
        }
    }
}

/// Unordered collection of interactions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interactions {
    interactions: Vec<Interaction>,
}

impl Interactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn data(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.interactions.iter()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Distinct user ids, ascending
    pub fn users(&self) -> Vec<UserId> {
        self.iter()
            .map(|x| x.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct item ids, ascending
    pub fn items(&self) -> Vec<ItemId> {
        self.iter()
            .map(|x| x.item_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct items per user
    pub fn items_by_user(&self) -> BTreeMap<UserId, BTreeSet<ItemId>> {
        let mut grouped: BTreeMap<UserId, BTreeSet<ItemId>> = BTreeMap::new();
        for interaction in self.iter() {
            grouped
                .entry(interaction.user_id)
                .or_default()
                .insert(interaction.item_id);
        }
        grouped
    }

    /// Distinct `(user, item)` pairs
    pub fn user_item_pairs(&self) -> HashSet<(UserId, ItemId)> {
        self.iter().map(|x| (x.user_id, x.item_id)).collect()
    }

    /// Rewrite every item id to its canonical id
    pub fn map_aliases(&self, aliases: &AliasTable) -> Interactions {
        self.iter()
            .map(|x| Interaction {
                item_id: aliases.resolve(x.item_id),
                ..*x
            })
            .collect()
    }

    /// Partition into `weights.len()` disjoint subsets
    ///
    /// Weights are normalized to sum to one. Each record is assigned
    /// independently by one uniform draw from a generator seeded with `seed`,
    /// so part sizes match the weights only in expectation. The same seed and
    /// input order always reproduce the same partition.
    pub fn random_split(&self, weights: &[f64], seed: u64) -> Result<Vec<Interactions>> {
        if weights.is_empty() {
            return Err(RecommenderError::invalid_config(
                "split weights must not be empty",
                "split_weights",
            ));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecommenderError::invalid_config(
                format!("split weights must be finite and non-negative: {:?}", weights),
                "split_weights",
            ));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(RecommenderError::invalid_config(
                "split weights must have a positive sum",
                "split_weights",
            ));
        }

        let (bounds, last) = split_bounds(weights, total);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut parts = vec![Interactions::new(); weights.len()];

        for interaction in self.iter() {
            let draw: f64 = rng.gen();
            let part = bounds
                .iter()
                .position(|&bound| draw < bound)
                .unwrap_or(last);
            parts[part].push(*interaction);
        }

        tracing::debug!(
            seed,
            sizes = ?parts.iter().map(Interactions::len).collect::<Vec<_>>(),
            "Split interactions"
        );

        Ok(parts)
    }
}

/// Cumulative upper bounds per part and the index of the last part with a
/// positive weight. That part's bound is pinned to 1.0 so rounding never
/// routes a draw into a trailing zero-weight part.
fn split_bounds(weights: &[f64], total: f64) -> (Vec<f64>, usize) {
    let mut bounds = Vec::with_capacity(weights.len());
    let mut acc = 0.0;
    for w in weights {
        acc += w / total;
        bounds.push(acc);
    }

    let last = weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1);
    for bound in &mut bounds[last..] {
        *bound = 1.0;
    }
    (bounds, last)
}

impl From<Vec<Interaction>> for Interactions {
    fn from(interactions: Vec<Interaction>) -> Self {
        Self { interactions }
    }
}

impl FromIterator<Interaction> for Interactions {
    fn from_iter<I: IntoIterator<Item = Interaction>>(iter: I) -> Self {
        Self {
            interactions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Interactions {
    type Item = &'a Interaction;
    type IntoIter = std::slice::Iter<'a, Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.interactions.iter()
    }
}
