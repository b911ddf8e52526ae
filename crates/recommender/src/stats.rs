//! Summary statistics over raw play counts

use crate::interactions::Interactions;
use crate::UserId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Aggregate listening activity for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPlayStats {
    pub user_id: UserId,
    pub total_plays: u64,
    pub distinct_items: usize,
    /// `total_plays / distinct_items`
    pub mean_plays: f64,
}

/// The `n` users with the highest total play count
///
/// Ties on the total are broken by ascending user id. Repeated `(user, item)`
/// records add to the total but count once towards `distinct_items`.
pub fn top_users_by_play_count(interactions: &Interactions, n: usize) -> Vec<UserPlayStats> {
    let mut per_user: HashMap<UserId, (u64, BTreeSet<u64>)> = HashMap::new();
    for interaction in interactions {
        let entry = per_user.entry(interaction.user_id).or_default();
        entry.0 += interaction.count;
        entry.1.insert(interaction.item_id);
    }

    let mut stats: Vec<UserPlayStats> = per_user
        .into_iter()
        .map(|(user_id, (total_plays, items))| UserPlayStats {
            user_id,
            total_plays,
            distinct_items: items.len(),
            mean_plays: total_plays as f64 / items.len() as f64,
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_plays
            .cmp(&a.total_plays)
            .then(a.user_id.cmp(&b.user_id))
    });
    stats.truncate(n);
    stats
}
