//! Matrix Factorization using Alternating Least Squares (ALS)
//!
//! Implements the implicit-feedback formulation of Hu, Koren and Volinsky.
//! Every observed `(user, item, count)` contributes a confidence
//! `c = 1 + confidence_weight * count` and a preference of 1; unobserved pairs
//! have preference 0 and confidence 1.
//!
//! Each round first solves every user row with item factors fixed, then every
//! item row with the fresh user factors fixed. Rows within a half-step are
//! independent and solved in parallel; the half-steps are separated by a
//! barrier. Per row the normal equations are
//!
//! ```text
//! (YᵀY + Yᵀ(Cᵘ - I)Y + λI) xᵤ = YᵀCᵘp(u)
//! ```
//!
//! where `YᵀY` is shared by all rows of the half-step, so only the observed
//! entries of a row touch the per-row system.

use crate::interactions::Interactions;
use crate::{ItemId, UserId};
use artist_rec_core::{CancellationToken, RecommenderError, Result};
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// How the regularization term scales per row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizationScaling {
    /// `λI` for every row
    #[default]
    Constant,
    /// `λ·nᵤI` where `nᵤ` is the number of observed entries in the row
    ByInteractionCount,
}

/// ALS configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ALSConfig {
    /// Number of latent factors
    pub rank: usize,
    /// Number of alternating rounds
    pub iterations: usize,
    /// Regularization parameter (lambda)
    pub regularization: f32,
    /// Confidence scaling for implicit feedback (alpha)
    pub confidence_weight: f32,
    /// Seed for factor initialization
    pub seed: u64,
    pub regularization_scaling: RegularizationScaling,
}

impl Default for ALSConfig {
    fn default() -> Self {
        Self {
            rank: 10,
            iterations: 5,
            regularization: 0.01,
            confidence_weight: 0.01,
            seed: 0,
            regularization_scaling: RegularizationScaling::Constant,
        }
    }
}

impl ALSConfig {
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.rank < 1 {
            return Err(RecommenderError::invalid_config(
                format!("rank must be at least 1, got {}", self.rank),
                "rank",
            ));
        }
        if self.iterations < 1 {
            return Err(RecommenderError::invalid_config(
                format!("iterations must be at least 1, got {}", self.iterations),
                "iterations",
            ));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(RecommenderError::invalid_config(
                format!(
                    "regularization must be finite and non-negative, got {}",
                    self.regularization
                ),
                "regularization",
            ));
        }
        if !self.confidence_weight.is_finite() || self.confidence_weight < 0.0 {
            return Err(RecommenderError::invalid_config(
                format!(
                    "confidence_weight must be finite and non-negative, got {}",
                    self.confidence_weight
                ),
                "confidence_weight",
            ));
        }
        Ok(())
    }
}

/// Compressed sparse rows: observed column indices and confidences per row
#[derive(Debug, Clone)]
struct CompressedRows {
    pointers: Vec<usize>,
    columns: Vec<usize>,
    confidences: Vec<f64>,
}

impl CompressedRows {
    /// Build from `(row, column, confidence)` entries sorted by row then column
    fn from_sorted(num_rows: usize, entries: &[(usize, usize, f64)]) -> Self {
        let mut pointers = vec![0; num_rows + 1];
        let mut columns = Vec::with_capacity(entries.len());
        let mut confidences = Vec::with_capacity(entries.len());

        for &(row, column, confidence) in entries {
            pointers[row + 1] += 1;
            columns.push(column);
            confidences.push(confidence);
        }

        for idx in 1..pointers.len() {
            pointers[idx] += pointers[idx - 1];
        }

        Self {
            pointers,
            columns,
            confidences,
        }
    }

    fn num_rows(&self) -> usize {
        self.pointers.len() - 1
    }

    fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let start = self.pointers[row];
        let stop = self.pointers[row + 1];
        (&self.columns[start..stop], &self.confidences[start..stop])
    }
}

/// Sparse user-item confidence matrix, indexed both ways
#[derive(Debug, Clone)]
pub struct ConfidenceMatrix {
    user_ids: Vec<UserId>,
    item_ids: Vec<ItemId>,
    by_user: CompressedRows,
    by_item: CompressedRows,
}

impl ConfidenceMatrix {
    /// Build from training interactions
    ///
    /// Ids are indexed in ascending order. Repeated `(user, item)` records are
    /// summed before the confidence is computed.
    pub fn build(interactions: &Interactions, confidence_weight: f32) -> Result<Self> {
        if interactions.is_empty() {
            return Err(RecommenderError::empty("training set"));
        }

        let mut counts: BTreeMap<(UserId, ItemId), u64> = BTreeMap::new();
        for interaction in interactions {
            *counts
                .entry((interaction.user_id, interaction.item_id))
                .or_insert(0) += interaction.count;
        }

        let user_ids = interactions.users();
        let item_ids = interactions.items();
        let user_index: HashMap<UserId, usize> =
            user_ids.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let item_index: HashMap<ItemId, usize> =
            item_ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let alpha = f64::from(confidence_weight);
        let mut entries: Vec<(usize, usize, f64)> = counts
            .into_iter()
            .map(|((user, item), count)| {
                (
                    user_index[&user],
                    item_index[&item],
                    1.0 + alpha * count as f64,
                )
            })
            .collect();

        // BTreeMap order is already (user, item) ascending
        let by_user = CompressedRows::from_sorted(user_ids.len(), &entries);

        entries.sort_unstable_by_key(|&(user, item, _)| (item, user));
        let transposed: Vec<(usize, usize, f64)> = entries
            .into_iter()
            .map(|(user, item, confidence)| (item, user, confidence))
            .collect();
        let by_item = CompressedRows::from_sorted(item_ids.len(), &transposed);

        Ok(Self {
            user_ids,
            item_ids,
            by_user,
            by_item,
        })
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of stored (aggregated) entries
    pub fn nnz(&self) -> usize {
        self.by_user.columns.len()
    }
}

/// Trained factor model: `U` (users × rank) and `P` (items × rank)
///
/// Immutable once trained; affinity of `(u, i)` is `U[u] · P[i]`.
#[derive(Debug, Clone)]
pub struct FactorModel {
    rank: usize,
    user_ids: Vec<UserId>,
    item_ids: Vec<ItemId>,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<ItemId, usize>,
    user_factors: Array2<f32>,
    item_factors: Array2<f32>,
}

impl FactorModel {
    /// Assemble a model from explicit factor matrices
    ///
    /// Row `k` of `user_factors` belongs to `user_ids[k]`, likewise for items.
    pub fn from_factors(
        user_ids: Vec<UserId>,
        item_ids: Vec<ItemId>,
        user_factors: Array2<f32>,
        item_factors: Array2<f32>,
    ) -> Result<Self> {
        let rank = user_factors.ncols();
        if rank < 1 || item_factors.ncols() != rank {
            return Err(RecommenderError::invalid(format!(
                "factor matrices must share a positive rank, got {} and {}",
                rank,
                item_factors.ncols()
            )));
        }
        if user_factors.nrows() != user_ids.len() || item_factors.nrows() != item_ids.len() {
            return Err(RecommenderError::invalid(
                "factor matrix rows must match the id lists",
            ));
        }

        let user_index = user_ids.iter().enumerate().map(|(i, &u)| (u, i)).collect();
        let item_index = item_ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        Ok(Self {
            rank,
            user_ids,
            item_ids,
            user_index,
            item_index,
            user_factors,
            item_factors,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Users known to the model, ascending
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// Items known to the model, ascending
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_index.contains_key(&user_id)
    }

    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.item_index.contains_key(&item_id)
    }

    pub fn user_factors(&self) -> &Array2<f32> {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &Array2<f32> {
        &self.item_factors
    }

    pub fn user_vector(&self, user_id: UserId) -> Option<ArrayView1<'_, f32>> {
        self.user_index
            .get(&user_id)
            .map(|&idx| self.user_factors.row(idx))
    }

    pub fn item_vector(&self, item_id: ItemId) -> Option<ArrayView1<'_, f32>> {
        self.item_index
            .get(&item_id)
            .map(|&idx| self.item_factors.row(idx))
    }

    /// Predicted affinity, `None` if either id was not seen in training
    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> Option<f32> {
        let user = self.user_vector(user_id)?;
        let item = self.item_vector(item_id)?;
        Some(user.dot(&item))
    }
}

/// Train an implicit-feedback ALS model
///
/// # Errors
///
/// - `EmptyDataset` if `training` is empty
/// - `InvalidConfiguration` if `rank < 1`, `iterations < 1` or a weight is negative
/// - `Numerical` if a normal-equation system is not positive definite
pub fn train(training: &Interactions, config: &ALSConfig) -> Result<FactorModel> {
    train_with_cancellation(training, config, &CancellationToken::new())
}

/// Train, polling `token` before every half-step
///
/// Returns `Cancelled` without a model if cancellation is observed.
pub fn train_with_cancellation(
    training: &Interactions,
    config: &ALSConfig,
    token: &CancellationToken,
) -> Result<FactorModel> {
    config.validate()?;
    let matrix = ConfidenceMatrix::build(training, config.confidence_weight)?;

    let span = tracing::info_span!("als_train", rank = config.rank, seed = config.seed);
    let _guard = span.enter();

    debug!(
        users = matrix.num_users(),
        items = matrix.num_items(),
        entries = matrix.nnz(),
        "Built confidence matrix"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut user_factors = random_factors(&mut rng, matrix.num_users(), config.rank);
    let mut item_factors = random_factors(&mut rng, matrix.num_items(), config.rank);

    for iteration in 0..config.iterations {
        if token.is_cancelled() {
            return Err(RecommenderError::Cancelled {
                completed_iterations: iteration,
            });
        }
        solve_half_step(&matrix.by_user, &item_factors, &mut user_factors, config)?;

        if token.is_cancelled() {
            return Err(RecommenderError::Cancelled {
                completed_iterations: iteration,
            });
        }
        solve_half_step(&matrix.by_item, &user_factors, &mut item_factors, config)?;

        if tracing::enabled!(tracing::Level::DEBUG) {
            let loss = compute_loss(&matrix, &user_factors, &item_factors, config);
            debug!(iteration, loss, "ALS iteration complete");
        }
    }

    info!(
        users = matrix.num_users(),
        items = matrix.num_items(),
        iterations = config.iterations,
        "ALS training complete"
    );

    FactorModel::from_factors(matrix.user_ids, matrix.item_ids, user_factors, item_factors)
}

/// Rows drawn uniformly from [-1, 1) and scaled to unit length
fn random_factors(rng: &mut StdRng, rows: usize, rank: usize) -> Array2<f32> {
    let mut factors = Array2::<f32>::zeros((rows, rank));
    for mut row in factors.rows_mut() {
        for value in row.iter_mut() {
            *value = rng.gen_range(-1.0..1.0);
        }
        let norm = row.dot(&row).sqrt();
        if norm > f32::EPSILON {
            row /= norm;
        } else {
            row.fill(1.0 / (rank as f32).sqrt());
        }
    }
    factors
}

/// `MᵀM` in double precision
fn gram_matrix(factors: &Array2<f32>) -> Array2<f64> {
    let wide = factors.mapv(f64::from);
    wide.t().dot(&wide)
}

/// Re-solve every row of `target` against the fixed factors
fn solve_half_step(
    rows: &CompressedRows,
    fixed: &Array2<f32>,
    target: &mut Array2<f32>,
    config: &ALSConfig,
) -> Result<()> {
    debug_assert_eq!(rows.num_rows(), target.nrows());
    let gram = gram_matrix(fixed);

    target
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_for_each(|(row, mut out)| {
            let (columns, confidences) = rows.row(row);
            let solution = solve_row(columns, confidences, fixed, &gram, config)?;
            out.assign(&solution);
            Ok(())
        })
}

/// Solve one row's regularized weighted least-squares system
fn solve_row(
    columns: &[usize],
    confidences: &[f64],
    fixed: &Array2<f32>,
    gram: &Array2<f64>,
    config: &ALSConfig,
) -> Result<Array1<f32>> {
    let k = config.rank;
    let mut a = gram.clone();
    let mut b = Array1::<f64>::zeros(k);

    for (&column, &confidence) in columns.iter().zip(confidences) {
        let y = fixed.row(column);

        // A += (c - 1) * y yᵀ
        let extra = confidence - 1.0;
        if extra != 0.0 {
            for i in 0..k {
                let yi = f64::from(y[i]) * extra;
                for j in 0..k {
                    a[[i, j]] += yi * f64::from(y[j]);
                }
            }
        }

        // b += c * p * y, with p = 1
        for i in 0..k {
            b[i] += confidence * f64::from(y[i]);
        }
    }

    let lambda = row_regularization(config, columns.len());
    for i in 0..k {
        a[[i, i]] += lambda;
    }

    let x = solve_cholesky(&a, &b)?;
    Ok(x.mapv(|v| v as f32))
}

/// Solve `A x = b` for symmetric positive definite `A` via Cholesky
fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();

    // A = L Lᵀ
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if !diag.is_finite() || diag <= 0.0 {
                    return Err(RecommenderError::numerical(
                        "normal equations are not positive definite; increase regularization",
                    ));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

/// Penalty weight for a row with `observed` interactions
fn row_regularization(config: &ALSConfig, observed: usize) -> f64 {
    match config.regularization_scaling {
        RegularizationScaling::Constant => f64::from(config.regularization),
        RegularizationScaling::ByInteractionCount => {
            f64::from(config.regularization) * observed as f64
        }
    }
}

/// Weighted squared error over all pairs plus the regularization penalty
///
/// The dense term `Σᵤ xᵤᵀ(YᵀY)xᵤ` covers every pair at confidence 1 and
/// preference 0; observed entries are then corrected to their real weight.
fn compute_loss(
    matrix: &ConfidenceMatrix,
    user_factors: &Array2<f32>,
    item_factors: &Array2<f32>,
    config: &ALSConfig,
) -> f64 {
    let gram = gram_matrix(item_factors);
    let users = user_factors.mapv(f64::from);

    let mut loss: f64 = users
        .rows()
        .into_iter()
        .map(|x| x.dot(&gram.dot(&x)))
        .sum();

    for u in 0..matrix.num_users() {
        let (columns, confidences) = matrix.by_user.row(u);
        for (&i, &c) in columns.iter().zip(confidences) {
            let s = f64::from(user_factors.row(u).dot(&item_factors.row(i)));
            loss += c * (1.0 - s).powi(2) - s * s;
        }
    }

    loss + penalty(&matrix.by_user, user_factors, config)
        + penalty(&matrix.by_item, item_factors, config)
}

fn penalty(rows: &CompressedRows, factors: &Array2<f32>, config: &ALSConfig) -> f64 {
    factors
        .rows()
        .into_iter()
        .enumerate()
        .map(|(r, x)| {
            let norm: f64 = x.iter().map(|&v| f64::from(v).powi(2)).sum();
            row_regularization(config, rows.row(r).0.len()) * norm
        })
        .sum()
}
