//! Pipeline configuration
//!
//! # Environment Variables
//!
//! - `ARTIST_REC_ARTIST_DATA` (default: `artist_data_small.txt`)
//! - `ARTIST_REC_ARTIST_ALIAS` (default: `artist_alias_small.txt`)
//! - `ARTIST_REC_USER_ARTIST_DATA` (default: `user_artist_data_small.txt`)
//! - `ARTIST_REC_SPLIT_WEIGHTS` (default: `40,40,20`)
//! - `ARTIST_REC_SPLIT_SEED` (default: 13)
//! - `ARTIST_REC_CANDIDATE_RANKS` (default: `2,10,20`)
//! - `ARTIST_REC_TRAIN_SEED` (default: 345)
//! - `ARTIST_REC_ITERATIONS` (default: 5)
//! - `ARTIST_REC_REGULARIZATION` (default: 0.01)
//! - `ARTIST_REC_CONFIDENCE_WEIGHT` (default: 0.01)
//! - `ARTIST_REC_REGULARIZATION_SCALING` (`constant` or `by_count`, default: `constant`)
//! - `ARTIST_REC_SELECTION` (`best` or `fixed:<rank>`, default: `best`)
//! - `ARTIST_REC_MISSING_USERS` (`exclude` or `zero`, default: `exclude`)
//! - `ARTIST_REC_THREADS` (optional worker thread count)
//! - `ARTIST_REC_SAMPLE_USER` (default: 1059637)
//! - `ARTIST_REC_SAMPLE_COUNT` (default: 5)

use crate::evaluation::MissingUserPolicy;
use crate::matrix_factorization::{ALSConfig, RegularizationScaling};
use crate::model_selection::{SelectionConfig, SelectionStrategy};
use crate::UserId;
use artist_rec_core::config::{parse_env_list, parse_env_opt, parse_env_var, ConfigLoader};
use artist_rec_core::RecommenderError;
use std::path::PathBuf;

/// End-to-end pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub artist_data: PathBuf,
    pub artist_alias: PathBuf,
    pub user_artist_data: PathBuf,
    pub split_weights: Vec<f64>,
    pub split_seed: u64,
    pub selection: SelectionConfig,
    /// Worker threads for training and evaluation; `None` uses every core
    pub threads: Option<usize>,
    pub sample_user: UserId,
    pub sample_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artist_data: PathBuf::from("artist_data_small.txt"),
            artist_alias: PathBuf::from("artist_alias_small.txt"),
            user_artist_data: PathBuf::from("user_artist_data_small.txt"),
            split_weights: vec![40.0, 40.0, 20.0],
            split_seed: 13,
            selection: SelectionConfig {
                candidate_ranks: vec![2, 10, 20],
                training: ALSConfig::default().with_seed(345),
                strategy: SelectionStrategy::BestValidation,
                missing_users: MissingUserPolicy::Exclude,
            },
            threads: None,
            sample_user: 1059637,
            sample_count: 5,
        }
    }
}

impl ConfigLoader for PipelineConfig {
    fn from_env() -> Result<Self, RecommenderError> {
        let defaults = PipelineConfig::default();

        let path = |key: &str, default: &PathBuf| {
            std::env::var(key)
                .map(PathBuf::from)
                .unwrap_or_else(|_| default.clone())
        };

        let training = ALSConfig {
            rank: defaults.selection.training.rank,
            iterations: parse_env_var("ARTIST_REC_ITERATIONS", defaults.selection.training.iterations)?,
            regularization: parse_env_var(
                "ARTIST_REC_REGULARIZATION",
                defaults.selection.training.regularization,
            )?,
            confidence_weight: parse_env_var(
                "ARTIST_REC_CONFIDENCE_WEIGHT",
                defaults.selection.training.confidence_weight,
            )?,
            seed: parse_env_var("ARTIST_REC_TRAIN_SEED", defaults.selection.training.seed)?,
            regularization_scaling: parse_scaling()?,
        };

        let strategy = match std::env::var("ARTIST_REC_SELECTION") {
            Ok(raw) => raw.parse::<SelectionStrategy>().map_err(|e| {
                RecommenderError::invalid_config(e.to_string(), "ARTIST_REC_SELECTION")
            })?,
            Err(_) => defaults.selection.strategy,
        };

        Ok(Self {
            artist_data: path("ARTIST_REC_ARTIST_DATA", &defaults.artist_data),
            artist_alias: path("ARTIST_REC_ARTIST_ALIAS", &defaults.artist_alias),
            user_artist_data: path("ARTIST_REC_USER_ARTIST_DATA", &defaults.user_artist_data),
            split_weights: parse_env_list("ARTIST_REC_SPLIT_WEIGHTS", defaults.split_weights)?,
            split_seed: parse_env_var("ARTIST_REC_SPLIT_SEED", defaults.split_seed)?,
            selection: SelectionConfig {
                candidate_ranks: parse_env_list(
                    "ARTIST_REC_CANDIDATE_RANKS",
                    defaults.selection.candidate_ranks,
                )?,
                training,
                strategy,
                missing_users: parse_missing_users()?,
            },
            threads: parse_env_opt("ARTIST_REC_THREADS")?,
            sample_user: parse_env_var("ARTIST_REC_SAMPLE_USER", defaults.sample_user)?,
            sample_count: parse_env_var("ARTIST_REC_SAMPLE_COUNT", defaults.sample_count)?,
        })
    }

    fn validate(&self) -> Result<(), RecommenderError> {
        if self.split_weights.len() != 3 {
            return Err(RecommenderError::invalid_config(
                format!(
                    "split_weights needs train, validation and test weights, got {}",
                    self.split_weights.len()
                ),
                "ARTIST_REC_SPLIT_WEIGHTS",
            ));
        }
        if self.split_weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(RecommenderError::invalid_config(
                "split_weights must all be positive",
                "ARTIST_REC_SPLIT_WEIGHTS",
            ));
        }

        if self.selection.candidate_ranks.is_empty() {
            return Err(RecommenderError::invalid_config(
                "at least one candidate rank is required",
                "ARTIST_REC_CANDIDATE_RANKS",
            ));
        }
        if let Some(&rank) = self.selection.candidate_ranks.iter().find(|&&r| r < 1) {
            return Err(RecommenderError::invalid_config(
                format!("candidate ranks must be at least 1, got {}", rank),
                "ARTIST_REC_CANDIDATE_RANKS",
            ));
        }
        if let SelectionStrategy::FixedRank(rank) = self.selection.strategy {
            if rank < 1 {
                return Err(RecommenderError::invalid_config(
                    "fixed rank must be at least 1",
                    "ARTIST_REC_SELECTION",
                ));
            }
        }

        // Rank is overridden per run; validate everything else with a placeholder
        self.selection.training.clone().with_rank(1).validate()?;

        if self.threads == Some(0) {
            return Err(RecommenderError::invalid_config(
                "threads must be greater than 0",
                "ARTIST_REC_THREADS",
            ));
        }

        Ok(())
    }
}

fn parse_scaling() -> Result<RegularizationScaling, RecommenderError> {
    const KEY: &str = "ARTIST_REC_REGULARIZATION_SCALING";
    match std::env::var(KEY) {
        Err(_) => Ok(RegularizationScaling::Constant),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(RegularizationScaling::Constant),
            "by_count" | "by_interaction_count" => Ok(RegularizationScaling::ByInteractionCount),
            other => Err(RecommenderError::invalid_config(
                format!("unknown regularization scaling '{}'", other),
                KEY,
            )),
        },
    }
}

fn parse_missing_users() -> Result<MissingUserPolicy, RecommenderError> {
    const KEY: &str = "ARTIST_REC_MISSING_USERS";
    match std::env::var(KEY) {
        Err(_) => Ok(MissingUserPolicy::Exclude),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(MissingUserPolicy::Exclude),
            "zero" | "score_zero" => Ok(MissingUserPolicy::ScoreZero),
            other => Err(RecommenderError::invalid_config(
                format!("unknown missing-user policy '{}'", other),
                KEY,
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.split_weights, vec![40.0, 40.0, 20.0]);
        assert_eq!(config.split_seed, 13);
        assert_eq!(config.selection.candidate_ranks, vec![2, 10, 20]);
        assert_eq!(config.selection.training.seed, 345);
        assert_eq!(config.selection.training.iterations, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_split() {
        let config = PipelineConfig {
            split_weights: vec![50.0, 50.0],
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            split_weights: vec![50.0, 0.0, 50.0],
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_rank_and_threads() {
        let mut config = PipelineConfig::default();
        config.selection.candidate_ranks = vec![4, 0];
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            threads: Some(0),
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err().config_key(),
            Some("ARTIST_REC_THREADS")
        );
    }

    #[test]
    fn test_from_env_overrides() {
        std::env::set_var("ARTIST_REC_CANDIDATE_RANKS", "4, 8");
        std::env::set_var("ARTIST_REC_SELECTION", "fixed:8");
        std::env::set_var("ARTIST_REC_MISSING_USERS", "zero");

        let config = PipelineConfig::from_env().unwrap();
        assert_eq!(config.selection.candidate_ranks, vec![4, 8]);
        assert_eq!(config.selection.strategy, SelectionStrategy::FixedRank(8));
        assert_eq!(config.selection.missing_users, MissingUserPolicy::ScoreZero);
        assert_eq!(config.split_seed, 13);

        std::env::set_var("ARTIST_REC_SELECTION", "worst");
        let err = PipelineConfig::from_env().unwrap_err();
        assert_eq!(err.config_key(), Some("ARTIST_REC_SELECTION"));

        std::env::remove_var("ARTIST_REC_CANDIDATE_RANKS");
        std::env::remove_var("ARTIST_REC_SELECTION");
        std::env::remove_var("ARTIST_REC_MISSING_USERS");
    }

    #[test]
    fn test_validation_rejects_negative_confidence() {
        let mut config = PipelineConfig::default();
        config.selection.training.confidence_weight = -0.5;
        assert!(config.validate().is_err());
    }
}
