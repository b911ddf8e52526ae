//! # Artist Recommender Core
//!
//! Ambient building blocks shared by the artist recommender crates.
//!
//! ## Modules
//!
//! - `error`: Error taxonomy for configuration, dataset and numerical failures
//! - `config`: Configuration loading from environment variables and .env files
//! - `observability`: Structured logging initialization
//! - `shutdown`: Cooperative cancellation of long-running training

pub mod config;
pub mod error;
pub mod observability;
pub mod shutdown;

// Re-export commonly used types
pub use config::{load_dotenv, parse_env_list, parse_env_opt, parse_env_var, ConfigLoader};
pub use error::RecommenderError;
pub use observability::{init_logging, LogConfig, LogFormat, ObservabilityError};
pub use shutdown::{cancel_on_ctrl_c, CancellationToken};

/// Result type alias for recommender operations
pub type Result<T> = std::result::Result<T, RecommenderError>;
