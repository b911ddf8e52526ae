//! Cooperative cancellation for long-running computations
//!
//! Training runs on worker threads and cannot be interrupted mid-solve. Instead
//! the trainer polls a [`CancellationToken`] at each phase barrier and stops
//! cleanly. [`cancel_on_ctrl_c`] wires the token to SIGINT for interactive use.
//!
//! # Example
//!
//! ```no_run
//! use artist_rec_core::shutdown::{cancel_on_ctrl_c, CancellationToken};
//!
//! # async fn example() {
//! let token = CancellationToken::new();
//! tokio::spawn(cancel_on_ctrl_c(token.clone()));
//!
//! let worker = token.clone();
//! tokio::task::spawn_blocking(move || {
//!     while !worker.is_cancelled() {
//!         // one round of work
//!     }
//! });
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared cancellation flag
///
/// Clones observe the same flag. Cancellation is sticky: once set it is never
/// cleared.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Cancel `token` when the process receives Ctrl-C
pub async fn cancel_on_ctrl_c(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, cancelling in-flight work");
            token.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
    }
}
