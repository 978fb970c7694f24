//! Opt-In Background Expiry Sweeper
//!
//! [`Storage`] only removes expired records lazily (on read) and once at
//! construction. A long-lived process whose keys are written and never read
//! again can start this sweeper to reclaim them periodically. Nothing in the
//! crate starts it on the caller's behalf.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for a configurable interval (default: 1s)
//! 2. Runs the same full sweep the constructor runs, over both scopes
//! 3. Adapts the interval to how much it found
//!
//! Store errors are logged and the next tick tries again.

use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 1s)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 100ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 30s)
    pub max_interval: Duration,

    /// If this fraction of entries were removed, speed up sweeping
    pub speedup_threshold: f64,

    /// If this fraction of entries were removed, slow down sweeping
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(1),
            min_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(30),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use flashstore::storage::{ExpiryConfig, ExpirySweeper, Storage};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let storage = Arc::new(Storage::in_memory());
    /// let sweeper = ExpirySweeper::start(Arc::clone(&storage), ExpiryConfig::default());
    ///
    /// // Dropping the handle stops the task
    /// drop(sweeper);
    /// # });
    /// ```
    pub fn start(storage: Arc<Storage>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(storage, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("Background expiry sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    storage: Arc<Storage>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let entries_before = match storage.len() {
            Ok(len) => len,
            Err(e) => {
                warn!(error = %e, "Expiry sweeper could not read store length");
                continue;
            }
        };

        let removed = match storage.cleanup_expired() {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
                continue;
            }
        };

        current_interval = next_interval(&config, current_interval, removed, entries_before);

        if removed > 0 {
            debug!(
                removed = removed,
                next_interval_ms = current_interval.as_millis(),
                "Expired records swept"
            );
        }
    }
}

/// Computes the interval before the next sweep.
fn next_interval(
    config: &ExpiryConfig,
    current: Duration,
    removed: u64,
    entries_before: usize,
) -> Duration {
    if entries_before == 0 {
        return current;
    }

    let expiry_rate = removed as f64 / entries_before as f64;

    if expiry_rate > config.speedup_threshold {
        (current / 2).max(config.min_interval)
    } else if expiry_rate < config.slowdown_threshold && removed == 0 {
        let slower = (current * 2).min(config.max_interval);
        trace!(new_interval_ms = slower.as_millis(), "Low expiry rate, slowing down sweeper");
        slower
    } else {
        current
    }
}

/// Starts the expiry sweeper with default configuration.
pub fn start_expiry_sweeper(storage: Arc<Storage>) -> ExpirySweeper {
    ExpirySweeper::start(storage, ExpiryConfig::default())
}
