//! Background refresh scheduler.

use std::sync::Arc;
use std::time::Duration;

use tnse_core::entry::{MAX_SCAN_INTERVAL_HOURS, MIN_SCAN_INTERVAL_HOURS};
use tnse_core::{CoreError, entry::CONF_SCAN_INTERVAL};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use crate::coordinator::RefreshCoordinator;
use crate::error::RefreshError;

/// Default cooldown between explicitly requested refreshes.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// Configuration for the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Interval between scheduled cycles.
    pub interval: Duration,
    /// Window in which explicit refresh requests coalesce.
    pub cooldown: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 3600),
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl RefreshConfig {
    /// Creates a config with an interval given in hours.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OptionOutOfRange`] unless `hours` is within 1..=168.
    pub fn with_interval_hours(hours: u64) -> Result<Self, CoreError> {
        if !(MIN_SCAN_INTERVAL_HOURS..=MAX_SCAN_INTERVAL_HOURS).contains(&hours) {
            return Err(CoreError::OptionOutOfRange {
                option: CONF_SCAN_INTERVAL.to_string(),
                reason: format!(
                    "expected {}..={} hours, got {}",
                    MIN_SCAN_INTERVAL_HOURS, MAX_SCAN_INTERVAL_HOURS, hours
                ),
            });
        }

        Ok(Self {
            interval: Duration::from_secs(hours * 3600),
            ..Self::default()
        })
    }

    /// Builder-style method to set the cooldown.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Handle for controlling a running refresh scheduler.
///
/// Dropping the handle stops the scheduler.
pub struct RefreshHandle {
    /// Sender to signal shutdown.
    shutdown_tx: watch::Sender<bool>,
    /// Sender for explicit refresh requests.
    request_tx: mpsc::Sender<()>,
    /// The scheduler task.
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Requests a refresh. Requests inside the cooldown window coalesce.
    pub fn request_refresh(&self) {
        // A full queue already holds a pending request.
        let _ = self.request_tx.try_send(());
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns true once the scheduler loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drives a coordinator on a fixed interval plus debounced explicit requests.
pub struct RefreshScheduler {
    /// The coordinator to refresh.
    coordinator: Arc<RefreshCoordinator>,
    /// Configuration.
    config: RefreshConfig,
}

impl RefreshScheduler {
    /// Creates a new refresh scheduler.
    pub fn new(coordinator: Arc<RefreshCoordinator>, config: RefreshConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Creates a scheduler using the coordinator's configured interval.
    pub fn for_coordinator(coordinator: Arc<RefreshCoordinator>) -> Self {
        let config = RefreshConfig {
            interval: coordinator.scan_interval(),
            ..RefreshConfig::default()
        };
        Self::new(coordinator, config)
    }

    /// Starts the background refresh task.
    ///
    /// The first scheduled cycle runs one interval after start; the initial
    /// refresh is expected to have happened during setup.
    pub fn start(self) -> RefreshHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (request_tx, request_rx) = mpsc::channel(1);

        let task = tokio::spawn(self.run(shutdown_rx, request_rx));

        RefreshHandle {
            shutdown_tx,
            request_tx,
            task,
        }
    }

    /// Runs the scheduler loop.
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut request_rx: mpsc::Receiver<()>) {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut cooldown_until: Option<Instant> = None;
        let mut pending = false;

        info!(
            "Starting refresh scheduler for {} with interval {:?}",
            self.coordinator.entry_id(),
            period
        );

        loop {
            let deadline = cooldown_until;
            let cooldown = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let keep_running = tokio::select! {
                _ = ticker.tick() => {
                    debug!("Starting scheduled refresh");
                    self.refresh_until_shutdown(&mut shutdown_rx).await
                }
                Some(()) = request_rx.recv() => {
                    if cooldown_until.is_some() {
                        debug!("Refresh requested during cooldown, deferring");
                        pending = true;
                        true
                    } else {
                        cooldown_until = Some(Instant::now() + self.config.cooldown);
                        self.refresh_until_shutdown(&mut shutdown_rx).await
                    }
                }
                _ = cooldown => {
                    cooldown_until = None;
                    if pending {
                        pending = false;
                        cooldown_until = Some(Instant::now() + self.config.cooldown);
                        self.refresh_until_shutdown(&mut shutdown_rx).await
                    } else {
                        true
                    }
                }
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        info!("Refresh scheduler shutting down");
                        false
                    } else {
                        true
                    }
                }
            };

            if !keep_running {
                break;
            }
        }
    }

    /// Runs a refresh, abandoning it if shutdown is signalled mid-cycle.
    async fn refresh_until_shutdown(&self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            keep_running = self.do_refresh() => keep_running,
            _ = shutdown_rx.wait_for(|stop| *stop) => {
                info!(
                    "Refresh scheduler for {} shutting down, abandoning in-flight cycle",
                    self.coordinator.entry_id()
                );
                false
            }
        }
    }

    /// Performs a single refresh. Returns false if the scheduler should stop.
    async fn do_refresh(&self) -> bool {
        match self.coordinator.refresh().await {
            Ok(snapshot) => {
                debug!("Refresh successful, {} account(s)", snapshot.len());
                true
            },
            Err(RefreshError::ReauthRequired(reason)) => {
                warn!(
                    "Suspending refresh scheduler for {}: re-authentication required ({})",
                    self.coordinator.entry_id(),
                    reason
                );
                false
            },
            Err(e) => {
                warn!("Refresh failed: {}", e);
                true
            },
        }
    }
}
