//! Periodic reclamation of expired counters.
//!
//! Lazy expiry inside `check_admission` keeps decisions correct on its own.
//! The sweeper only bounds memory for identities that stop sending requests,
//! so a delayed or stopped sweeper never changes an admission decision.

use crate::application::controller::AdmissionController;
use crate::application::ports::CounterStore;
use crate::domain::counter::CounterEntry;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How long `shutdown` waits for the sweep task to finish.
#[cfg(feature = "async")]
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweeperConfigError {
    /// Sweep interval duration must be greater than zero
    ZeroSweepInterval,
}

impl std::fmt::Display for SweeperConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweeperConfigError::ZeroSweepInterval => {
                write!(f, "sweep interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for SweeperConfigError {}

/// Configuration for the periodic sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// How often to sweep
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SweeperConfig {
    /// Create a new sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroSweepInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroSweepInterval);
        }
        Ok(Self { interval })
    }
}

/// Error returned when the sweep task fails to stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The task did not stop within the shutdown timeout and was aborted
    Timeout,
    /// The task panicked
    TaskPanicked,
    /// The task was cancelled by the runtime
    TaskCancelled,
}

#[cfg(feature = "async")]
impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownError::Timeout => write!(f, "sweep task did not stop within {:?}", SHUTDOWN_TIMEOUT),
            ShutdownError::TaskPanicked => write!(f, "sweep task panicked"),
            ShutdownError::TaskCancelled => write!(f, "sweep task was cancelled"),
        }
    }
}

#[cfg(feature = "async")]
impl std::error::Error for ShutdownError {}

/// Sweeps a controller's expired counters on a fixed interval.
pub struct Sweeper<S>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    controller: AdmissionController<S>,
    config: SweeperConfig,
}

impl<S> Sweeper<S>
where
    S: CounterStore<String, CounterEntry> + Clone,
{
    /// Create a new sweeper for `controller`.
    pub fn new(controller: AdmissionController<S>, config: SweeperConfig) -> Self {
        Self { controller, config }
    }

    /// Run a single sweep now. Returns the number of counters removed.
    pub fn sweep_once(&self) -> usize {
        self.controller.sweep_expired()
    }

    /// Start sweeping in a background tokio task.
    ///
    /// The first sweep runs one interval after start. The task runs until
    /// [`SweeperHandle::shutdown`] is called; dropping the handle leaves it
    /// running for the life of the runtime.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweeperHandle
    where
        S: Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.config.interval;

        let join_handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            tracing::info!(interval_ms = period.as_millis() as u64, "counter sweeper started");

            let mut listening = true;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                    changed = shutdown_rx.changed(), if listening => {
                        match changed {
                            Ok(()) if *shutdown_rx.borrow() => break,
                            Ok(()) => {}
                            // Handle dropped without shutdown: keep sweeping
                            Err(_) => listening = false,
                        }
                    }
                }
            }

            tracing::info!("counter sweeper stopped");
        });

        SweeperHandle {
            shutdown_tx,
            join_handle,
        }
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Get a reference to the controller being swept.
    pub fn controller(&self) -> &AdmissionController<S> {
        &self.controller
    }
}

/// Handle to a running sweep task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    join_handle: JoinHandle<()>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Check whether the sweep task is still running.
    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    /// Stop the sweep task and wait for it to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked, was cancelled, or did not
    /// stop within five seconds (in which case it is aborted).
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        // The receiver may already be gone if the task ended
        let _ = self.shutdown_tx.send(true);

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut self.join_handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_panic() => Err(ShutdownError::TaskPanicked),
            Ok(Err(_)) => Err(ShutdownError::TaskCancelled),
            Err(_) => {
                tracing::warn!("counter sweeper did not stop in time, aborting");
                self.join_handle.abort();
                Err(ShutdownError::Timeout)
            }
        }
    }
}
