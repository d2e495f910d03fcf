//! Periodic snapshotting.
//!
//! A [`Scheduler`] owns one background task that ticks at a fixed interval.
//! On every tick it evaluates a condition and, if it holds, saves the
//! manager's target under a freshly generated name. Ticks run one after
//! another on that task; a slow tick delays the next instead of overlapping
//! it.

use crate::capture::Snapshotable;
use crate::config::NameStrategy;
use crate::error::{SnapshotError, SnapshotResult};
use crate::event::ListenerRef;
use crate::manager::SnapshotManager;
use snapkeep_util::{as_millis, TimingGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Predicate evaluated on every tick.
pub type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Produces the snapshot name for a tick. Called once per saving tick.
pub type NameSupplier = Arc<dyn Fn() -> String + Send + Sync>;

/// Scheduler options, validated by [`Scheduler::new`].
pub struct SchedulerConfig<T> {
    /// Tick period. Required and must be non-zero.
    pub interval: Option<Duration>,
    /// Defaults to always true.
    pub condition: Condition,
    /// Defaults to ULID-based names (`snap_01h...`).
    pub name_supplier: NameSupplier,
    /// Attached to the manager before the first tick.
    pub listeners: Vec<ListenerRef<T>>,
}

impl<T> Default for SchedulerConfig<T> {
    fn default() -> Self {
        Self {
            interval: None,
            condition: Arc::new(|| true),
            name_supplier: NameStrategy::default().supplier(),
            listeners: Vec::new(),
        }
    }
}

impl<T> SchedulerConfig<T> {
    /// Config with the given interval and all other options defaulted.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::default()
        }
    }

    /// Only save on ticks where `condition` returns true.
    pub fn with_condition(mut self, condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.condition = Arc::new(condition);
        self
    }

    /// Name each scheduled snapshot with `supplier`.
    pub fn with_name_supplier(
        mut self,
        supplier: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.name_supplier = Arc::new(supplier);
        self
    }

    /// Save every tick under the same name.
    pub fn with_fixed_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_name_supplier(move || name.clone())
    }

    /// Attach `listener` to the manager when the scheduler is built.
    pub fn with_listener(mut self, listener: ListenerRef<T>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Check the options, returning the tick period.
    pub fn validate(&self) -> SnapshotResult<Duration> {
        match self.interval {
            None => Err(SnapshotError::configuration(
                "scheduler interval is required",
            )),
            Some(interval) if interval.is_zero() => Err(SnapshotError::configuration(
                "scheduler interval must be positive",
            )),
            Some(interval) => Ok(interval),
        }
    }
}

/// Lifecycle of a scheduler. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Default)]
struct TickStats {
    ticks: AtomicU64,
    saves: AtomicU64,
    failures: AtomicU64,
}

struct Lifecycle {
    state: SchedulerState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Saves a manager's target on a fixed interval while a condition holds.
pub struct Scheduler<T: Snapshotable> {
    manager: Arc<SnapshotManager<T>>,
    interval: Duration,
    condition: Condition,
    name_supplier: NameSupplier,
    lifecycle: Mutex<Lifecycle>,
    stats: Arc<TickStats>,
}

impl<T: Snapshotable> Scheduler<T> {
    /// Validate `config` and attach its listeners to `manager`.
    ///
    /// The scheduler starts out idle; nothing runs until [`Scheduler::start`].
    pub fn new(manager: Arc<SnapshotManager<T>>, config: SchedulerConfig<T>) -> SnapshotResult<Self> {
        let interval = config.validate()?;

        for listener in config.listeners {
            manager.add_listener_ref(listener);
        }

        Ok(Self {
            manager,
            interval,
            condition: config.condition,
            name_supplier: config.name_supplier,
            lifecycle: Mutex::new(Lifecycle {
                state: SchedulerState::Idle,
                cancel: CancellationToken::new(),
                handle: None,
            }),
            stats: Arc::new(TickStats::default()),
        })
    }

    /// Begin ticking. The first tick fires one interval from now.
    ///
    /// Does nothing unless the scheduler is idle. Must be called from within
    /// a tokio runtime.
    pub fn start(&self) -> SnapshotResult<()> {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.state != SchedulerState::Idle {
            debug!(state = ?lifecycle.state, "Scheduler start ignored");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SnapshotError::configuration(format!("scheduler needs a tokio runtime: {e}"))
        })?;

        let ticker = TickLoop {
            manager: self.manager.clone(),
            interval: self.interval,
            condition: self.condition.clone(),
            name_supplier: self.name_supplier.clone(),
            cancel: lifecycle.cancel.clone(),
            stats: self.stats.clone(),
        };
        lifecycle.handle = Some(runtime.spawn(ticker.run()));
        lifecycle.state = SchedulerState::Running;

        info!(interval_ms = as_millis(self.interval), "Snapshot scheduler started");
        Ok(())
    }

    /// Stop ticking and wait for an in-flight tick to finish.
    ///
    /// No tick fires after this returns. Does nothing unless running.
    pub async fn stop(&self) {
        let handle = {
            let mut lifecycle = self.lock_lifecycle();
            if lifecycle.state != SchedulerState::Running {
                debug!(state = ?lifecycle.state, "Scheduler stop ignored");
                return;
            }
            lifecycle.state = SchedulerState::Stopped;
            lifecycle.cancel.cancel();
            lifecycle.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Snapshot scheduler task ended abnormally");
            }
        }

        info!(
            ticks = self.ticks(),
            saves = self.saves(),
            "Snapshot scheduler stopped"
        );
    }

    /// Alias of [`Scheduler::stop`].
    pub async fn stop_all(&self) {
        self.stop().await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.lock_lifecycle().state
    }

    /// Whether ticks are currently firing.
    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The manager ticks save through.
    pub fn manager(&self) -> &Arc<SnapshotManager<T>> {
        &self.manager
    }

    /// Ticks fired so far, whether or not they saved.
    pub fn ticks(&self) -> u64 {
        self.stats.ticks.load(Ordering::SeqCst)
    }

    /// Scheduled saves that succeeded.
    pub fn saves(&self) -> u64 {
        self.stats.saves.load(Ordering::SeqCst)
    }

    /// Scheduled saves that failed.
    pub fn failures(&self) -> u64 {
        self.stats.failures.load(Ordering::SeqCst)
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Snapshotable> Drop for Scheduler<T> {
    fn drop(&mut self) {
        self.lock_lifecycle().cancel.cancel();
    }
}

/// State moved into the background task.
struct TickLoop<T: Snapshotable> {
    manager: Arc<SnapshotManager<T>>,
    interval: Duration,
    condition: Condition,
    name_supplier: NameSupplier,
    cancel: CancellationToken,
    stats: Arc<TickStats>,
}

impl<T: Snapshotable> TickLoop<T> {
    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }
        debug!("Snapshot scheduler loop exited");
    }

    async fn tick(&self) {
        let tick = self.stats.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if !(self.condition)() {
            trace!(tick, "Scheduler condition false, skipping");
            return;
        }

        let name = (self.name_supplier)();
        let _timing = TimingGuard::tick(name.as_str());
        match self.manager.save(&name).await {
            Ok(_) => {
                self.stats.saves.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                // One failed tick must not end the loop.
                self.stats.failures.fetch_add(1, Ordering::SeqCst);
                warn!(tick, name = %name, error = %e, "Scheduled snapshot failed");
            }
        }
    }
}
