//! Background reaping of idle pooled connections.
//!
//! One [`IdleConnectionReaper`] serves any number of independently
//! configured pools with a single dedicated worker thread. The worker is
//! started lazily on the first registration, stops itself when the registry
//! empties, and restarts on the next registration — no thread leaks while no
//! client wants reaping, no permanently stuck stopped state.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::manager::ConnectionManager;

/// Upper bound on how long the worker sleeps between sweeps, regardless of
/// how large the registered idle thresholds are.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// A single sweep of one handle is expected to be prompt; anything past this
/// gets flagged because it delays every other registered pool.
const SLOW_SWEEP_THRESHOLD: Duration = Duration::from_secs(1);

struct Registration {
    manager: Weak<dyn ConnectionManager>,
    max_idle: Duration,
}

struct ReaperState {
    /// Keyed on handle identity (the `Arc` data pointer), which gives
    /// insert-or-overwrite semantics: re-registering a handle updates its
    /// threshold instead of duplicating the entry.
    registrations: HashMap<usize, Registration>,
    worker_running: bool,
    sweep_in_progress: bool,
    shutdown_requested: bool,
}

/// Process-scoped service that closes pooled connections left idle past
/// their per-pool threshold.
///
/// Registrations hold only a [`Weak`] reference, so the reaper never keeps a
/// pool alive: a handle whose last owner drops is pruned on the next sweep.
/// `register`, `deregister` and `shutdown` are safe to call from any thread,
/// concurrently with the sweep; the worker snapshots the registration set
/// before sweeping so concurrent calls never corrupt a sweep in progress.
///
/// Most callers want the [`shared`](Self::shared) process-wide instance, but
/// the service is an explicit object — tests and embedders can run their
/// own.
pub struct IdleConnectionReaper {
    state: Mutex<ReaperState>,
    wake: Condvar,
}

impl Default for IdleConnectionReaper {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleConnectionReaper {
    /// Create an idle reaper with an empty registry and no worker running.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReaperState {
                registrations: HashMap::new(),
                worker_running: false,
                sweep_in_progress: false,
                shutdown_requested: false,
            }),
            wake: Condvar::new(),
        }
    }

    /// The process-wide reaper instance shared by default client factories.
    pub fn shared() -> &'static Arc<Self> {
        static SHARED: OnceLock<Arc<IdleConnectionReaper>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::new()))
    }

    /// Register a connection manager, or update its idle threshold if it is
    /// already registered.
    ///
    /// Starts the background worker if none is running; a reaper that was
    /// previously shut down or whose registry emptied is re-armed by this
    /// call.
    pub fn register(self: &Arc<Self>, manager: &Arc<dyn ConnectionManager>, max_idle: Duration) {
        let mut state = self.lock_state();
        state.shutdown_requested = false;
        state.registrations.insert(
            registration_key(manager),
            Registration {
                manager: Arc::downgrade(manager),
                max_idle,
            },
        );

        if !state.worker_running {
            let worker = Arc::downgrade(self);
            let spawned = thread::Builder::new()
                .name("breakwater-idle-reaper".to_string())
                .spawn(move || worker_loop(&worker));
            match spawned {
                Ok(_) => state.worker_running = true,
                Err(e) => error!("failed to spawn idle-connection reaper worker: {e}"),
            }
        }
        drop(state);
        self.wake.notify_all();
    }

    /// Remove a connection manager's registration.
    ///
    /// Returns whether it was present. Once this returns `true`, the handle
    /// will not be swept again unless re-registered: if a sweep is in
    /// progress the call waits for it to finish, making the removal
    /// linearizable with the worker's view. A [`ConnectionManager`]
    /// implementation must therefore never call back into the reaper from
    /// its sweep path.
    ///
    /// An emptied registry lets the worker stop itself.
    pub fn deregister(&self, manager: &Arc<dyn ConnectionManager>) -> bool {
        let mut state = self.lock_state();
        let removed = state
            .registrations
            .remove(&registration_key(manager))
            .is_some();
        if removed {
            while state.sweep_in_progress {
                state = self
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        drop(state);
        self.wake.notify_all();
        removed
    }

    /// Stop the worker unconditionally and clear every registration.
    ///
    /// Meant for process teardown; a later [`register`](Self::register)
    /// restarts the service.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock_state();
            state.shutdown_requested = true;
            state.registrations.clear();
        }
        self.wake.notify_all();
    }

    /// Number of currently registered connection managers.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.lock_state().registrations.len()
    }

    /// Whether the background worker is currently running.
    #[must_use]
    pub fn is_worker_running(&self) -> bool {
        self.lock_state().worker_running
    }

    fn lock_state(&self) -> MutexGuard<'_, ReaperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn registration_key(manager: &Arc<dyn ConnectionManager>) -> usize {
    Arc::as_ptr(manager) as *const () as usize
}

fn worker_loop(reaper: &Weak<IdleConnectionReaper>) {
    debug!("idle-connection reaper worker started");
    loop {
        // Hold the reaper only for the duration of one cycle, so a dropped
        // service lets the worker exit within one wake interval.
        let Some(reaper) = reaper.upgrade() else {
            debug!("idle-connection reaper dropped, worker exiting");
            return;
        };

        let snapshot = {
            let mut state = reaper.lock_state();
            if worker_should_stop(&state) {
                state.worker_running = false;
                debug!("idle-connection reaper worker stopping");
                return;
            }

            // A zero threshold means "sweep at the default cadence", never
            // "wake continuously": the interval must stay positive or the
            // worker degenerates into a busy spin.
            let interval = state
                .registrations
                .values()
                .map(|r| r.max_idle)
                .filter(|max_idle| !max_idle.is_zero())
                .min()
                .unwrap_or(MAX_SWEEP_INTERVAL)
                .min(MAX_SWEEP_INTERVAL);

            // Sleep releases the lock; register/deregister/shutdown wake us
            // early so the registry is never swept from stale premises.
            let (mut state, _timed_out) = reaper
                .wake
                .wait_timeout(state, interval)
                .unwrap_or_else(PoisonError::into_inner);
            if worker_should_stop(&state) {
                state.worker_running = false;
                debug!("idle-connection reaper worker stopping");
                return;
            }

            // Snapshot before iterating: the sweep runs without the lock, so
            // concurrent register/deregister calls can never deadlock with
            // it or corrupt the iteration.
            state.sweep_in_progress = true;
            state
                .registrations
                .iter()
                .map(|(key, registration)| {
                    (*key, registration.manager.clone(), registration.max_idle)
                })
                .collect::<Vec<_>>()
        };

        let mut dead = Vec::new();
        for (key, manager, max_idle) in snapshot {
            let Some(manager) = manager.upgrade() else {
                dead.push(key);
                continue;
            };

            let sweep_started = Instant::now();
            // One pool failing must not abort the sweep of the rest.
            if let Err(e) = manager.close_idle_connections(max_idle) {
                warn!("sweep failed for one connection pool, continuing: {e}");
            }
            if sweep_started.elapsed() > SLOW_SWEEP_THRESHOLD {
                warn!(
                    "idle sweep of one connection pool took {:?}, delaying the others",
                    sweep_started.elapsed()
                );
            }
        }

        {
            let mut state = reaper.lock_state();
            state.sweep_in_progress = false;
            for key in dead {
                state.registrations.remove(&key);
            }
        }
        reaper.wake.notify_all();
    }
}

fn worker_should_stop(state: &ReaperState) -> bool {
    state.shutdown_requested || state.registrations.is_empty()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::{SweepError, TransportError};

    #[derive(Default)]
    struct RecordingManager {
        sweeps: AtomicUsize,
        thresholds: StdMutex<Vec<Duration>>,
        fail: bool,
    }

    impl RecordingManager {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn sweep_count(&self) -> usize {
            self.sweeps.load(Ordering::SeqCst)
        }

        fn last_threshold(&self) -> Option<Duration> {
            self.thresholds.lock().unwrap().last().copied()
        }
    }

    impl ConnectionManager for RecordingManager {
        fn close_idle_connections(&self, idle_longer_than: Duration) -> Result<bool, SweepError> {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            self.thresholds.lock().unwrap().push(idle_longer_than);
            if self.fail {
                return Err(SweepError::from(TransportError::PoolShutDown));
            }
            Ok(true)
        }

        fn shutdown(&self) {}
    }

    fn handle(manager: &Arc<RecordingManager>) -> Arc<dyn ConnectionManager> {
        Arc::clone(manager) as Arc<dyn ConnectionManager>
    }

    fn wait_until(what: &str, condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn re_registration_overwrites_the_idle_threshold() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::from_millis(10));
        reaper.register(&handle(&manager), Duration::from_millis(25));

        assert_eq!(reaper.registered_count(), 1);
        wait_until("a sweep with the updated threshold", || {
            manager.last_threshold() == Some(Duration::from_millis(25))
        });

        reaper.shutdown();
    }

    #[test]
    fn unregistered_handles_are_never_swept() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let registered = Arc::new(RecordingManager::default());
        let bystander = Arc::new(RecordingManager::default());

        reaper.register(&handle(&registered), Duration::from_millis(10));
        wait_until("the registered pool to be swept", || {
            registered.sweep_count() > 2
        });

        assert_eq!(bystander.sweep_count(), 0);
        reaper.shutdown();
    }

    #[test]
    fn deregistered_handles_are_not_swept_again() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::from_millis(10));
        wait_until("an initial sweep", || manager.sweep_count() > 0);

        assert!(reaper.deregister(&handle(&manager)));
        let after_removal = manager.sweep_count();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(manager.sweep_count(), after_removal);

        // Already gone.
        assert!(!reaper.deregister(&handle(&manager)));
    }

    #[test]
    fn worker_stops_when_empty_and_restarts_on_register() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::from_millis(10));
        wait_until("the worker to start", || reaper.is_worker_running());

        reaper.deregister(&handle(&manager));
        wait_until("the worker to stop on an empty registry", || {
            !reaper.is_worker_running()
        });

        // No permanently stuck stopped state.
        let count_before = manager.sweep_count();
        reaper.register(&handle(&manager), Duration::from_millis(10));
        wait_until("the restarted worker to sweep", || {
            manager.sweep_count() > count_before
        });

        reaper.shutdown();
    }

    #[test]
    fn one_failing_pool_does_not_abort_the_sweep_of_others() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let failing = Arc::new(RecordingManager::failing());
        let healthy = Arc::new(RecordingManager::default());

        reaper.register(&handle(&failing), Duration::from_millis(10));
        reaper.register(&handle(&healthy), Duration::from_millis(10));

        wait_until("the healthy pool to keep being swept", || {
            healthy.sweep_count() > 3
        });
        assert!(failing.sweep_count() > 0);

        reaper.shutdown();
    }

    #[test]
    fn zero_idle_threshold_paces_the_worker_instead_of_spinning() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::ZERO);
        thread::sleep(Duration::from_millis(200));

        // A condvar-paced worker sweeps a handful of times at most in this
        // window; anything beyond that means the wait interval collapsed.
        assert!(
            manager.sweep_count() < 5,
            "worker swept {} times in 200ms",
            manager.sweep_count()
        );

        reaper.shutdown();
    }

    #[test]
    fn dropped_handles_are_pruned() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::from_millis(10));
        assert_eq!(reaper.registered_count(), 1);

        drop(manager);
        wait_until("the dead registration to be pruned", || {
            reaper.registered_count() == 0
        });
    }

    #[test]
    fn shutdown_clears_registrations_and_stops_the_worker() {
        let reaper = Arc::new(IdleConnectionReaper::new());
        let manager = Arc::new(RecordingManager::default());

        reaper.register(&handle(&manager), Duration::from_millis(10));
        reaper.shutdown();

        assert_eq!(reaper.registered_count(), 0);
        wait_until("the worker to stop after shutdown", || {
            !reaper.is_worker_running()
        });
    }
}
