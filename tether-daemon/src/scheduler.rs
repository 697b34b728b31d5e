//! The run loop: ordered tasks on a fixed, drift-corrected interval.
//!
//! One tokio task per active run, cancelled cooperatively through a
//! `watch` signal checked while sleeping and before each task invocation.
//! Kill and repeat exhaustion are *normal* termination — callbacks run
//! once, in order. A task or callback error aborts the run, skips the
//! remaining callbacks, and surfaces through `kill(wait = true)`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::DaemonError;

/// Boxed error a task or callback may fail with.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Future produced by one task invocation.
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// A registered unit of work; invoked once per cycle, in registration order.
pub type TaskFn = Box<dyn FnMut() -> TaskFuture + Send>;

/// Repeat sentinel: cycle until killed.
pub const REPEAT_FOREVER: i64 = -1;

/// Cooperative background scheduler.
///
/// Build one with [`Daemon::new`], register tasks and callbacks, then call
/// [`Daemon::start`]. Tasks run in registration order within each cycle;
/// callbacks run exactly once after the loop terminates normally (killed or
/// repeat count exhausted), never after a task error.
///
/// Control calls (`start` / `kill`) are `&mut self` — serializing them is
/// the caller's job, and the borrow checker enforces it for a single owner.
pub struct Daemon {
    tasks: Arc<Mutex<Vec<TaskFn>>>,
    callbacks: Arc<Mutex<Vec<TaskFn>>>,
    delay: Arc<RwLock<Duration>>,
    repeat: i64,
    kill_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<Result<(), DaemonError>>>,
}

impl Daemon {
    /// A scheduler with the given inter-cycle delay, repeating until killed.
    pub fn new(delay: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            delay: Arc::new(RwLock::new(delay)),
            repeat: REPEAT_FOREVER,
            kill_tx: None,
            handle: None,
        }
    }

    /// Limit the run to `count` cycles ([`REPEAT_FOREVER`] = unlimited,
    /// `0` = zero cycles — callbacks still fire).
    pub fn repeat(mut self, count: i64) -> Self {
        self.repeat = count.max(REPEAT_FOREVER);
        self
    }

    /// Append a task. Registration order is invocation order within a cycle.
    pub async fn add_task<F>(&self, task: F)
    where
        F: FnMut() -> TaskFuture + Send + 'static,
    {
        self.tasks.lock().await.push(Box::new(task));
    }

    /// Append a termination callback (runs after normal loop exit only).
    pub async fn add_callback<F>(&self, callback: F)
    where
        F: FnMut() -> TaskFuture + Send + 'static,
    {
        self.callbacks.lock().await.push(Box::new(callback));
    }

    /// Current inter-cycle target period.
    pub fn delay(&self) -> Duration {
        *self.delay.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the inter-cycle period. Takes effect with the next cycle's
    /// wait computation, including on a running loop.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Spawn the run loop. Fails with [`DaemonError::AlreadyRunning`] if a
    /// run is active. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), DaemonError> {
        if self.is_alive() {
            return Err(DaemonError::AlreadyRunning);
        }

        let (kill_tx, kill_rx) = watch::channel(false);
        self.handle = Some(tokio::spawn(run_loop(
            self.tasks.clone(),
            self.callbacks.clone(),
            self.delay.clone(),
            self.repeat,
            kill_rx,
        )));
        self.kill_tx = Some(kill_tx);
        Ok(())
    }

    /// Signal termination. The loop exits at its next check point: during
    /// the inter-cycle wait, or before the next task in the current cycle
    /// (already-invoked tasks are not rolled back).
    ///
    /// With `wait = true`, blocks until the loop task has fully exited,
    /// surfaces its result, and resets to idle so the daemon can be
    /// restarted. Never call the waiting variant from inside one of this
    /// daemon's own tasks — that is a self-join deadlock.
    pub async fn kill(&mut self, wait: bool) -> Result<(), DaemonError> {
        if let Some(kill_tx) = &self.kill_tx {
            // The receiver is gone once the loop exits; nothing to signal then.
            let _ = kill_tx.send(true);
        }
        if wait {
            self.join().await?;
        }
        Ok(())
    }

    /// Wait for the active run to finish on its own and surface its result.
    /// Idle daemons return immediately.
    pub async fn join(&mut self) -> Result<(), DaemonError> {
        if let Some(handle) = self.handle.take() {
            // Keep the kill sender alive until the loop exits: dropping it
            // early reads as a kill signal on the other end.
            let result = handle.await;
            self.kill_tx = None;
            result??;
        }
        Ok(())
    }

    /// True iff a run-loop task exists and has not exited.
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

// Tasks and callbacks are boxed closures, so the derive is unavailable.
impl fmt::Debug for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daemon")
            .field("delay", &self.delay())
            .field("repeat", &self.repeat)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

async fn run_loop(
    tasks: Arc<Mutex<Vec<TaskFn>>>,
    callbacks: Arc<Mutex<Vec<TaskFn>>>,
    delay: Arc<RwLock<Duration>>,
    repeat: i64,
    mut kill_rx: watch::Receiver<bool>,
) -> Result<(), DaemonError> {
    let mut remaining = repeat;

    'cycles: loop {
        if *kill_rx.borrow() || remaining == 0 {
            break;
        }
        if remaining > 0 {
            remaining -= 1;
        }

        let cycle_start = Instant::now();

        {
            let mut tasks = tasks.lock().await;
            for task in tasks.iter_mut() {
                if *kill_rx.borrow() {
                    break 'cycles;
                }
                if let Err(err) = task().await {
                    tracing::error!(error = %err, "daemon task failed; aborting run");
                    return Err(DaemonError::Task(err));
                }
            }
        }

        // Drift correction: the wait counts from cycle start, so slow tasks
        // shrink the idle period. They never push the next cycle earlier
        // than "now".
        let target = *delay.read().unwrap_or_else(|e| e.into_inner());
        let wait = target.saturating_sub(cycle_start.elapsed());
        tokio::select! {
            changed = kill_rx.changed() => {
                // A closed channel means the owner dropped us; treat as kill.
                if changed.is_err() || *kill_rx.borrow() {
                    break 'cycles;
                }
            }
            _ = tokio::time::sleep(wait) => {}
        }
    }

    let mut callbacks = callbacks.lock().await;
    for callback in callbacks.iter_mut() {
        if let Err(err) = callback().await {
            tracing::error!(error = %err, "daemon callback failed");
            return Err(DaemonError::Callback(err));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    type Log = Arc<StdMutex<Vec<&'static str>>>;

    fn logging_task(log: &Log, name: &'static str) -> impl FnMut() -> TaskFuture + Send {
        let log = log.clone();
        move || {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push(name);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn tasks_run_in_registration_order_per_cycle() {
        let log: Log = Arc::new(StdMutex::new(Vec::new()));
        let mut daemon = Daemon::new(Duration::from_millis(1)).repeat(2);
        daemon.add_task(logging_task(&log, "t1")).await;
        daemon.add_task(logging_task(&log, "t2")).await;
        daemon.add_callback(logging_task(&log, "done")).await;

        daemon.start().expect("start");
        daemon.join().await.expect("join");

        assert_eq!(*log.lock().unwrap(), vec!["t1", "t2", "t1", "t2", "done"]);
        assert!(!daemon.is_alive());
    }

    #[tokio::test]
    async fn repeat_zero_runs_no_cycles_but_fires_callbacks() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicUsize::new(0));

        let mut daemon = Daemon::new(Duration::from_millis(1)).repeat(0);
        let cycles_in = cycles.clone();
        daemon
            .add_task(move || {
                let cycles = cycles_in.clone();
                Box::pin(async move {
                    cycles.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;
        let ended_in = ended.clone();
        daemon
            .add_callback(move || {
                let ended = ended_in.clone();
                Box::pin(async move {
                    ended.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        daemon.join().await.expect("join");

        assert_eq!(cycles.load(Ordering::SeqCst), 0);
        assert_eq!(ended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_start_fails_while_running() {
        let mut daemon = Daemon::new(Duration::from_secs(60));
        daemon
            .add_task(|| Box::pin(async { Ok(()) }))
            .await;

        daemon.start().expect("first start");
        assert!(matches!(daemon.start(), Err(DaemonError::AlreadyRunning)));
        assert!(daemon.is_alive());

        daemon.kill(true).await.expect("kill");
        assert!(!daemon.is_alive());
    }

    #[tokio::test]
    async fn kill_with_wait_returns_only_after_exit() {
        let mut daemon = Daemon::new(Duration::from_millis(5));
        daemon
            .add_task(|| Box::pin(async { Ok(()) }))
            .await;

        daemon.start().expect("start");
        daemon.kill(true).await.expect("kill");
        assert!(!daemon.is_alive());
    }

    #[tokio::test]
    async fn daemon_can_be_restarted_after_kill() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let mut daemon = Daemon::new(Duration::from_millis(1)).repeat(1);
        let cycles_in = cycles.clone();
        daemon
            .add_task(move || {
                let cycles = cycles_in.clone();
                Box::pin(async move {
                    cycles.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        daemon.kill(true).await.expect("kill");
        daemon.start().expect("restart");
        daemon.join().await.expect("join");

        assert_eq!(cycles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn task_error_aborts_run_and_skips_callbacks() {
        let ended = Arc::new(AtomicUsize::new(0));
        let mut daemon = Daemon::new(Duration::from_millis(1));
        daemon
            .add_task(|| Box::pin(async { Err("boom".into()) }))
            .await;
        let ended_in = ended.clone();
        daemon
            .add_callback(move || {
                let ended = ended_in.clone();
                Box::pin(async move {
                    ended.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        let err = daemon.join().await.expect_err("task error must surface");
        assert!(matches!(err, DaemonError::Task(_)));
        assert_eq!(ended.load(Ordering::SeqCst), 0, "callbacks must be skipped");
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_cycle_start_not_completion() {
        let starts: Arc<StdMutex<Vec<Instant>>> = Arc::new(StdMutex::new(Vec::new()));
        let mut daemon = Daemon::new(Duration::from_millis(100)).repeat(3);
        let starts_in = starts.clone();
        daemon
            .add_task(move || {
                let starts = starts_in.clone();
                Box::pin(async move {
                    starts.lock().unwrap().push(Instant::now());
                    // Simulate 30 ms of work; the inter-cycle wait must
                    // shrink to 70 ms so cycle starts stay 100 ms apart.
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        daemon.join().await.expect("join");

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!(
            starts[1].duration_since(starts[0]),
            Duration::from_millis(100)
        );
        assert_eq!(
            starts[2].duration_since(starts[1]),
            Duration::from_millis(100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn kill_interrupts_inter_cycle_wait() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicUsize::new(0));

        let mut daemon = Daemon::new(Duration::from_secs(3600));
        let cycles_in = cycles.clone();
        daemon
            .add_task(move || {
                let cycles = cycles_in.clone();
                Box::pin(async move {
                    cycles.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;
        let ended_in = ended.clone();
        daemon
            .add_callback(move || {
                let ended = ended_in.clone();
                Box::pin(async move {
                    ended.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        // Let the first cycle run, then kill mid-wait; the hour-long sleep
        // must not delay the join.
        tokio::time::sleep(Duration::from_millis(10)).await;
        daemon.kill(true).await.expect("kill");

        assert_eq!(cycles.load(Ordering::SeqCst), 1);
        assert_eq!(ended.load(Ordering::SeqCst), 1, "kill is normal termination");
        assert!(!daemon.is_alive());
    }

    #[tokio::test]
    async fn delay_is_settable_while_running() {
        let mut daemon = Daemon::new(Duration::from_millis(50));
        daemon
            .add_task(|| Box::pin(async { Ok(()) }))
            .await;
        daemon.start().expect("start");

        daemon.set_delay(Duration::from_millis(5));
        assert_eq!(daemon.delay(), Duration::from_millis(5));

        daemon.kill(true).await.expect("kill");
    }

    #[tokio::test(start_paused = true)]
    async fn new_delay_governs_the_next_cycle_wait() {
        let starts: Arc<StdMutex<Vec<Instant>>> = Arc::new(StdMutex::new(Vec::new()));
        let mut daemon = Daemon::new(Duration::from_millis(100)).repeat(3);
        let starts_in = starts.clone();
        daemon
            .add_task(move || {
                let starts = starts_in.clone();
                Box::pin(async move {
                    starts.lock().unwrap().push(Instant::now());
                    Ok(())
                })
            })
            .await;

        daemon.start().expect("start");
        // Change the period while the first cycle's 100 ms wait is already
        // in flight: that wait finishes as scheduled, every later wait uses
        // the new period.
        tokio::time::sleep(Duration::from_millis(50)).await;
        daemon.set_delay(Duration::from_millis(500));
        daemon.join().await.expect("join");

        let starts = starts.lock().unwrap();
        assert_eq!(starts.len(), 3);
        assert_eq!(
            starts[1].duration_since(starts[0]),
            Duration::from_millis(100)
        );
        assert_eq!(
            starts[2].duration_since(starts[1]),
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn debug_output_reports_liveness() {
        let mut daemon = Daemon::new(Duration::from_millis(5));
        daemon
            .add_task(|| Box::pin(async { Ok(()) }))
            .await;
        assert!(format!("{daemon:?}").contains("alive: false"));

        daemon.start().expect("start");
        assert!(format!("{daemon:?}").contains("alive: true"));

        daemon.kill(true).await.expect("kill");
    }
}
