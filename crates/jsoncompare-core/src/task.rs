//! Cancellable background execution.
//!
//! A [`Task`] owns at most one outstanding invocation. Each invocation runs on
//! the blocking pool of a shared tokio runtime and hands its result back through
//! a [`Pending`] receiver. Starting a new invocation or calling [`Task::kill`] voids the
//! previous one: its result is discarded and its `Pending` resolves to
//! [`TaskError::Cancelled`].
//!
//! ```
//! use jsoncompare_core::Task;
//!
//! let double = Task::new(|n: u32, _cancel: &_| Ok::<_, String>(n * 2));
//! assert_eq!(double.invoke(21).wait()?, 42);
//! # Ok::<(), jsoncompare_core::TaskError>(())
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot::{self, error::TryRecvError};
pub use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{Cancelled, TaskError};

const WORKER_THREADS: usize = 2;

/// Lifecycle of a task handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Nothing in flight.
    #[default]
    Idle,
    /// An invocation is scheduled or running.
    Running,
    /// The last invocation delivered a value.
    Success,
    /// The last invocation failed.
    Error,
}

/// Returns `Err(Cancelled)` once `cancel` has fired.
///
/// Long walks call this once per container.
pub(crate) fn checkpoint(cancel: Option<&CancellationToken>) -> Result<(), Cancelled> {
    match cancel {
        Some(cancel) if cancel.is_cancelled() => Err(Cancelled),
        _ => Ok(()),
    }
}

/// Runtime shared by every task handle. Task functions run on its blocking
/// pool; its workers only schedule them.
fn runtime() -> Result<&'static Runtime, TaskError> {
    static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            Builder::new_multi_thread()
                .worker_threads(WORKER_THREADS)
                .thread_name("jcmp-task")
                .enable_time()
                .build()
                .map_err(|err| err.to_string())
        })
        .as_ref()
        .map_err(|message| TaskError::Execution { message: message.clone() })
}

/// Result of one invocation, delivered exactly once.
///
/// The blocking accessors must not be called from inside an async runtime.
#[derive(Debug)]
pub struct Pending<R> {
    rx: Option<oneshot::Receiver<Result<R, TaskError>>>,
}

impl<R> Pending<R> {
    fn settled(result: Result<R, TaskError>) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is alive, so the send cannot fail.
        let _ = tx.send(result);
        Self { rx: Some(rx) }
    }

    /// Blocks until the invocation settles.
    pub fn wait(self) -> Result<R, TaskError> {
        match self.rx {
            Some(rx) => rx.blocking_recv().unwrap_or(Err(TaskError::Cancelled)),
            None => Err(TaskError::Cancelled),
        }
    }

    /// Blocks for up to `timeout`; `None` means still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<R, TaskError>> {
        let Some(rx) = self.rx.as_mut() else {
            return Some(Err(TaskError::Cancelled));
        };
        let runtime = match runtime() {
            Ok(runtime) => runtime,
            Err(err) => return Some(Err(err)),
        };
        let received = runtime.block_on(async { tokio::time::timeout(timeout, rx).await }).ok()?;
        self.rx = None;
        Some(received.unwrap_or(Err(TaskError::Cancelled)))
    }

    /// Returns the result if the invocation has already settled.
    pub fn try_take(&mut self) -> Option<Result<R, TaskError>> {
        let rx = self.rx.as_mut()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(TaskError::Cancelled),
        };
        self.rx = None;
        Some(result)
    }
}

type TaskFn<D, A, R> = Arc<dyn Fn(&D, A, &CancellationToken) -> Result<R, String> + Send + Sync>;

#[derive(Debug, Default)]
struct TaskState {
    status: TaskStatus,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Handle around a function that runs off the calling thread.
///
/// `D` holds the dependencies captured at creation; each invocation receives a
/// clone of them. `A` is the per-invocation argument and `R` the result.
/// Killing or superseding an invocation cancels the [`CancellationToken`] it
/// was handed; functions that poll it stop early.
pub struct Task<D, A, R> {
    name: String,
    deps: D,
    run: TaskFn<D, A, R>,
    state: Arc<Mutex<TaskState>>,
}

impl<A, R> Task<(), A, R> {
    /// Wraps a function without dependencies.
    pub fn new<F, E>(run: F) -> Self
    where
        F: Fn(A, &CancellationToken) -> Result<R, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self::with_deps((), move |_: &(), args, cancel: &CancellationToken| run(args, cancel))
    }
}

impl<D, A, R> Task<D, A, R> {
    /// Wraps a function together with the dependencies it is allowed to use.
    ///
    /// ```
    /// use jsoncompare_core::Task;
    ///
    /// let scale = Task::with_deps(10_u32, |factor: &u32, n: u32, _cancel: &_| Ok::<_, String>(n * factor));
    /// assert_eq!(scale.invoke(4).wait()?, 40);
    /// # Ok::<(), jsoncompare_core::TaskError>(())
    /// ```
    pub fn with_deps<F, E>(deps: D, run: F) -> Self
    where
        F: Fn(&D, A, &CancellationToken) -> Result<R, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let run: TaskFn<D, A, R> = Arc::new(move |deps: &D, args, cancel: &CancellationToken| {
            run(deps, args, cancel).map_err(|err| err.to_string())
        });
        Self { name: "task".to_owned(), deps, run, state: Arc::default() }
    }

    /// Sets the name used in log events.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name of this handle.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.lock_state().status
    }

    /// Cancels the outstanding invocation, if any, and returns to idle.
    pub fn kill(&self) {
        let mut state = self.lock_state();
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
            debug!(task = %self.name, generation = state.generation, "killed invocation");
        }
        state.generation += 1;
        state.status = TaskStatus::Idle;
    }

    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D, A, R> Task<D, A, R>
where
    D: Clone + Send + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    /// Starts a new invocation, voiding the outstanding one.
    pub fn invoke(&self, args: A) -> Pending<R> {
        self.invoke_after(Duration::ZERO, args)
    }

    /// Starts a new invocation that waits `delay` before running.
    ///
    /// Invoking again within `delay` supersedes this one before it runs, which
    /// debounces bursts of calls.
    pub fn invoke_after(&self, delay: Duration, args: A) -> Pending<R> {
        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.lock_state();
            if let Some(previous) = state.cancel.replace(cancel.clone()) {
                previous.cancel();
                debug!(task = %self.name, generation = state.generation, "superseded invocation");
            }
            state.generation += 1;
            state.status = TaskStatus::Running;
            state.generation
        };

        let runtime = match runtime() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(task = %self.name, error = %err, "task runtime is unavailable");
                let mut state = self.lock_state();
                if state.generation == generation {
                    state.status = TaskStatus::Error;
                    state.cancel = None;
                }
                return Pending::settled(Err(err));
            }
        };

        let (tx, rx) = oneshot::channel();
        let deps = self.deps.clone();
        let run = Arc::clone(&self.run);
        let state = Arc::clone(&self.state);
        let name = self.name.clone();

        runtime.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            debug!(task = %name, generation, "invocation started");
            let token = cancel.clone();
            let outcome = tokio::task::spawn_blocking(move || run(&deps, args, &token)).await;
            let result = match outcome {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(TaskError::Execution { message }),
                Err(err) if err.is_panic() => {
                    Err(TaskError::Execution { message: panic_message(err.into_panic().as_ref()) })
                }
                Err(err) => Err(TaskError::Execution { message: err.to_string() }),
            };

            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation != generation {
                debug!(task = %name, generation, "discarding stale result");
                return;
            }
            state.status = if result.is_ok() { TaskStatus::Success } else { TaskStatus::Error };
            state.cancel = None;
            // Delivering under the state lock keeps `kill` from racing the send.
            let _ = tx.send(result);
        });
        Pending { rx: Some(rx) }
    }
}

impl<D, A, R> fmt::Debug for Task<D, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("status", &state.status)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compare_cancellable, Algorithm, DiffError, HashCache};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    const LONG: Duration = Duration::from_secs(10);

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + LONG;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    /// Returns `n` at once, except `0`, which blocks until cancelled.
    fn blocking() -> Task<(), u32, u32> {
        Task::new(|n: u32, cancel: &CancellationToken| {
            if n == 0 {
                wait_for(|| cancel.is_cancelled());
            }
            Ok::<_, String>(n)
        })
    }

    #[test]
    fn delivers_value_and_marks_success() {
        let task = blocking();
        assert_eq!(task.status(), TaskStatus::Idle);
        assert_eq!(task.invoke(7).wait(), Ok(7));
        assert_eq!(task.status(), TaskStatus::Success);
    }

    #[test]
    fn kill_then_reinvoke_observes_only_second_result() {
        let task = blocking();
        let first = task.invoke(0);
        assert_eq!(task.status(), TaskStatus::Running);
        task.kill();
        assert_eq!(task.status(), TaskStatus::Idle);
        let second = task.invoke(5);
        assert_eq!(first.wait(), Err(TaskError::Cancelled));
        assert_eq!(second.wait(), Ok(5));
    }

    #[test]
    fn new_invocation_supersedes_running_one() {
        let task = blocking();
        let first = task.invoke(0);
        let second = task.invoke(3);
        assert_eq!(second.wait(), Ok(3));
        assert_eq!(first.wait(), Err(TaskError::Cancelled));
    }

    #[test]
    fn debounced_burst_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = Task::with_deps(Arc::clone(&runs), |runs: &Arc<AtomicUsize>, n: u32, _: &CancellationToken| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(n)
        });
        let delay = Duration::from_millis(200);
        let first = task.invoke_after(delay, 1);
        let second = task.invoke_after(delay, 2);
        let third = task.invoke_after(delay, 3);
        assert_eq!(third.wait(), Ok(3));
        assert_eq!(first.wait(), Err(TaskError::Cancelled));
        assert_eq!(second.wait(), Err(TaskError::Cancelled));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn errors_become_execution_errors() {
        let task = Task::new(|_: (), _: &CancellationToken| Err::<(), _>("boom"));
        assert_eq!(task.invoke(()).wait(), Err(TaskError::Execution { message: "boom".into() }));
        assert_eq!(task.status(), TaskStatus::Error);
    }

    #[test]
    fn panics_become_execution_errors() {
        let task = Task::new(|_: (), _: &CancellationToken| -> Result<(), String> { panic!("kaboom") });
        match task.invoke(()).wait() {
            Err(TaskError::Execution { message }) => assert!(message.contains("kaboom")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(task.status(), TaskStatus::Error);
    }

    #[test]
    fn pending_can_be_polled() {
        let task = blocking();
        let mut pending = task.invoke(0);
        assert!(pending.try_take().is_none());
        assert!(pending.wait_timeout(Duration::from_millis(20)).is_none());
        task.kill();
        assert_eq!(pending.wait_timeout(LONG), Some(Err(TaskError::Cancelled)));
    }

    #[test]
    fn settled_result_is_taken_once() {
        let task = blocking();
        let mut pending = task.invoke(4);
        assert_eq!(pending.wait_timeout(LONG), Some(Ok(4)));
        assert_eq!(pending.try_take(), Some(Err(TaskError::Cancelled)));
    }

    #[test]
    fn kill_stops_the_running_function() {
        let stopped = Arc::new(AtomicBool::new(false));
        let task = Task::with_deps(Arc::clone(&stopped), |stopped: &Arc<AtomicBool>, (), cancel: &CancellationToken| {
            if wait_for(|| cancel.is_cancelled()) {
                stopped.store(true, Ordering::SeqCst);
            }
            Ok::<_, String>(())
        });
        let pending = task.invoke(());
        task.kill();
        assert_eq!(pending.wait(), Err(TaskError::Cancelled));
        assert!(wait_for(|| stopped.load(Ordering::SeqCst)));
    }

    fn wide_document(width: usize) -> Value {
        Value::Array((0..width).map(|i| json!({"id": i, "tags": ["x", "y"], "inner": {"n": i}})).collect())
    }

    #[test]
    fn killed_diff_abandons_large_documents() {
        let outcome: Arc<Mutex<Option<Result<bool, DiffError>>>> = Arc::default();
        let started = Arc::new(AtomicBool::new(false));
        let task = Task::with_deps(
            (Arc::clone(&outcome), Arc::clone(&started)),
            |(outcome, started): &(Arc<Mutex<Option<Result<bool, DiffError>>>>, Arc<AtomicBool>),
             (lhs, rhs): (Value, Value),
             cancel: &CancellationToken| {
                started.store(true, Ordering::SeqCst);
                wait_for(|| cancel.is_cancelled());
                let result = compare_cancellable(&lhs, &rhs, Algorithm::Structural, &HashCache::default(), cancel);
                *outcome.lock().unwrap() = Some(result.map(|diff| diff.is_some()));
                Ok::<_, String>(())
            },
        );

        let pending = task.invoke((wide_document(50_000), wide_document(50_001)));
        assert!(wait_for(|| started.load(Ordering::SeqCst)));
        task.kill();
        assert_eq!(pending.wait(), Err(TaskError::Cancelled));
        assert!(wait_for(|| outcome.lock().unwrap().is_some()));
        assert_eq!(*outcome.lock().unwrap(), Some(Err(DiffError::Cancelled(Cancelled))));
    }
}
