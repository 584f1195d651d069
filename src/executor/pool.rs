use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, error, info_span, warn, Instrument};

use super::{CallbackKind, WrappedCallback};
use crate::config::ExecutorConfig;
use crate::error::CallbackError;
use crate::events::{ErrorEvent, Event};

struct ExecutorInner {
    handle: Handle,
    workers: Arc<Semaphore>,
    worker_threads: usize,
    slow_start: Duration,
    slow_exec: Duration,
    in_flight: AtomicUsize,
    idle: Notify,
    closed: AtomicBool,
}

/// Counts a submitted callback until it has finished.
struct InFlight(Arc<ExecutorInner>);

impl InFlight {
    fn new(inner: Arc<ExecutorInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Runs wrapped callbacks off the dispatching task.
///
/// At most `worker_threads` sync callbacks run at once; further submissions
/// queue for a worker. Cloning shares the same pool.
#[derive(Clone)]
pub struct CallbackExecutor {
    inner: Arc<ExecutorInner>,
}

impl CallbackExecutor {
    pub fn new(config: &ExecutorConfig, handle: Handle) -> Self {
        let worker_threads = config.worker_threads.max(1);
        Self {
            inner: Arc::new(ExecutorInner {
                handle,
                workers: Arc::new(Semaphore::new(worker_threads)),
                worker_threads,
                slow_start: config.slow_start(),
                slow_exec: config.slow_exec(),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.inner.worker_threads
    }

    /// Callbacks queued or running.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Schedule `callback` for `event`.
    ///
    /// `on_error` is invoked with the error event to publish when the
    /// callback fails, unless `event` is itself an error event. Returns
    /// `false` if the executor has been shut down.
    pub fn submit<F>(&self, callback: &WrappedCallback, event: Arc<Event>, on_error: F) -> bool
    where
        F: FnOnce(ErrorEvent) + Send + 'static,
    {
        if self.is_closed() {
            debug!("Executor closed, dropping call to {}", callback.name());
            return false;
        }

        let guard = InFlight::new(self.inner.clone());
        let name = callback.name().to_string();
        let submitted = Instant::now();

        match callback.kind().clone() {
            CallbackKind::Sync(f) => {
                let inner = self.inner.clone();
                let warn_too_long = callback.warn_too_long();
                self.inner.handle.spawn(async move {
                    let _guard = guard;
                    let permit = match inner.workers.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return,
                    };
                    let task_name = name.clone();
                    let task_event = event.clone();
                    let joined = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        let span = info_span!("callback", name = %task_name);
                        let _enter = span.enter();

                        let waited = submitted.elapsed();
                        if waited > inner.slow_start {
                            warn!(
                                "Starting of {} took too long: {:.2}s. Maybe there are not enough threads?",
                                task_name,
                                waited.as_secs_f64()
                            );
                        }

                        let started = Instant::now();
                        let result = match catch_unwind(AssertUnwindSafe(|| f(&task_event))) {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(report)) => Err(CallbackError::from_report(&task_name, &report)),
                            Err(payload) => Err(CallbackError::from_panic(&task_name, payload)),
                        };

                        let took = started.elapsed();
                        if result.is_ok() && warn_too_long && took > inner.slow_exec {
                            warn!(
                                "Execution of {} took too long: {:.2}s",
                                task_name,
                                took.as_secs_f64()
                            );
                        }
                        result
                    })
                    .await;

                    match joined {
                        Ok(result) => finish(result, &event, on_error),
                        Err(e) => debug!("Worker for {} did not complete: {}", name, e),
                    }
                });
            }
            CallbackKind::Async(f) => {
                let span = info_span!("callback", name = %name);
                self.inner.handle.spawn(
                    async move {
                        let _guard = guard;
                        let call = AssertUnwindSafe(async { f((*event).clone()).await });
                        let result = match call.catch_unwind().await {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(report)) => Err(CallbackError::from_report(&name, &report)),
                            Err(payload) => Err(CallbackError::from_panic(&name, payload)),
                        };
                        finish(result, &event, on_error);
                    }
                    .instrument(span),
                );
            }
        }
        true
    }

    /// Resolve once no callback is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting work and wait for queued callbacks to finish.
    pub async fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("Draining {} callback(s)", self.in_flight());
        }
        self.wait_idle().await;
    }
}

/// Log a failure and hand it to `on_error`.
fn finish<F>(result: Result<(), CallbackError>, event: &Event, on_error: F)
where
    F: FnOnce(ErrorEvent),
{
    let err = match result {
        Ok(()) => return,
        Err(err) => err,
    };

    error!("Error in {}: {}", err.name, err.description);
    for line in err.trace_lines() {
        error!("{}", line);
    }

    // An error event listener failing must not produce another error event
    if event.is_error() {
        return;
    }
    on_error(ErrorEvent {
        source_name: err.name,
        error_description: err.description,
        formatted_trace: err.trace,
    });
}
