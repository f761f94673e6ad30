//! Delayed Callbacks
//!
//! A [`DelayedRunner`] runs callbacks after a delay on a dedicated
//! background thread driving a single-threaded tokio runtime. Scheduling
//! returns a [`DelayHandle`] that can cancel the callback until it fires.
//!
//! Callbacks run on the runner's thread, never on the thread owning a
//! document. To act on a document, a callback posts a closure to the
//! document's [`Mailbox`](crate::Mailbox), which the owning thread drains
//! with [`Document::process_posted`](crate::Document::process_posted).

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Errors raised when starting a runner.
#[derive(Debug, thiserror::Error)]
pub enum DelayError {
    #[error("failed to start the delay runtime: {0}")]
    Startup(#[from] std::io::Error),
}

/// Builder for [`DelayedRunner`].
#[derive(Debug, Clone)]
pub struct DelayedRunnerBuilder {
    thread_name: String,
}

impl Default for DelayedRunnerBuilder {
    fn default() -> Self {
        Self {
            thread_name: "panda-delay".to_string(),
        }
    }
}

impl DelayedRunnerBuilder {
    /// Name of the background thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Start the background thread.
    pub fn build(self) -> Result<DelayedRunner, DelayError> {
        let runtime = Builder::new_current_thread().enable_time().build()?;
        let handle = runtime.handle().clone();
        let (shutdown, stopped) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                // Pending timers are dropped with the runtime.
                runtime.block_on(async {
                    let _ = stopped.await;
                });
            })?;

        tracing::debug!(thread = %self.thread_name, "started delayed runner");
        Ok(DelayedRunner {
            handle,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

/// Runs callbacks after a delay on a background thread.
///
/// Dropping the runner stops the thread; callbacks that have not fired yet
/// never will.
pub struct DelayedRunner {
    handle: Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DelayedRunner {
    /// Start a runner with the default settings.
    pub fn new() -> Result<Self, DelayError> {
        Self::builder().build()
    }

    pub fn builder() -> DelayedRunnerBuilder {
        DelayedRunnerBuilder::default()
    }

    /// Run `callback` once `delay` has elapsed.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> DelayHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(PENDING));
        let task_state = Arc::clone(&state);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let fire = task_state
                .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
            if fire {
                callback();
            }
        });
        DelayHandle {
            state,
            abort: task.abort_handle(),
        }
    }
}

impl Drop for DelayedRunner {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("delayed runner thread panicked");
            }
        }
    }
}

impl fmt::Debug for DelayedRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedRunner")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// Handle to a scheduled callback.
#[derive(Debug, Clone)]
pub struct DelayHandle {
    state: Arc<AtomicU8>,
    abort: AbortHandle,
}

impl DelayHandle {
    /// Prevent the callback from running.
    ///
    /// Returns `true` if the callback was still pending. Cancelling after it
    /// fired, or twice, does nothing and returns `false`.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            self.abort.abort();
        }
        cancelled
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}
