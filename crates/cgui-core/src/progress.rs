//! Background step sequences with lock-light progress reporting.
//!
//! A [`ProgressSequence`] is a list of labelled steps that run, in order, on
//! a dedicated thread. The UI side polls a [`ProgressHandle`] once per frame;
//! counters and flags are atomics, the current label and error sit behind a
//! `parking_lot::Mutex`. Steps never touch the scene or window graph, both of
//! which are `!Send`.
//!
//! ```
//! use cgui_core::progress::ProgressSequence;
//!
//! let handle = ProgressSequence::new()
//!     .step("locate toolchain", |_| Ok(()))
//!     .step("index sources", |_| Ok(()))
//!     .start()
//!     .unwrap();
//!
//! handle.join().unwrap();
//! ```

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::error::ProgressError;
use crate::logging::targets;

/// Result returned by a step.
pub type StepResult = Result<(), Box<dyn Error + Send + Sync>>;

type StepFn = Box<dyn FnOnce(&StepContext) -> StepResult + Send>;

struct Step {
    label: String,
    run: StepFn,
}

/// State shared between the worker thread and its handles.
struct Shared {
    total: usize,
    completed: AtomicUsize,
    finished: AtomicBool,
    failed: AtomicBool,
    cancel_requested: AtomicBool,
    current: Mutex<Option<String>>,
    error: Mutex<Option<ProgressError>>,
}

/// Passed to each step so long-running steps can check for cancellation.
pub struct StepContext {
    shared: Arc<Shared>,
    index: usize,
}

impl StepContext {
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::Acquire)
    }

    /// Zero-based index of the running step.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// An ordered list of labelled steps.
#[derive(Default)]
pub struct ProgressSequence {
    name: Option<String>,
    steps: Vec<Step>,
}

impl ProgressSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the worker thread.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a step.
    pub fn step<F>(mut self, label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(&StepContext) -> StepResult + Send + 'static,
    {
        self.steps.push(Step {
            label: label.into(),
            run: Box::new(run),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Spawn the worker thread and start running steps.
    pub fn start(self) -> Result<ProgressHandle, ProgressError> {
        let shared = Arc::new(Shared {
            total: self.steps.len(),
            completed: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            current: Mutex::new(None),
            error: Mutex::new(None),
        });

        let name = self.name.unwrap_or_else(|| "cgui-progress".to_string());
        let worker_shared = Arc::clone(&shared);
        let steps = self.steps;
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || run_steps(&worker_shared, steps))?;

        Ok(ProgressHandle {
            shared,
            thread: Some(thread),
        })
    }
}

fn run_steps(shared: &Arc<Shared>, steps: Vec<Step>) {
    for (index, step) in steps.into_iter().enumerate() {
        if shared.cancel_requested.load(Ordering::Acquire) {
            tracing::debug!(target: targets::PROGRESS, completed = index, "sequence cancelled");
            *shared.error.lock() = Some(ProgressError::Cancelled { completed: index });
            shared.failed.store(true, Ordering::Release);
            break;
        }

        *shared.current.lock() = Some(step.label.clone());
        tracing::trace!(target: targets::PROGRESS, index, label = %step.label, "running step");

        let cx = StepContext {
            shared: Arc::clone(shared),
            index,
        };
        if let Err(err) = (step.run)(&cx) {
            tracing::warn!(target: targets::PROGRESS, label = %step.label, error = %err, "step failed");
            *shared.error.lock() = Some(ProgressError::StepFailed {
                label: step.label,
                message: err.to_string(),
            });
            shared.failed.store(true, Ordering::Release);
            break;
        }
        shared.completed.fetch_add(1, Ordering::AcqRel);
    }
    *shared.current.lock() = None;
    shared.finished.store(true, Ordering::Release);
}

/// Point-in-time view of a running sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    /// Label of the step currently running.
    pub current: Option<String>,
    pub finished: bool,
    pub failed: bool,
}

/// Handle to a running [`ProgressSequence`].
pub struct ProgressHandle {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressHandle {
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.shared.completed.load(Ordering::Acquire),
            total: self.shared.total,
            current: self.shared.current.lock().clone(),
            finished: self.shared.finished.load(Ordering::Acquire),
            failed: self.shared.failed.load(Ordering::Acquire),
        }
    }

    /// Completed steps over total steps, `1.0` for an empty sequence.
    pub fn fraction(&self) -> f32 {
        let total = self.shared.total;
        if total == 0 {
            return 1.0;
        }
        self.shared.completed.load(Ordering::Acquire) as f32 / total as f32
    }

    /// Ask the worker to stop before the next step.
    pub fn cancel(&self) {
        self.shared.cancel_requested.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Wait for the worker and report how the sequence ended.
    pub fn join(mut self) -> Result<(), ProgressError> {
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| ProgressError::Panicked)?;
        }
        match self.shared.error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel();
            let _ = thread.join();
        }
    }
}
