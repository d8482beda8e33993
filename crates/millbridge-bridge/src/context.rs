// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delivery contexts: where completions run.
//
// A caller names the context that must receive its result (usually the UI
// thread). The router posts a task there. A context that has been torn down
// refuses the post; the dropped task is then counted as undelivered.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Unit of work posted to a context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The target context no longer accepts work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextClosed;

impl std::fmt::Display for ContextClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("delivery context closed")
    }
}

impl std::error::Error for ContextClosed {}

/// An execution context that can run completion tasks.
pub trait DeliveryContext: Send + Sync {
    /// Hand `task` to the context. On `Err` the task has been dropped unrun.
    fn post(&self, task: Task) -> Result<(), ContextClosed>;
}

/// Runs completions directly on the bridge worker thread.
///
/// Only suitable for callers that never block and do not care which thread
/// they are called on.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerContext;

impl DeliveryContext for WorkerContext {
    fn post(&self, task: Task) -> Result<(), ContextClosed> {
        task();
        Ok(())
    }
}

/// A single-threaded event loop owned by the UI thread.
///
/// The owning thread drains posted tasks with `run_pending` or `run_next`.
/// Dropping the loop tears the context down: later posts fail, and tasks
/// still queued are dropped unrun.
pub struct EventLoop {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

/// Cloneable posting side of an `EventLoop`.
#[derive(Clone)]
pub struct EventLoopHandle {
    tx: Sender<Task>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> EventLoopHandle {
        EventLoopHandle { tx: self.tx.clone() }
    }

    /// Run every task already posted. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Wait up to `timeout` for one task and run it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Receiver side, for hosts that `select!` over several event sources.
    pub fn receiver(&self) -> &Receiver<Task> {
        &self.rx
    }
}

impl DeliveryContext for EventLoopHandle {
    fn post(&self, task: Task) -> Result<(), ContextClosed> {
        self.tx.send(task).map_err(|_| ContextClosed)
    }
}

/// Runs completions on a tokio runtime.
///
/// If the runtime has shut down the spawned task is dropped, which counts as
/// an undelivered response.
#[derive(Clone)]
pub struct TokioContext {
    handle: tokio::runtime::Handle,
}

impl TokioContext {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Context for the runtime the caller is currently inside.
    ///
    /// Panics outside a tokio runtime, like `Handle::current`.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl DeliveryContext for TokioContext {
    fn post(&self, task: Task) -> Result<(), ContextClosed> {
        self.handle.spawn(async move { task() });
        Ok(())
    }
}
