// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge lifecycle: Uninitialized -> Running -> Draining -> Stopped.
//
// `EngineBridge` owns the queue, the worker and the backpressure counter.
// Every state change happens under one mutex; waiting for the worker during
// teardown happens outside it so callers never block on a slow engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use millbridge_core::config::BridgeConfig;
use millbridge_core::error::{BridgeError, Result};
use millbridge_core::types::{BridgeState, Command, CommandKind, RequestId, ResponseValue};
use millbridge_engine::EngineFactory;

use crate::completion::{Completion, CompletionReceiver, PendingRequest};
use crate::counter::DroppedResponses;
use crate::queue::{CommandQueue, Rejection};
use crate::router::ResponseRouter;
use crate::worker::Worker;

/// How a call to [`EngineBridge::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// The bridge was not running; nothing to do.
    NotRunning,
    /// Every accepted command completed before the worker exited.
    Drained,
    /// The teardown timeout elapsed. `discarded` queued commands were
    /// dropped without a result.
    TimedOut { discarded: usize },
}

impl TeardownOutcome {
    pub fn is_clean(self) -> bool {
        !matches!(self, TeardownOutcome::TimedOut { .. })
    }
}

struct Inner {
    state: BridgeState,
    queue: Option<Arc<CommandQueue>>,
    worker: Option<Worker>,
    /// Worker left behind by a timed-out teardown, still inside an engine
    /// call. No new engine is built until it has exited.
    abandoned: Option<Worker>,
    router: ResponseRouter,
}

/// Cross-thread command bridge in front of a single-threaded engine.
pub struct EngineBridge {
    config: BridgeConfig,
    factory: Arc<dyn EngineFactory>,
    inner: Mutex<Inner>,
}

impl EngineBridge {
    /// Create an uninitialized bridge. No thread or engine exists until
    /// [`start`](Self::start).
    pub fn new(config: BridgeConfig, factory: Arc<dyn EngineFactory>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            inner: Mutex::new(Inner {
                state: BridgeState::Uninitialized,
                queue: None,
                worker: None,
                abandoned: None,
                router: ResponseRouter::new(DroppedResponses::new()),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> BridgeState {
        self.lock().state
    }

    /// Bring the bridge to Running.
    ///
    /// A no-op when already running. From Stopped this re-creates the
    /// worker, the engine and the counter. Fails with `NotReady` while a
    /// teardown is in progress, or while the worker abandoned by a timed-out
    /// teardown is still inside its last engine call.
    #[instrument(skip(self), fields(worker = %self.config.worker_thread_name))]
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            BridgeState::Running => {
                debug!("bridge already running");
                return Ok(());
            }
            BridgeState::Draining => return Err(BridgeError::NotReady(BridgeState::Draining)),
            BridgeState::Uninitialized | BridgeState::Stopped => {}
        }

        if let Some(old) = inner.abandoned.take() {
            if !old.has_exited() {
                warn!("previous worker is still inside an engine call");
                inner.abandoned = Some(old);
                return Err(BridgeError::NotReady(inner.state));
            }
            old.join();
        }

        let engine = self.factory.create()?;
        let queue = Arc::new(CommandQueue::new(self.config.queue_bound));
        let router = ResponseRouter::new(DroppedResponses::new());
        let worker = Worker::spawn(
            &self.config.worker_thread_name,
            engine,
            Arc::clone(&queue),
            router.clone(),
        )?;

        inner.queue = Some(queue);
        inner.worker = Some(worker);
        inner.router = router;
        inner.state = BridgeState::Running;
        info!(queue_bound = ?self.config.queue_bound, "bridge running");
        Ok(())
    }

    /// Enqueue `command`; its result will be delivered through `completion`.
    ///
    /// Never blocks. On rejection the completion has already been resolved
    /// with the same error that is returned here.
    pub fn submit(&self, command: Command, completion: Completion) -> Result<RequestId> {
        let id = command.id();
        let request = PendingRequest {
            command,
            completion,
        };

        let refused = if request.command.kind() == CommandKind::Send
            && request.command.payload().is_none()
        {
            let rejection = Rejection::InvalidArgument("send requires a command string".into());
            let router = self.lock().router.clone();
            Some((rejection, request, router))
        } else {
            let inner = self.lock();
            match (&inner.queue, inner.state) {
                (Some(queue), BridgeState::Running) => match queue.push(request) {
                    Ok(()) => None,
                    Err((rejection, request)) => Some((rejection, request, inner.router.clone())),
                },
                (_, state) => Some((Rejection::NotReady(state), request, inner.router.clone())),
            }
        };

        // Rejected completions run here, after the lock is released, so a
        // callback may safely call back into the bridge.
        match refused {
            None => {
                debug!(request = %id, "command enqueued");
                Ok(id)
            }
            Some((rejection, request, router)) => {
                router.reject(request, &rejection);
                Err(rejection.to_error())
            }
        }
    }

    /// Enqueue `command` and get a receiver for its result.
    pub fn call(&self, command: Command) -> Result<CompletionReceiver> {
        let (completion, receiver) = Completion::channel();
        self.submit(command, completion)?;
        Ok(receiver)
    }

    pub async fn startup(&self) -> Result<i32> {
        status(CommandKind::Startup, self.call(Command::startup())?.wait().await?)
    }

    pub async fn send(&self, command: impl Into<String>) -> Result<i32> {
        status(CommandKind::Send, self.call(Command::send(command))?.wait().await?)
    }

    pub async fn read(&self) -> Result<String> {
        match self.call(Command::read())?.wait().await? {
            ResponseValue::Text(text) => Ok(text),
            other => Err(unexpected(CommandKind::Read, &other)),
        }
    }

    pub async fn shutdown(&self) -> Result<i32> {
        status(CommandKind::Shutdown, self.call(Command::shutdown())?.wait().await?)
    }

    pub async fn is_ready(&self) -> Result<bool> {
        flag(CommandKind::IsReady, self.call(Command::is_ready())?.wait().await?)
    }

    pub async fn is_thinking(&self) -> Result<bool> {
        flag(CommandKind::IsThinking, self.call(Command::is_thinking())?.wait().await?)
    }

    /// Responses produced but never delivered since the bridge was last
    /// (re)created. Answered directly, without going through the worker.
    pub fn dropped_response_count(&self) -> u64 {
        self.lock().router.dropped().get()
    }

    /// Tear the bridge down: stop accepting, let queued work finish for up
    /// to the configured timeout, then discard whatever is left.
    #[instrument(skip(self), fields(timeout_ms = self.config.teardown_timeout_ms))]
    pub fn stop(&self) -> TeardownOutcome {
        let (queue, worker) = {
            let mut inner = self.lock();
            if inner.state != BridgeState::Running {
                return TeardownOutcome::NotRunning;
            }
            let (Some(queue), Some(worker)) = (inner.queue.take(), inner.worker.take()) else {
                inner.state = BridgeState::Stopped;
                return TeardownOutcome::NotRunning;
            };
            inner.state = BridgeState::Draining;
            (queue, worker)
        };

        info!(queued = queue.len(), "bridge draining");
        queue.close();

        let (outcome, abandoned) = if worker.wait(self.config.teardown_timeout()) {
            worker.join();
            (TeardownOutcome::Drained, None)
        } else {
            worker.abandon();
            // Dropping the requests drops their completions unresolved.
            let discarded = queue.drain().len();
            warn!(discarded, "teardown timed out, queued commands discarded");
            (TeardownOutcome::TimedOut { discarded }, Some(worker))
        };

        let mut inner = self.lock();
        inner.state = BridgeState::Stopped;
        inner.abandoned = abandoned;
        drop(inner);
        info!(?outcome, "bridge stopped");
        outcome
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn status(kind: CommandKind, value: ResponseValue) -> Result<i32> {
    value.as_status().ok_or_else(|| unexpected(kind, &value))
}

fn flag(kind: CommandKind, value: ResponseValue) -> Result<bool> {
    value.as_flag().ok_or_else(|| unexpected(kind, &value))
}

fn unexpected(kind: CommandKind, value: &ResponseValue) -> BridgeError {
    BridgeError::engine_raised(format!("unexpected {kind} response: {value:?}"))
}
