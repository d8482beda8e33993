// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Completion handles, the caller's side of a request.
//
// A `Completion` is consumed by the first (and only) delivery, so a result
// can never be handed to a caller twice. Two flavours exist:
//
//   * `Callback`: a boxed `FnOnce` plus the context it must run on.
//   * `Channel`: a tokio oneshot sender for async callers.
//
// A callback posted to its context carries a guard. If the task is dropped
// without running (context refused it, or was torn down with the task still
// queued) the guard records one dropped response.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::warn;

use millbridge_core::error::{BridgeError, Result};
use millbridge_core::types::{Command, CommandResult, RequestId, ResponseValue};

use crate::context::DeliveryContext;
use crate::counter::DroppedResponses;

type Callback = Box<dyn FnOnce(CommandResult) + Send + 'static>;

/// How a request's result gets back to its caller.
pub enum Completion {
    /// Run `callback` on `context`.
    Callback {
        context: Arc<dyn DeliveryContext>,
        callback: Callback,
    },
    /// Send through a oneshot channel.
    Channel(oneshot::Sender<CommandResult>),
}

/// An accepted command and the completion that must receive its result.
pub struct PendingRequest {
    pub command: Command,
    pub completion: Completion,
}

impl Completion {
    /// Completion that runs `callback` on `context`.
    pub fn callback<F>(context: Arc<dyn DeliveryContext>, callback: F) -> Self
    where
        F: FnOnce(CommandResult) + Send + 'static,
    {
        Completion::Callback {
            context,
            callback: Box::new(callback),
        }
    }

    /// Completion paired with a receiver the caller can await.
    pub fn channel() -> (Self, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        (Completion::Channel(tx), CompletionReceiver { rx })
    }

    /// Hand `result` to the caller's context.
    ///
    /// Returns `false` if it could not be handed off; the failure has
    /// already been recorded in `dropped`.
    pub(crate) fn deliver(self, result: CommandResult, dropped: &DroppedResponses) -> bool {
        match self {
            Completion::Channel(tx) => match tx.send(result) {
                Ok(()) => true,
                Err(_) => {
                    dropped.record();
                    false
                }
            },
            Completion::Callback { context, callback } => {
                let mut delivery = Delivery {
                    id: result.id,
                    payload: Some((callback, result)),
                    dropped: dropped.clone(),
                };
                context
                    .post(Box::new(move || delivery.run()))
                    .is_ok()
            }
        }
    }

    /// Resolve on the current thread, bypassing the context.
    ///
    /// Used for enqueue-time rejections, where the submitting thread is the
    /// caller's context.
    pub(crate) fn resolve_inline(self, result: CommandResult) {
        match self {
            Completion::Channel(tx) => {
                let _ = tx.send(result);
            }
            Completion::Callback { callback, .. } => callback(result),
        }
    }
}

/// A posted callback that knows whether it ever ran.
struct Delivery {
    id: RequestId,
    payload: Option<(Callback, CommandResult)>,
    dropped: DroppedResponses,
}

impl Delivery {
    fn run(&mut self) {
        if let Some((callback, result)) = self.payload.take() {
            callback(result);
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.payload.is_some() {
            let total = self.dropped.record();
            warn!(request = %self.id, total, "response dropped, delivery context gone");
        }
    }
}

/// Async receiving end of a `Completion::channel`.
pub struct CompletionReceiver {
    rx: oneshot::Receiver<CommandResult>,
}

impl CompletionReceiver {
    /// Wait for the full result record.
    ///
    /// Fails with `Discarded` if the request was dropped by forced teardown.
    pub async fn recv(self) -> Result<CommandResult> {
        self.rx.await.map_err(|_| BridgeError::Discarded)
    }

    /// Wait for the result and flatten it to its value.
    pub async fn wait(self) -> Result<ResponseValue> {
        self.recv().await?.into_result()
    }

    /// Blocking variant of `wait` for non-async callers.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(self) -> Result<ResponseValue> {
        self.rx
            .blocking_recv()
            .map_err(|_| BridgeError::Discarded)?
            .into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::context::{EventLoop, WorkerContext};

    fn ok_result() -> CommandResult {
        CommandResult::ok(&Command::read(), ResponseValue::Text("uciok".into()))
    }

    #[test]
    fn channel_delivery_reaches_the_receiver() {
        let dropped = DroppedResponses::new();
        let (completion, rx) = Completion::channel();
        assert!(completion.deliver(ok_result(), &dropped));
        assert_eq!(rx.blocking_wait().unwrap(), ResponseValue::Text("uciok".into()));
        assert_eq!(dropped.get(), 0);
    }

    #[test]
    fn channel_with_no_receiver_counts_as_dropped() {
        let dropped = DroppedResponses::new();
        let (completion, rx) = Completion::channel();
        drop(rx);
        assert!(!completion.deliver(ok_result(), &dropped));
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn callback_runs_on_its_event_loop() {
        let dropped = DroppedResponses::new();
        let ui = EventLoop::new();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        let completion = Completion::callback(Arc::new(ui.handle()), move |r| {
            *s.lock().unwrap() = Some(r.is_ok());
        });

        assert!(completion.deliver(ok_result(), &dropped));
        assert!(seen.lock().unwrap().is_none(), "ran before the loop pumped");
        ui.run_pending();
        assert_eq!(*seen.lock().unwrap(), Some(true));
        assert_eq!(dropped.get(), 0);
    }

    #[test]
    fn closed_loop_counts_once() {
        let dropped = DroppedResponses::new();
        let ui = EventLoop::new();
        let handle = ui.handle();
        drop(ui);

        let completion = Completion::callback(Arc::new(handle), |_| panic!("must not run"));
        assert!(!completion.deliver(ok_result(), &dropped));
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn loop_torn_down_with_task_queued_counts_once() {
        let dropped = DroppedResponses::new();
        let ui = EventLoop::new();
        let completion = Completion::callback(Arc::new(ui.handle()), |_| panic!("must not run"));

        assert!(completion.deliver(ok_result(), &dropped));
        assert_eq!(dropped.get(), 0);
        drop(ui);
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn inline_resolution_skips_the_context() {
        let hit = Arc::new(Mutex::new(false));
        let h = Arc::clone(&hit);
        let completion = Completion::callback(Arc::new(WorkerContext), move |r| {
            assert!(!r.is_ok());
            *h.lock().unwrap() = true;
        });
        completion.resolve_inline(CommandResult::err(
            &Command::startup(),
            BridgeError::QueueOverflow { bound: 1 },
        ));
        assert!(*hit.lock().unwrap());
    }

    #[test]
    fn dropped_sender_reads_as_discarded() {
        let (completion, rx) = Completion::channel();
        drop(completion);
        assert!(matches!(rx.blocking_wait(), Err(BridgeError::Discarded)));
    }
}
