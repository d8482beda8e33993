// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The bridge worker, the only thread that ever touches the engine.
//
// Loop: take the next request, run it against the engine, route the result,
// repeat. One request at a time, in queue order. A panicking engine call is
// caught and turned into an engine failure for that request only; a panicking
// completion callback is logged and the loop carries on.
//
// Forced teardown sets `abort`: the worker then discards whatever it picks up
// (including the result of a call that was wedged when teardown gave up).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, debug_span, warn};

use millbridge_core::error::{BridgeError, Result};
use millbridge_core::types::{Command, CommandKind, CommandResult, ResponseValue};
use millbridge_engine::EngineProxy;

use crate::completion::PendingRequest;
use crate::queue::CommandQueue;
use crate::router::ResponseRouter;

/// Handle to the running worker thread.
pub(crate) struct Worker {
    abort: Arc<AtomicBool>,
    exited: Receiver<()>,
    thread: JoinHandle<()>,
}

impl Worker {
    /// Spawn the worker. It owns `engine` until it exits.
    pub(crate) fn spawn(
        name: &str,
        engine: Box<dyn EngineProxy>,
        queue: Arc<CommandQueue>,
        router: ResponseRouter,
    ) -> Result<Self> {
        let abort = Arc::new(AtomicBool::new(false));
        let (exited_tx, exited) = crossbeam_channel::bounded(1);

        let thread = {
            let abort = Arc::clone(&abort);
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run(engine, &queue, &router, &abort, exited_tx))
                .map_err(|e| BridgeError::WorkerSpawn(e.to_string()))?
        };

        Ok(Self {
            abort,
            exited,
            thread,
        })
    }

    /// Wait up to `timeout` for the worker to drain and exit.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Ok(()) => true,
            // Sender gone without a message: the thread died on its own.
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// Whether the thread has released its engine and is on its way out.
    pub(crate) fn has_exited(&self) -> bool {
        self.wait(Duration::ZERO)
    }

    /// Reap an exited worker.
    pub(crate) fn join(self) {
        if self.thread.join().is_err() {
            warn!("bridge worker panicked");
        }
    }

    /// Give up on the worker. It keeps running until its current engine
    /// call returns, then discards everything and exits on its own.
    pub(crate) fn abandon(&self) {
        self.abort.store(true, Ordering::Release);
    }
}

fn run(
    mut engine: Box<dyn EngineProxy>,
    queue: &CommandQueue,
    router: &ResponseRouter,
    abort: &AtomicBool,
    exited: Sender<()>,
) {
    debug!("bridge worker started");

    while let Some(PendingRequest {
        command,
        completion,
    }) = queue.next()
    {
        if abort.load(Ordering::Acquire) {
            queue.finish();
            debug!(request = %command.id(), "discarding request after forced teardown");
            continue;
        }

        let result = {
            let _span = debug_span!("engine_command", request = %command.id(), kind = %command.kind())
                .entered();
            execute(engine.as_mut(), &command)
        };
        queue.finish();

        if abort.load(Ordering::Acquire) {
            debug!(request = %command.id(), "discarding late result after forced teardown");
            continue;
        }
        let routed = panic::catch_unwind(AssertUnwindSafe(|| {
            router.route(completion, result);
        }));
        if let Err(payload) = routed {
            let message = panic_message(payload.as_ref());
            warn!(request = %command.id(), %message, "completion callback panicked");
        }
    }

    // Releasing the engine here keeps every engine call, including the
    // implicit shutdown on drop, on this thread.
    drop(engine);
    debug!("bridge worker exiting");
    let _ = exited.send(());
}

/// Run one command against the engine, converting every failure mode into
/// a `CommandResult` error.
pub(crate) fn execute(engine: &mut dyn EngineProxy, command: &Command) -> CommandResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(engine, command)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(kind = %command.kind(), %message, "engine call panicked");
            Err(BridgeError::engine_raised(format!("engine panicked: {message}")))
        });

    match &outcome {
        Ok(value) => debug!(?value, "engine call complete"),
        Err(e) => debug!(error = %e, "engine call failed"),
    }

    CommandResult {
        id: command.id(),
        kind: command.kind(),
        outcome,
    }
}

fn dispatch(engine: &mut dyn EngineProxy, command: &Command) -> Result<ResponseValue> {
    match command.kind() {
        CommandKind::Startup => status(engine.startup()?),
        CommandKind::Send => status(engine.send(command.payload().unwrap_or_default())?),
        CommandKind::Read => Ok(ResponseValue::Text(engine.read()?)),
        CommandKind::Shutdown => status(engine.shutdown()?),
        CommandKind::IsReady => Ok(ResponseValue::Flag(engine.is_ready()?)),
        CommandKind::IsThinking => Ok(ResponseValue::Flag(engine.is_thinking()?)),
    }
}

/// Negative native status codes are failures.
fn status(code: i32) -> Result<ResponseValue> {
    if code < 0 {
        Err(BridgeError::engine_status(code))
    } else {
        Ok(ResponseValue::Status(code))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine whose calls return canned values or panic on demand.
    struct Canned {
        send_status: i32,
        panic_on_read: bool,
    }

    impl EngineProxy for Canned {
        fn startup(&mut self) -> Result<i32> {
            Ok(0)
        }
        fn send(&mut self, _command: &str) -> Result<i32> {
            Ok(self.send_status)
        }
        fn read(&mut self) -> Result<String> {
            if self.panic_on_read {
                panic!("read exploded");
            }
            Ok("readyok".into())
        }
        fn shutdown(&mut self) -> Result<i32> {
            Err(BridgeError::AlreadyShutDown)
        }
        fn is_ready(&mut self) -> Result<bool> {
            Ok(true)
        }
        fn is_thinking(&mut self) -> Result<bool> {
            Ok(false)
        }
    }

    fn canned() -> Canned {
        Canned {
            send_status: 0,
            panic_on_read: false,
        }
    }

    #[test]
    fn values_map_to_the_right_variant() {
        let mut engine = canned();
        let r = execute(&mut engine, &Command::startup());
        assert_eq!(r.into_result().unwrap(), ResponseValue::Status(0));
        let r = execute(&mut engine, &Command::read());
        assert_eq!(r.into_result().unwrap(), ResponseValue::Text("readyok".into()));
        let r = execute(&mut engine, &Command::is_ready());
        assert_eq!(r.into_result().unwrap(), ResponseValue::Flag(true));
    }

    #[test]
    fn negative_status_becomes_engine_failure() {
        let mut engine = Canned {
            send_status: -1,
            ..canned()
        };
        let r = execute(&mut engine, &Command::send("go"));
        let err = r.into_result().unwrap_err();
        assert_eq!(err.status(), Some(-1));
    }

    #[test]
    fn engine_errors_pass_through() {
        let mut engine = canned();
        let r = execute(&mut engine, &Command::shutdown());
        assert!(matches!(r.into_result(), Err(BridgeError::AlreadyShutDown)));
    }

    #[test]
    fn panics_are_contained() {
        let mut engine = Canned {
            panic_on_read: true,
            ..canned()
        };
        let cmd = Command::read();
        let r = execute(&mut engine, &cmd);
        assert_eq!(r.id, cmd.id());
        match r.into_result() {
            Err(BridgeError::EngineFailure { status: None, message }) => {
                assert!(message.contains("read exploded"), "{message}");
            }
            other => panic!("expected engine failure, got {other:?}"),
        }
        // The engine is still usable afterwards.
        assert!(execute(&mut engine, &Command::is_ready()).is_ok());
    }
}
