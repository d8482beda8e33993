// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process engine transport.
//
// The engine entry point runs on its own thread and talks to the host through
// two queues: a bounded command mailbox (host -> engine) and an unbounded
// response queue (engine -> host). A full mailbox is reported to the session,
// which turns it into a -1 status. Stopping the transport closes the mailbox
// and joins the engine thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

use millbridge_core::config::EngineConfig;
use millbridge_core::error::{BridgeError, Result};

use crate::session::EngineSession;
use crate::traits::EngineTransport;

/// An embedded engine's main loop.
///
/// `run` should read commands from `io` until it sees the quit command or
/// `recv` returns `None`, then return.
pub trait EngineMain: Send + 'static {
    fn run(self: Box<Self>, io: EngineIo);
}

/// The engine thread's end of the mailbox.
pub struct EngineIo {
    commands: Receiver<String>,
    responses: Sender<String>,
}

impl EngineIo {
    /// Block until the host sends a command. `None` once the host hangs up.
    pub fn recv(&self) -> Option<String> {
        self.commands.recv().ok()
    }

    /// Publish one line of output. Returns `false` if the host is gone.
    pub fn emit(&self, line: impl Into<String>) -> bool {
        self.responses.send(line.into()).is_ok()
    }
}

type MainFactory = Arc<dyn Fn() -> Box<dyn EngineMain> + Send + Sync>;

struct RunningEngine {
    commands: Sender<String>,
    responses: Receiver<String>,
    thread: JoinHandle<()>,
}

/// Transport that hosts an `EngineMain` on a dedicated thread.
pub struct InProcessTransport {
    factory: MainFactory,
    capacity: usize,
    running: Option<RunningEngine>,
}

/// Engine proxy backed by an in-process engine thread.
pub type InProcessEngine = EngineSession<InProcessTransport>;

impl InProcessTransport {
    pub fn new<F, M>(capacity: usize, factory: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: EngineMain,
    {
        Self {
            factory: Arc::new(move || Box::new(factory()) as Box<dyn EngineMain>),
            capacity,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

/// Build an in-process engine proxy from config and an entry-point factory.
pub fn in_process_engine<F, M>(config: &EngineConfig, factory: F) -> InProcessEngine
where
    F: Fn() -> M + Send + Sync + 'static,
    M: EngineMain,
{
    EngineSession::new(InProcessTransport::new(config.mailbox_capacity, factory), config)
}

impl EngineTransport for InProcessTransport {
    fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            // Left over from a session that never stopped cleanly.
            self.stop()?;
        }

        let (command_tx, command_rx) = crossbeam_channel::bounded(self.capacity);
        let (response_tx, response_rx) = crossbeam_channel::unbounded();
        let main = (self.factory)();
        let io = EngineIo {
            commands: command_rx,
            responses: response_tx,
        };

        let thread = thread::Builder::new()
            .name("engine-main".into())
            .spawn(move || {
                debug!("engine think thread enter");
                main.run(io);
                debug!("engine think thread exit");
            })
            .map_err(|e| BridgeError::engine_raised(format!("failed to spawn engine thread: {e}")))?;

        self.running = Some(RunningEngine {
            commands: command_tx,
            responses: response_rx,
            thread,
        });
        Ok(())
    }

    fn push_line(&mut self, line: &str) -> Result<bool> {
        let running = self.running.as_ref().ok_or(BridgeError::EngineNotReady)?;
        match running.commands.try_send(line.to_string()) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => {
                Err(BridgeError::engine_raised("engine thread has exited"))
            }
        }
    }

    fn pop_line(&mut self) -> Result<Option<String>> {
        let running = self.running.as_ref().ok_or(BridgeError::EngineNotReady)?;
        match running.responses.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        // Closing the mailbox unblocks an engine still waiting in `recv`.
        drop(running.commands);
        drop(running.responses);

        running.thread.join().map_err(|_| {
            warn!("engine thread panicked");
            BridgeError::engine_raised("engine thread panicked")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::traits::EngineProxy;

    /// Minimal UCI-ish engine: answers the handshake, isready, and go.
    struct TinyMill;

    impl EngineMain for TinyMill {
        fn run(self: Box<Self>, io: EngineIo) {
            while let Some(cmd) = io.recv() {
                match cmd.as_str() {
                    "uci" => {
                        io.emit("id name tinymill");
                        io.emit("uciok");
                    }
                    "isready" => {
                        io.emit("readyok");
                    }
                    "quit" => break,
                    other if other.starts_with("go") => {
                        io.emit("bestmove a1");
                    }
                    _ => {}
                }
            }
        }
    }

    /// Engine that is too busy to read its mailbox for a while.
    struct Stalled;

    impl EngineMain for Stalled {
        fn run(self: Box<Self>, io: EngineIo) {
            std::thread::sleep(Duration::from_millis(200));
            while io.recv().is_some() {}
        }
    }

    fn read_until(engine: &mut InProcessEngine, wanted: &str) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while Instant::now() < deadline {
            let line = engine.read().expect("read");
            if line.is_empty() {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
            let done = line.contains(wanted);
            seen.push(line);
            if done {
                return seen;
            }
        }
        panic!("timed out waiting for {wanted:?}; saw {seen:?}");
    }

    #[test]
    fn handshake_and_search_round_trip() {
        let mut engine = in_process_engine(&EngineConfig::default(), || TinyMill);
        assert_eq!(engine.startup().unwrap(), 0);

        let lines = read_until(&mut engine, "uciok");
        assert_eq!(lines, vec!["id name tinymill", "uciok"]);

        assert_eq!(engine.send("go depth 4").unwrap(), 0);
        assert!(engine.is_thinking().unwrap());
        read_until(&mut engine, "bestmove");
        assert!(engine.is_ready().unwrap());

        assert_eq!(engine.shutdown().unwrap(), 0);
        assert!(!engine.transport().is_running());
    }

    #[test]
    fn restart_spawns_a_fresh_engine_thread() {
        let mut engine = in_process_engine(&EngineConfig::default(), || TinyMill);
        engine.startup().unwrap();
        engine.shutdown().unwrap();

        engine.startup().unwrap();
        read_until(&mut engine, "uciok");
        engine.shutdown().unwrap();
    }

    #[test]
    fn full_mailbox_returns_minus_one() {
        let config = EngineConfig {
            mailbox_capacity: 1,
            handshake: None,
            ..Default::default()
        };
        let mut engine = in_process_engine(&config, || Stalled);
        engine.startup().unwrap();

        assert_eq!(engine.send("position startpos").unwrap(), 0);
        let mut statuses = Vec::new();
        for _ in 0..50 {
            statuses.push(engine.send("isready").unwrap());
        }
        assert!(statuses.contains(&-1), "mailbox never filled: {statuses:?}");
        engine.shutdown().unwrap();
    }
}
