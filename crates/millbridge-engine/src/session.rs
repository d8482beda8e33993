// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine session: the startup/shutdown protocol and thinking/ready tracking
// shared by every line-oriented transport.
//
// Lifecycle:
//   Idle --startup--> Started --shutdown--> ShutDown --startup--> Started
//
// Anything other than `startup` outside `Started` is refused with
// `EngineNotReady` (or `AlreadyShutDown` for a repeated shutdown).

use tracing::{debug, info, warn};

use millbridge_core::config::EngineConfig;
use millbridge_core::error::{BridgeError, Result};

use crate::traits::{EngineProxy, EngineTransport};

/// Output markers that mean the engine has finished what it was doing.
const READY_MARKERS: [&str; 4] = ["readyok", "uciok", "bestmove", "nobestmove"];

/// Prefix of the command that starts a search.
const THINK_PREFIX: &str = "go";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Started,
    ShutDown,
}

/// What the engine is doing, as far as its I/O tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Ready,
    Thinking,
}

/// `EngineProxy` implementation over any `EngineTransport`.
pub struct EngineSession<T: EngineTransport> {
    transport: T,
    handshake: Option<String>,
    quit_command: String,
    state: SessionState,
    activity: Activity,
}

impl<T: EngineTransport> EngineSession<T> {
    pub fn new(transport: T, config: &EngineConfig) -> Self {
        Self {
            transport,
            handshake: config.handshake.clone(),
            quit_command: config.quit_command.clone(),
            state: SessionState::Idle,
            activity: Activity::Ready,
        }
    }

    /// Access the underlying transport (tests and diagnostics).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn require_started(&self) -> Result<()> {
        match self.state {
            SessionState::Started => Ok(()),
            SessionState::Idle | SessionState::ShutDown => Err(BridgeError::EngineNotReady),
        }
    }

    /// Push a line and translate mailbox pressure into a status code.
    fn push(&mut self, line: &str) -> Result<i32> {
        if self.transport.push_line(line)? {
            if line.starts_with(THINK_PREFIX) {
                self.activity = Activity::Thinking;
            }
            debug!(">>> {line}");
            Ok(0)
        } else {
            warn!(command = line, "engine mailbox full, command not delivered");
            Ok(-1)
        }
    }
}

impl<T: EngineTransport> EngineProxy for EngineSession<T> {
    fn startup(&mut self) -> Result<i32> {
        if self.state == SessionState::Started {
            return Err(BridgeError::AlreadyStarted);
        }

        let previous = self.state;
        self.transport.start()?;
        self.state = SessionState::Started;
        self.activity = Activity::Ready;
        info!("engine started");

        if let Some(handshake) = self.handshake.clone() {
            match self.push(&handshake) {
                Ok(0) => {}
                Ok(status) => warn!(status, "engine handshake not delivered"),
                Err(e) => {
                    // Back out so a later startup can try again.
                    warn!(error = %e, "engine handshake failed, stopping transport");
                    if let Err(stop) = self.transport.stop() {
                        warn!(error = %stop, "transport stop after failed handshake");
                    }
                    self.state = previous;
                    return Err(e);
                }
            }
        }

        Ok(0)
    }

    fn send(&mut self, command: &str) -> Result<i32> {
        self.require_started()?;
        self.push(command)
    }

    fn read(&mut self) -> Result<String> {
        self.require_started()?;

        let Some(line) = self.transport.pop_line()? else {
            return Ok(String::new());
        };

        debug!("<<< {line}");
        if READY_MARKERS.iter().any(|marker| line.contains(marker)) {
            self.activity = Activity::Ready;
        }
        Ok(line)
    }

    fn shutdown(&mut self) -> Result<i32> {
        match self.state {
            SessionState::Idle => return Err(BridgeError::EngineNotReady),
            SessionState::ShutDown => return Err(BridgeError::AlreadyShutDown),
            SessionState::Started => {}
        }

        let quit = self.quit_command.clone();
        if let Err(e) = self.push(&quit) {
            warn!(error = %e, "could not send quit to engine, stopping anyway");
        }

        // The session is shut down even if stopping reports an error; the
        // transport has released what it could.
        let stopped = self.transport.stop();
        self.state = SessionState::ShutDown;
        self.activity = Activity::Ready;
        stopped?;

        info!("engine shut down");
        Ok(0)
    }

    fn is_ready(&mut self) -> Result<bool> {
        self.require_started()?;
        Ok(self.activity == Activity::Ready)
    }

    fn is_thinking(&mut self) -> Result<bool> {
        self.require_started()?;
        Ok(self.activity == Activity::Thinking)
    }
}

impl<T: EngineTransport> Drop for EngineSession<T> {
    fn drop(&mut self) {
        if self.state == SessionState::Started {
            if let Err(e) = self.shutdown() {
                warn!(error = %e, "engine shutdown on drop failed");
            }
        }
    }
}
