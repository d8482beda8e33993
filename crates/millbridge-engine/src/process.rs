// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External-process engine transport.
//
// Spawns the engine executable with piped stdin/stdout. A reader thread turns
// stdout into a queue of lines so `pop_line` never blocks. On stop, stdin is
// closed and the child gets `exit_grace` to leave on its own before it is
// killed. A `RunningProcess` that is dropped on any other path kills and
// reaps its child.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, instrument, warn};

use millbridge_core::config::EngineConfig;
use millbridge_core::error::{BridgeError, Result};

use crate::session::EngineSession;
use crate::traits::EngineTransport;

/// Poll interval while waiting for the child to exit.
const EXIT_POLL: Duration = Duration::from_millis(10);

struct RunningProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl Drop for RunningProcess {
    fn drop(&mut self) {
        // Already reaped on a clean stop; then both calls are no-ops.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Transport that talks to an engine executable over its standard streams.
pub struct ProcessTransport {
    program: PathBuf,
    args: Vec<String>,
    exit_grace: Duration,
    running: Option<RunningProcess>,
}

/// Engine proxy backed by an external engine process.
pub type ProcessEngine = EngineSession<ProcessTransport>;

impl ProcessTransport {
    pub fn new(program: impl AsRef<Path>, args: &[String], exit_grace: Duration) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: args.to_vec(),
            exit_grace,
            running: None,
        }
    }

    /// OS process id of the running engine, if any.
    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.child.id())
    }
}

/// Build a process engine proxy from config.
///
/// Returns `Config` if no program is configured.
pub fn process_engine(config: &EngineConfig) -> Result<ProcessEngine> {
    let program = config
        .program
        .as_ref()
        .ok_or_else(|| BridgeError::Config("engine.program is not set".into()))?;
    let transport = ProcessTransport::new(program, &config.args, config.exit_grace());
    Ok(EngineSession::new(transport, config))
}

impl EngineTransport for ProcessTransport {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            self.stop()?;
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::engine_raised("engine stdout not captured"))?;
        let stdin = child.stdin.take();

        let (tx, rx) = crossbeam_channel::unbounded();
        let spawned = thread::Builder::new()
            .name("engine-stdout".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("engine stdout closed");
            });
        let reader = match spawned {
            Ok(reader) => reader,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };

        info!(pid = child.id(), "engine process spawned");
        self.running = Some(RunningProcess {
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
        });
        Ok(())
    }

    fn push_line(&mut self, line: &str) -> Result<bool> {
        let running = self.running.as_mut().ok_or(BridgeError::EngineNotReady)?;
        let stdin = running
            .stdin
            .as_mut()
            .ok_or_else(|| BridgeError::engine_raised("engine stdin already closed"))?;

        writeln!(stdin, "{line}")
            .and_then(|()| stdin.flush())
            .map_err(|e| BridgeError::engine_raised(format!("write to engine failed: {e}")))?;
        Ok(true)
    }

    fn pop_line(&mut self) -> Result<Option<String>> {
        let running = self.running.as_ref().ok_or(BridgeError::EngineNotReady)?;
        match running.lines.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn stop(&mut self) -> Result<()> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };

        // EOF on stdin is the polite way to ask a line engine to leave.
        drop(running.stdin.take());

        let deadline = Instant::now() + self.exit_grace;
        // Early returns drop `running`, which kills the child.
        let status = loop {
            if let Some(status) = running.child.try_wait()? {
                break Some(status);
            }
            if Instant::now() >= deadline {
                break None;
            }
            thread::sleep(EXIT_POLL);
        };

        match status {
            Some(status) => debug!(%status, "engine process exited"),
            None => {
                warn!(
                    grace_ms = self.exit_grace.as_millis() as u64,
                    "engine process ignored quit, killing"
                );
                running.child.kill()?;
                running.child.wait()?;
            }
        }

        if let Some(reader) = running.reader.take() {
            if reader.join().is_err() {
                warn!("engine stdout reader panicked");
            }
        }
        Ok(())
    }
}
