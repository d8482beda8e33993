// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Persistent bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum outstanding (queued + in-flight) commands. `None` is unbounded.
    pub queue_bound: Option<usize>,
    /// How long teardown waits for the worker before discarding queued work.
    pub teardown_timeout_ms: u64,
    /// OS thread name for the worker.
    pub worker_thread_name: String,
    /// Front-end method channel name.
    pub channel_name: String,
    /// Native engine settings.
    pub engine: EngineConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_bound: None,
            teardown_timeout_ms: 3000,
            worker_thread_name: "engine-bridge".into(),
            channel_name: "com.calcitem.sanmill/engine".into(),
            engine: EngineConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    /// Reject settings the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_bound == Some(0) {
            return Err(BridgeError::Config(
                "queue_bound must be at least 1 (omit it for an unbounded queue)".into(),
            ));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(BridgeError::Config("worker_thread_name must not be empty".into()));
        }
        self.engine.validate()
    }
}

/// How to reach the native engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// External engine executable. `None` means no process engine.
    pub program: Option<PathBuf>,
    /// Arguments passed to `program`.
    pub args: Vec<String>,
    /// Line sent right after startup (UCI-style engines expect `uci`).
    pub handshake: Option<String>,
    /// Line sent to ask the engine to exit.
    pub quit_command: String,
    /// Capacity of the command mailbox between proxy and engine thread.
    pub mailbox_capacity: usize,
    /// How long shutdown waits for an engine process before killing it.
    pub exit_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            handshake: Some("uci".into()),
            quit_command: "quit".into(),
            mailbox_capacity: 64,
            exit_grace_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(BridgeError::Config("engine.mailbox_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
