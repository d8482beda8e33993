// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for the bridge integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use millbridge_bridge::EngineBridge;
use millbridge_core::config::BridgeConfig;
use millbridge_core::error::Result;
use millbridge_engine::{EngineFactory, EngineProxy};

/// Everything a `RecordingEngine` saw, shared with the test.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    overlapped: AtomicBool,
    built: AtomicUsize,
}

impl CallLog {
    /// Calls in the order they reached the engine, e.g. `send:go`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether two engine calls were ever in progress at the same time.
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    /// How many engines the factory has built.
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

/// Engine double that logs every call and can be held at a gate.
///
/// With a gate, each call first waits for one token on the gate channel.
/// Dropping the gate's sender opens it for good.
pub struct RecordingEngine {
    log: Arc<CallLog>,
    gate: Option<Receiver<()>>,
    thinking: bool,
}

impl RecordingEngine {
    fn enter(&mut self, call: String) {
        // Logged on arrival, so a test can see a call is in flight while it
        // is still held at the gate.
        self.log.calls.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if self.log.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.log.overlapped.store(true, Ordering::SeqCst);
        }
        // Widen the window in which an overlapping call would be noticed.
        thread::sleep(Duration::from_micros(200));
    }

    fn exit(&self) {
        self.log.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EngineProxy for RecordingEngine {
    fn startup(&mut self) -> Result<i32> {
        self.enter("startup".into());
        self.exit();
        Ok(0)
    }

    fn send(&mut self, command: &str) -> Result<i32> {
        self.enter(format!("send:{command}"));
        self.thinking = command.starts_with("go");
        self.exit();
        Ok(0)
    }

    fn read(&mut self) -> Result<String> {
        self.enter("read".into());
        let line = if self.thinking {
            self.thinking = false;
            "bestmove a1-a4".to_string()
        } else {
            String::new()
        };
        self.exit();
        Ok(line)
    }

    fn shutdown(&mut self) -> Result<i32> {
        self.enter("shutdown".into());
        self.exit();
        Ok(0)
    }

    fn is_ready(&mut self) -> Result<bool> {
        self.enter("isReady".into());
        self.exit();
        Ok(!self.thinking)
    }

    fn is_thinking(&mut self) -> Result<bool> {
        self.enter("isThinking".into());
        self.exit();
        Ok(self.thinking)
    }
}

/// Factory for recording engines that share one log.
pub fn recording_factory(gate: Option<Receiver<()>>) -> (Arc<dyn EngineFactory>, Arc<CallLog>) {
    let log = Arc::new(CallLog::default());
    let shared = Arc::clone(&log);
    let factory: Arc<dyn EngineFactory> = Arc::new(move || -> Result<Box<dyn EngineProxy>> {
        shared.built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingEngine {
            log: Arc::clone(&shared),
            gate: gate.clone(),
            thinking: false,
        }))
    });
    (factory, log)
}

/// A running bridge over a recording engine.
pub fn running_bridge(config: BridgeConfig) -> (EngineBridge, Arc<CallLog>) {
    let (factory, log) = recording_factory(None);
    let bridge = EngineBridge::new(config, factory).expect("valid config");
    bridge.start().expect("start");
    (bridge, log)
}

/// A running bridge whose engine blocks every call until the gate is fed.
pub fn gated_bridge(config: BridgeConfig) -> (EngineBridge, Arc<CallLog>, Sender<()>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let (factory, log) = recording_factory(Some(rx));
    let bridge = EngineBridge::new(config, factory).expect("valid config");
    bridge.start().expect("start");
    (bridge, log, tx)
}

/// Poll `cond` until it holds or five seconds pass.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}
