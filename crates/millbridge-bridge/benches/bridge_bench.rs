// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for bridge round-trip latency: submit a command, let
// the worker run it against a trivial engine, and receive the result.

use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use millbridge_bridge::{Completion, EngineBridge, EventLoop};
use millbridge_core::config::BridgeConfig;
use millbridge_core::error::Result;
use millbridge_core::types::Command;
use millbridge_engine::{EngineFactory, EngineProxy};

// ---------------------------------------------------------------------------
// Helper: an engine that answers instantly
// ---------------------------------------------------------------------------

struct Immediate;

impl EngineProxy for Immediate {
    fn startup(&mut self) -> Result<i32> {
        Ok(0)
    }
    fn send(&mut self, _command: &str) -> Result<i32> {
        Ok(0)
    }
    fn read(&mut self) -> Result<String> {
        Ok(String::new())
    }
    fn shutdown(&mut self) -> Result<i32> {
        Ok(0)
    }
    fn is_ready(&mut self) -> Result<bool> {
        Ok(true)
    }
    fn is_thinking(&mut self) -> Result<bool> {
        Ok(false)
    }
}

fn running_bridge() -> EngineBridge {
    let factory: Arc<dyn EngineFactory> =
        Arc::new(|| -> Result<Box<dyn EngineProxy>> { Ok(Box::new(Immediate)) });
    let bridge = EngineBridge::new(BridgeConfig::default(), factory).expect("bridge");
    bridge.start().expect("start");
    bridge
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// One command through a oneshot completion, waited on synchronously.
fn bench_channel_round_trip(c: &mut Criterion) {
    let bridge = running_bridge();

    c.bench_function("round_trip (oneshot)", |b| {
        b.iter(|| {
            let rx = bridge.call(Command::send(black_box("go"))).expect("submit");
            assert!(rx.blocking_wait().is_ok());
        });
    });
}

/// One command delivered as a callback on a UI-style event loop.
fn bench_event_loop_round_trip(c: &mut Criterion) {
    let bridge = running_bridge();
    let ui = EventLoop::new();
    let context = Arc::new(ui.handle());

    c.bench_function("round_trip (event loop callback)", |b| {
        b.iter(|| {
            let completion = Completion::callback(context.clone(), |r| {
                black_box(r.is_ok());
            });
            bridge.submit(Command::is_ready(), completion).expect("submit");
            assert!(ui.run_next(Duration::from_secs(1)));
        });
    });
}

/// A burst of 64 commands submitted back-to-back, then all awaited.
fn bench_burst(c: &mut Criterion) {
    let bridge = running_bridge();

    c.bench_function("burst of 64 (oneshot)", |b| {
        b.iter(|| {
            let receivers: Vec<_> = (0..64)
                .map(|_| bridge.call(Command::is_thinking()).expect("submit"))
                .collect();
            for rx in receivers {
                assert!(rx.blocking_wait().is_ok());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_channel_round_trip,
    bench_event_loop_round_trip,
    bench_burst
);
criterion_main!(benches);
