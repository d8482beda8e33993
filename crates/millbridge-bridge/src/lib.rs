// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Millbridge: cross-thread command bridge for a single-threaded engine.
//!
//! Callers on any thread submit commands without blocking. One dedicated
//! worker thread owns the engine and runs commands strictly in submission
//! order. Each result is handed back exactly once, on the context the caller
//! named; results nobody can receive are counted, not raised.
//!
//! ```text
//! caller ──submit──▶ CommandQueue ──▶ worker ──▶ EngineProxy
//!    ▲                                  │
//!    └──── DeliveryContext ◀── ResponseRouter (+ DroppedResponses)
//! ```

pub mod completion;
pub mod context;
pub mod counter;
pub mod global;
pub mod lifecycle;
pub mod method_channel;
pub mod router;

mod queue;
mod worker;

pub use completion::{Completion, CompletionReceiver, PendingRequest};
pub use context::{ContextClosed, DeliveryContext, EventLoop, EventLoopHandle, Task, TokioContext, WorkerContext};
pub use counter::DroppedResponses;
pub use lifecycle::{EngineBridge, TeardownOutcome};
pub use method_channel::{EngineChannel, MethodCall, MethodReply, MethodResult};
pub use router::ResponseRouter;
