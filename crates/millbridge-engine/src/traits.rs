// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the native engine.
//
// The engine surface is six blocking, non-reentrant primitives. Nothing here
// synchronises access: callers must guarantee exclusive use, which the bridge
// does by giving the proxy to a single worker thread.

use millbridge_core::error::Result;

/// Exclusive-access façade over a native engine.
///
/// Every method may block for as long as the native call takes. None of them
/// may be invoked concurrently with another.
pub trait EngineProxy: Send {
    /// Initialise engine state. Returns a native status code (0 = ok).
    fn startup(&mut self) -> Result<i32>;

    /// Forward an opaque command line. The text is never parsed here.
    fn send(&mut self, command: &str) -> Result<i32>;

    /// Oldest unread engine output, or an empty string if there is none.
    fn read(&mut self) -> Result<String>;

    /// Release engine resources. Returns a native status code.
    fn shutdown(&mut self) -> Result<i32>;

    /// Whether the engine is idle and ready for a new command.
    fn is_ready(&mut self) -> Result<bool>;

    /// Whether the engine is busy searching.
    fn is_thinking(&mut self) -> Result<bool>;
}

impl<E: EngineProxy + ?Sized> EngineProxy for Box<E> {
    fn startup(&mut self) -> Result<i32> {
        (**self).startup()
    }

    fn send(&mut self, command: &str) -> Result<i32> {
        (**self).send(command)
    }

    fn read(&mut self) -> Result<String> {
        (**self).read()
    }

    fn shutdown(&mut self) -> Result<i32> {
        (**self).shutdown()
    }

    fn is_ready(&mut self) -> Result<bool> {
        (**self).is_ready()
    }

    fn is_thinking(&mut self) -> Result<bool> {
        (**self).is_thinking()
    }
}

/// Builds a fresh engine proxy each time the bridge (re)starts.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn EngineProxy>>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Result<Box<dyn EngineProxy>> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn EngineProxy>> {
        self()
    }
}

/// Raw line-oriented pipe to an engine.
///
/// Transports know how to start and stop an engine and move lines in and
/// out; the lifecycle rules and state tracking live in `EngineSession`.
pub trait EngineTransport: Send {
    /// Launch the engine.
    fn start(&mut self) -> Result<()>;

    /// Hand one line to the engine. `Ok(false)` means the mailbox is full.
    fn push_line(&mut self, line: &str) -> Result<bool>;

    /// Take the oldest pending output line without blocking.
    fn pop_line(&mut self) -> Result<Option<String>>;

    /// Wait for the engine to exit and release its resources.
    fn stop(&mut self) -> Result<()>;
}
