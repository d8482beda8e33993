// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Millbridge: native engine abstractions.
//!
//! This crate defines the `EngineProxy` contract the bridge worker drives,
//! the session rules every engine follows (handshake, quit, thinking/ready
//! tracking), and the transports that reach an actual engine: an embedded
//! engine thread or an external engine process.
//!
//! Nothing in here is thread-safe by itself. Exclusive access is the
//! bridge's job.

pub mod in_process;
pub mod session;
pub mod stub;
pub mod traits;

#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod process;

pub use in_process::{EngineIo, EngineMain, InProcessEngine, in_process_engine};
pub use session::EngineSession;
pub use traits::{EngineFactory, EngineProxy, EngineTransport};

use millbridge_core::config::EngineConfig;

/// Builds the engine implementation for this host from config.
///
/// RETURNS: a boxed `EngineProxy`. Desktop hosts with `engine.program` set
/// get an external-process engine; everything else gets the stub, which
/// answers every call with `EngineUnavailable`.
pub fn engine_from_config(config: &EngineConfig) -> Box<dyn EngineProxy> {
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        if let Ok(engine) = process::process_engine(config) {
            return Box::new(engine);
        }
    }
    #[cfg(any(target_os = "ios", target_os = "android"))]
    {
        // Mobile hosts cannot spawn engine processes; they embed the engine
        // with `in_process_engine` instead.
        let _ = config;
    }
    tracing::warn!("no native engine configured, using unavailable stub");
    Box::new(stub::UnavailableEngine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use millbridge_core::error::BridgeError;

    #[test]
    fn no_program_falls_back_to_stub() {
        let mut engine = engine_from_config(&EngineConfig::default());
        assert!(matches!(engine.startup(), Err(BridgeError::EngineUnavailable)));
    }
}
