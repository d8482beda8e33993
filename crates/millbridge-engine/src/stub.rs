// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub engine for hosts where no native engine is configured.
//
// Every primitive returns `EngineUnavailable`. The bridge still runs, so the
// front end gets a typed error per call instead of a missing channel.

use millbridge_core::error::{BridgeError, Result};

use crate::traits::EngineProxy;

/// Engine proxy that refuses every call.
pub struct UnavailableEngine;

impl EngineProxy for UnavailableEngine {
    fn startup(&mut self) -> Result<i32> {
        tracing::warn!("EngineProxy::startup called on unavailable engine");
        Err(BridgeError::EngineUnavailable)
    }

    fn send(&mut self, _command: &str) -> Result<i32> {
        tracing::warn!("EngineProxy::send called on unavailable engine");
        Err(BridgeError::EngineUnavailable)
    }

    fn read(&mut self) -> Result<String> {
        Err(BridgeError::EngineUnavailable)
    }

    fn shutdown(&mut self) -> Result<i32> {
        Err(BridgeError::EngineUnavailable)
    }

    fn is_ready(&mut self) -> Result<bool> {
        Err(BridgeError::EngineUnavailable)
    }

    fn is_thinking(&mut self) -> Result<bool> {
        Err(BridgeError::EngineUnavailable)
    }
}
