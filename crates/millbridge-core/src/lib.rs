// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Millbridge: core types, errors, and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BridgeConfig, EngineConfig};
pub use error::{BridgeError, ErrorClass};
pub use types::*;
