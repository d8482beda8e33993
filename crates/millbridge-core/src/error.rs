// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Millbridge.

use thiserror::Error;

use crate::types::BridgeState;

/// Top-level error type for all Millbridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Enqueue-time rejections --
    #[error("engine thread not ready (bridge is {0})")]
    NotReady(BridgeState),

    #[error("command queue full ({bound} outstanding)")]
    QueueOverflow { bound: usize },

    // -- Engine-side failures --
    #[error("engine failure: {message}")]
    EngineFailure { status: Option<i32>, message: String },

    #[error("engine not ready")]
    EngineNotReady,

    #[error("engine already started")]
    AlreadyStarted,

    #[error("engine already shut down")]
    AlreadyShutDown,

    #[error("no native engine available on this host")]
    EngineUnavailable,

    // -- Teardown --
    #[error("request discarded during forced teardown")]
    Discarded,

    // -- Caller / host errors --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Where an error sits in the bridge's error taxonomy.
///
/// Drives propagation: enqueue-time classes are returned synchronously,
/// engine failures travel through the completion, delivery failures are only
/// counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bridge not running; nothing reached the engine.
    NotReady,
    /// Bounded queue full; nothing reached the engine.
    QueueOverflow,
    /// The engine call itself failed or was refused.
    EngineFailure,
    /// A result existed but no caller could receive it.
    DeliveryFailure,
    /// Teardown gave up waiting on the worker.
    TeardownTimeout,
    /// Host-side problem outside the command path (config, I/O, spawn).
    Host,
}

impl ErrorClass {
    /// Whether the caller can reasonably retry the same request later.
    pub fn is_recoverable(self) -> bool {
        match self {
            ErrorClass::NotReady | ErrorClass::QueueOverflow | ErrorClass::EngineFailure => true,
            ErrorClass::DeliveryFailure | ErrorClass::TeardownTimeout | ErrorClass::Host => false,
        }
    }
}

impl BridgeError {
    /// Convenience constructor for an engine call that returned an error status.
    pub fn engine_status(status: i32) -> Self {
        BridgeError::EngineFailure {
            status: Some(status),
            message: format!("engine returned status {status}"),
        }
    }

    /// Convenience constructor for an engine call that raised.
    pub fn engine_raised(message: impl Into<String>) -> Self {
        BridgeError::EngineFailure {
            status: None,
            message: message.into(),
        }
    }

    /// Classify this error into the bridge taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::NotReady(_) => ErrorClass::NotReady,
            BridgeError::QueueOverflow { .. } => ErrorClass::QueueOverflow,

            // Lifecycle refusals from the engine session are engine failures:
            // the command reached the worker and the engine said no.
            BridgeError::EngineFailure { .. }
            | BridgeError::EngineNotReady
            | BridgeError::AlreadyStarted
            | BridgeError::AlreadyShutDown
            | BridgeError::EngineUnavailable => ErrorClass::EngineFailure,

            BridgeError::Discarded => ErrorClass::TeardownTimeout,

            BridgeError::InvalidArgument(_)
            | BridgeError::Config(_)
            | BridgeError::WorkerSpawn(_)
            | BridgeError::Io(_)
            | BridgeError::Serialization(_) => ErrorClass::Host,
        }
    }

    /// Stable error code reported over the front-end method channel.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::NotReady(_) => "NOT_READY",
            BridgeError::QueueOverflow { .. } => "QUEUE_OVERFLOW",
            BridgeError::EngineFailure { .. } => "ENGINE_FAILURE",
            BridgeError::EngineNotReady => "ENGINE_NOT_READY",
            BridgeError::AlreadyStarted => "ALREADY_STARTED",
            BridgeError::AlreadyShutDown => "ALREADY_SHUT_DOWN",
            BridgeError::EngineUnavailable => "ENGINE_UNAVAILABLE",
            BridgeError::Discarded => "DISCARDED",
            BridgeError::InvalidArgument(_) => "INVALID_ARGUMENT",
            BridgeError::Config(_) => "CONFIG",
            BridgeError::WorkerSpawn(_) => "WORKER_SPAWN",
            BridgeError::Io(_) => "IO",
            BridgeError::Serialization(_) => "SERIALIZATION",
        }
    }

    /// Native status code carried by an engine failure, if any.
    pub fn status(&self) -> Option<i32> {
        match self {
            BridgeError::EngineFailure { status, .. } => *status,
            _ => None,
        }
    }
}
