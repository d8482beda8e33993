// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Millbridge engine bridge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BridgeError;

/// Unique identifier for a request travelling through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six native engine primitives a command can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Startup,
    Send,
    Read,
    Shutdown,
    IsReady,
    IsThinking,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        CommandKind::Startup,
        CommandKind::Send,
        CommandKind::Read,
        CommandKind::Shutdown,
        CommandKind::IsReady,
        CommandKind::IsThinking,
    ];

    /// Front-end method name for this command.
    pub fn method_name(self) -> &'static str {
        match self {
            CommandKind::Startup => "startup",
            CommandKind::Send => "send",
            CommandKind::Read => "read",
            CommandKind::Shutdown => "shutdown",
            CommandKind::IsReady => "isReady",
            CommandKind::IsThinking => "isThinking",
        }
    }

    /// Resolve a front-end method name. Matching is exact (case-sensitive).
    pub fn from_method(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method_name() == name)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method_name())
    }
}

/// A single request for the engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    id: RequestId,
    kind: CommandKind,
    payload: Option<String>,
    created_at: DateTime<Utc>,
}

impl Command {
    /// Build a command of the given kind with an optional text payload.
    pub fn new(kind: CommandKind, payload: Option<String>) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn startup() -> Self {
        Self::new(CommandKind::Startup, None)
    }

    /// Forward an opaque command line to the engine.
    pub fn send(text: impl Into<String>) -> Self {
        Self::new(CommandKind::Send, Some(text.into()))
    }

    pub fn read() -> Self {
        Self::new(CommandKind::Read, None)
    }

    pub fn shutdown() -> Self {
        Self::new(CommandKind::Shutdown, None)
    }

    pub fn is_ready() -> Self {
        Self::new(CommandKind::IsReady, None)
    }

    pub fn is_thinking() -> Self {
        Self::new(CommandKind::IsThinking, None)
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Successful value produced by an engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Integer status from `startup`, `send`, `shutdown`.
    Status(i32),
    /// Engine output from `read`.
    Text(String),
    /// Probe answer from `isReady` / `isThinking`.
    Flag(bool),
}

impl ResponseValue {
    pub fn as_status(&self) -> Option<i32> {
        match self {
            ResponseValue::Status(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ResponseValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// The single outcome produced for an accepted command.
#[derive(Debug)]
pub struct CommandResult {
    pub id: RequestId,
    pub kind: CommandKind,
    pub outcome: Result<ResponseValue, BridgeError>,
}

impl CommandResult {
    pub fn ok(command: &Command, value: ResponseValue) -> Self {
        Self {
            id: command.id(),
            kind: command.kind(),
            outcome: Ok(value),
        }
    }

    pub fn err(command: &Command, error: BridgeError) -> Self {
        Self {
            id: command.id(),
            kind: command.kind(),
            outcome: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Unwrap the outcome into the crate-wide `Result`.
    pub fn into_result(self) -> Result<ResponseValue, BridgeError> {
        self.outcome
    }
}

/// Lifecycle states of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeState {
    /// No worker exists yet.
    Uninitialized,
    /// Worker accepting commands.
    Running,
    /// No new commands; queued work still executing.
    Draining,
    /// Worker gone, engine released.
    Stopped,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BridgeState::Uninitialized => "uninitialized",
            BridgeState::Running => "running",
            BridgeState::Draining => "draining",
            BridgeState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_resolve_back_to_kinds() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_method(kind.method_name()), Some(kind));
        }
        assert_eq!(CommandKind::from_method("isready"), None);
        assert_eq!(CommandKind::from_method("getResponseDroppedCount"), None);
    }

    #[test]
    fn send_carries_its_payload_verbatim() {
        let cmd = Command::send("position startpos moves a1");
        assert_eq!(cmd.kind(), CommandKind::Send);
        assert_eq!(cmd.payload(), Some("position startpos moves a1"));
    }

    #[test]
    fn each_command_gets_a_fresh_id() {
        let a = Command::read();
        let b = Command::read();
        assert_ne!(a.id(), b.id());
        assert!(b.created_at() >= a.created_at());
    }

    #[test]
    fn result_matches_its_command() {
        let cmd = Command::is_ready();
        let result = CommandResult::ok(&cmd, ResponseValue::Flag(true));
        assert_eq!(result.id, cmd.id());
        assert_eq!(result.kind, CommandKind::IsReady);
        assert_eq!(result.into_result().unwrap().as_flag(), Some(true));
    }

    #[test]
    fn response_values_serialize_as_plain_json() {
        assert_eq!(serde_json::to_string(&ResponseValue::Status(0)).unwrap(), "0");
        assert_eq!(
            serde_json::to_string(&ResponseValue::Text("bestmove a1".into())).unwrap(),
            "\"bestmove a1\""
        );
        assert_eq!(serde_json::to_string(&ResponseValue::Flag(false)).unwrap(), "false");
    }
}
