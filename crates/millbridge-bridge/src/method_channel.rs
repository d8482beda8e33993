// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Front-end method channel adapter.
//
// Each inbound `MethodCall` becomes one bridge command and gets exactly one
// `MethodResult` answer: success, error, or not-implemented.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use millbridge_core::error::BridgeError;
use millbridge_core::types::{Command, CommandKind, CommandResult, ResponseValue};

use crate::completion::Completion;
use crate::context::DeliveryContext;
use crate::lifecycle::EngineBridge;

/// Method answered straight from the backpressure counter.
pub const DROPPED_COUNT_METHOD: &str = "getResponseDroppedCount";

/// One inbound call from the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Option<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// One-shot answer slot for a `MethodCall`.
///
/// Every method consumes the result, so a call can only be answered once.
pub trait MethodResult: Send {
    fn success(self: Box<Self>, value: Value);
    fn error(self: Box<Self>, code: &str, message: &str);
    fn not_implemented(self: Box<Self>);
}

/// Owned form of a method-channel answer.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodReply {
    Success(Value),
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResult for crossbeam_channel::Sender<MethodReply> {
    fn success(self: Box<Self>, value: Value) {
        let _ = self.send(MethodReply::Success(value));
    }

    fn error(self: Box<Self>, code: &str, message: &str) {
        let _ = self.send(MethodReply::Error {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    fn not_implemented(self: Box<Self>) {
        let _ = self.send(MethodReply::NotImplemented);
    }
}

/// Routes method calls on one named channel to a bridge.
///
/// Answers are delivered on `context`, normally the UI thread that owns the
/// channel.
pub struct EngineChannel {
    name: String,
    bridge: Arc<EngineBridge>,
    context: Arc<dyn DeliveryContext>,
}

impl EngineChannel {
    pub fn new(
        name: impl Into<String>,
        bridge: Arc<EngineBridge>,
        context: Arc<dyn DeliveryContext>,
    ) -> Self {
        Self {
            name: name.into(),
            bridge,
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bridge(&self) -> &Arc<EngineBridge> {
        &self.bridge
    }

    /// Dispatch `call`. Returns without waiting for the engine.
    pub fn handle(&self, call: MethodCall, result: Box<dyn MethodResult>) {
        debug!(channel = %self.name, method = %call.method, "method call");

        if call.method == DROPPED_COUNT_METHOD {
            result.success(Value::from(self.bridge.dropped_response_count()));
            return;
        }

        let Some(kind) = CommandKind::from_method(&call.method) else {
            result.not_implemented();
            return;
        };

        let command = match kind {
            CommandKind::Send => match call.arguments {
                Some(Value::String(text)) => Command::send(text),
                _ => {
                    let error = BridgeError::InvalidArgument("send expects a string argument".into());
                    result.error(error.code(), &error.to_string());
                    return;
                }
            },
            other => Command::new(other, None),
        };

        let completion = Completion::callback(Arc::clone(&self.context), move |r: CommandResult| {
            match r.into_result() {
                Ok(value) => result.success(to_json(value)),
                Err(e) => result.error(e.code(), &e.to_string()),
            }
        });

        // A rejection has already answered `result` inline.
        if let Err(e) = self.bridge.submit(command, completion) {
            debug!(channel = %self.name, error = %e, "method call rejected");
        }
    }
}

fn to_json(value: ResponseValue) -> Value {
    match value {
        ResponseValue::Status(status) => Value::from(status),
        ResponseValue::Text(text) => Value::String(text),
        ResponseValue::Flag(flag) => Value::Bool(flag),
    }
}
