// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response router: hands each result to the context its caller named.
//
// Delivery never fails loudly: if the caller is gone the result is discarded
// and the backpressure counter goes up by one. The worker carries on.

use tracing::{debug, trace};

use millbridge_core::types::CommandResult;

use crate::completion::{Completion, PendingRequest};
use crate::counter::DroppedResponses;
use crate::queue::Rejection;

/// Routes results from the worker back to callers.
#[derive(Clone)]
pub struct ResponseRouter {
    dropped: DroppedResponses,
}

impl ResponseRouter {
    pub fn new(dropped: DroppedResponses) -> Self {
        Self { dropped }
    }

    /// The counter this router records delivery failures in.
    pub fn dropped(&self) -> &DroppedResponses {
        &self.dropped
    }

    /// Deliver `result` through `completion`, exactly once.
    ///
    /// Returns whether the result was handed to the caller's context.
    pub fn route(&self, completion: Completion, result: CommandResult) -> bool {
        let id = result.id;
        let kind = result.kind;
        let ok = result.is_ok();

        let delivered = completion.deliver(result, &self.dropped);
        if delivered {
            trace!(request = %id, %kind, ok, "response handed to caller context");
        } else {
            debug!(
                request = %id,
                %kind,
                dropped_total = self.dropped.get(),
                "response could not be handed off"
            );
        }
        delivered
    }

    /// Answer a request that never made it into the queue.
    ///
    /// Runs on the submitting thread. Not a delivery failure, so the counter
    /// is untouched.
    pub(crate) fn reject(&self, request: PendingRequest, rejection: &Rejection) {
        let PendingRequest { command, completion } = request;
        debug!(request = %command.id(), kind = %command.kind(), ?rejection, "command rejected");
        completion.resolve_inline(CommandResult::err(&command, rejection.to_error()));
    }
}
