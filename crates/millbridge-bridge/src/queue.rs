// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FIFO command queue between callers and the bridge worker.
//
// Callers push without blocking; the single worker pops, blocking while the
// queue is empty. The optional bound covers every outstanding command, i.e.
// queued plus the one currently executing, so "bound = 1" means one command
// in the bridge at a time.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use millbridge_core::error::BridgeError;
use millbridge_core::types::BridgeState;

use crate::completion::PendingRequest;

/// Why an enqueue was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rejection {
    NotReady(BridgeState),
    Overflow { bound: usize },
    InvalidArgument(String),
}

impl Rejection {
    pub(crate) fn to_error(&self) -> BridgeError {
        match self {
            Rejection::NotReady(state) => BridgeError::NotReady(*state),
            Rejection::Overflow { bound } => BridgeError::QueueOverflow { bound: *bound },
            Rejection::InvalidArgument(msg) => BridgeError::InvalidArgument(msg.clone()),
        }
    }
}

struct QueueInner {
    items: VecDeque<PendingRequest>,
    accepting: bool,
    in_flight: bool,
}

/// Ordered, optionally bounded queue of pending requests.
pub(crate) struct CommandQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
    bound: Option<usize>,
}

impl CommandQueue {
    pub(crate) fn new(bound: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                accepting: true,
                in_flight: false,
            }),
            available: Condvar::new(),
            bound,
        }
    }

    // Nothing runs caller code while holding this lock, so a poisoned lock
    // still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request. On refusal the request is handed back untouched.
    pub(crate) fn push(
        &self,
        request: PendingRequest,
    ) -> Result<(), (Rejection, PendingRequest)> {
        let mut inner = self.lock();
        if !inner.accepting {
            return Err((Rejection::NotReady(BridgeState::Draining), request));
        }
        if let Some(bound) = self.bound {
            let outstanding = inner.items.len() + usize::from(inner.in_flight);
            if outstanding >= bound {
                return Err((Rejection::Overflow { bound }, request));
            }
        }
        inner.items.push_back(request);
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Block until a request is available and mark it in flight.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub(crate) fn next(&self) -> Option<PendingRequest> {
        let mut inner = self.lock();
        loop {
            if let Some(request) = inner.items.pop_front() {
                inner.in_flight = true;
                return Some(request);
            }
            if !inner.accepting {
                return None;
            }
            inner = self
                .available
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// The in-flight request has finished executing.
    pub(crate) fn finish(&self) {
        self.lock().in_flight = false;
    }

    /// Stop accepting. Already queued requests stay and still drain.
    pub(crate) fn close(&self) {
        self.lock().accepting = false;
        self.available.notify_all();
    }

    /// Remove every queued request (forced teardown).
    pub(crate) fn drain(&self) -> Vec<PendingRequest> {
        self.lock().items.drain(..).collect()
    }

    /// Queued requests, not counting the one in flight.
    pub(crate) fn len(&self) -> usize {
        self.lock().items.len()
    }
}
