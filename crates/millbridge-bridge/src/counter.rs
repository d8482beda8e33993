// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backpressure counter: how many results were produced but never reached
// their caller. Purely observational; nothing in the bridge reacts to it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, monotonically increasing count of undeliverable responses.
///
/// Clones share the same count. A fresh counter (at zero) is only created
/// when the bridge itself is re-created.
#[derive(Debug, Clone, Default)]
pub struct DroppedResponses {
    count: Arc<AtomicU64>,
}

impl DroppedResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one delivery failure. Returns the new total.
    pub fn record(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current total.
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
