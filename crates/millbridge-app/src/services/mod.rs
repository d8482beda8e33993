// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: wires the console front end to the bridge crates.

pub mod config_store;
pub mod data_dir;
pub mod host;
