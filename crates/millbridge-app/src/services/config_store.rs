// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge config persistence (`bridge.json` in the data dir).

use std::path::Path;

use millbridge_core::config::BridgeConfig;
use millbridge_core::error::Result;

pub const CONFIG_FILE: &str = "bridge.json";

/// Load the persisted config, if there is a readable one.
///
/// A missing or malformed file yields `None` so the host can fall back to
/// defaults; malformed files are logged.
pub fn load_config(data_dir: &Path) -> Option<BridgeConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed bridge config");
            None
        }
    }
}

/// Load a config from an explicit path. Unlike `load_config`, failures are
/// reported to the caller.
pub fn load_config_file(path: &Path) -> Result<BridgeConfig> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn persist_config(data_dir: &Path, config: &BridgeConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), "bridge config saved");
    Ok(())
}
