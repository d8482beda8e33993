// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide bridge slot for host glue that has nowhere else to keep it.
//
// The native engine is loaded once per process, so the host owns at most one
// bridge. Teardown goes through `EngineBridge::stop`; the slot itself lives
// until the process exits.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use millbridge_core::config::BridgeConfig;
use millbridge_core::error::Result;
use millbridge_engine::EngineFactory;

use crate::lifecycle::EngineBridge;

static BRIDGE: OnceLock<EngineBridge> = OnceLock::new();

/// Install and start the process bridge.
///
/// If a bridge is already installed it is returned as-is (and started if it
/// had been stopped); `config` and `factory` are then ignored.
pub fn install(config: BridgeConfig, factory: Arc<dyn EngineFactory>) -> Result<&'static EngineBridge> {
    let bridge = match BRIDGE.get() {
        Some(existing) => {
            debug!("process bridge already installed");
            existing
        }
        None => {
            let candidate = EngineBridge::new(config, factory)?;
            // A racing installer may have won; its bridge is the one kept and
            // ours is dropped while still uninitialized.
            BRIDGE.get_or_init(|| candidate)
        }
    };
    bridge.start()?;
    Ok(bridge)
}

/// The installed process bridge, if any.
pub fn bridge() -> Option<&'static EngineBridge> {
    BRIDGE.get()
}

#[cfg(test)]
mod tests {
    use millbridge_core::types::BridgeState;
    use millbridge_engine::EngineProxy;
    use millbridge_engine::stub::UnavailableEngine;

    use super::*;

    fn stub_factory() -> Arc<dyn EngineFactory> {
        Arc::new(|| -> Result<Box<dyn EngineProxy>> { Ok(Box::new(UnavailableEngine)) })
    }

    // The slot is process-wide, so everything about it is checked in one test.
    #[test]
    fn second_install_returns_the_first_bridge() {
        let first = install(BridgeConfig::default(), stub_factory()).unwrap();
        let other = BridgeConfig {
            queue_bound: Some(2),
            ..Default::default()
        };
        let second = install(other, stub_factory()).unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.config().queue_bound, None);
        assert!(std::ptr::eq(bridge().unwrap(), first));
        assert_eq!(first.state(), BridgeState::Running);

        first.stop();
        assert_eq!(first.state(), BridgeState::Stopped);
        install(BridgeConfig::default(), stub_factory()).unwrap();
        assert_eq!(first.state(), BridgeState::Running);
        first.stop();
    }
}
